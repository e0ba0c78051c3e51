//! AgenticWeb CLI — offline harness for the perception pipeline.

mod trace;

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use agentic_web::{
    compute_element_diff, render_elements, AgentConfig, ElementExtractor, ExtractionMode,
    PageSummarizer, Resolver,
};

use crate::trace::Trace;

#[derive(Parser)]
#[command(
    name = "agentic-web",
    about = "Extract, diff, resolve and replay web agent steps from HTML snapshots",
    version
)]
struct Cli {
    /// Path to a JSON config file.
    /// Also reads AGENTIC_WEB_CONFIG, then .agentic-web/config.json.
    #[arg(long, global = true)]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the interactive elements of an HTML snapshot.
    Extract {
        /// HTML file to read.
        html: PathBuf,

        /// Extraction mode (all_fields, input_fields, links_only).
        #[arg(long, default_value = "all_fields")]
        mode: ExtractionMode,

        /// Print elements as JSON instead of prompt text.
        #[arg(long)]
        json: bool,
    },

    /// Print the readable digest of an HTML snapshot.
    Summarize {
        /// HTML file to read.
        html: PathBuf,

        /// Character budget (defaults to the configured max_content_chars).
        #[arg(long)]
        max_chars: Option<usize>,
    },

    /// Report element changes between two snapshots.
    Diff {
        /// Earlier snapshot.
        before: PathBuf,

        /// Later snapshot.
        after: PathBuf,

        /// Extraction mode (all_fields, input_fields, links_only).
        #[arg(long, default_value = "all_fields")]
        mode: ExtractionMode,
    },

    /// Resolve model output against a snapshot and print the action JSON.
    Resolve {
        /// HTML file the model was looking at.
        html: PathBuf,

        /// File holding the raw model output, or `-` for stdin.
        output: String,

        /// Extraction mode (all_fields, input_fields, links_only).
        #[arg(long, default_value = "all_fields")]
        mode: ExtractionMode,
    },

    /// Replay a recorded task trace, one JSON line per step.
    Replay {
        /// Trace JSON file.
        trace: PathBuf,
    },

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   agentic-web completions bash > ~/.local/share/bash-completion/completions/agentic-web
    ///   agentic-web completions zsh > ~/.zfunc/_agentic-web
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

fn read_html(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn read_model_output(source: &str) -> anyhow::Result<String> {
    if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading model output from stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(source).with_context(|| format!("reading {source}"))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "agentic-web", &mut std::io::stdout());
        return Ok(());
    }

    let config = AgentConfig::load(cli.config.as_deref()).context("loading config")?;
    let extractor = ElementExtractor::new(config.perception.clone());

    match cli.command {
        Commands::Extract { html, mode, json } => {
            let elements = extractor.extract(&read_html(&html)?, mode);
            tracing::info!("Extracted {} elements from {}", elements.len(), html.display());
            if json {
                println!("{}", serde_json::to_string_pretty(&elements)?);
            } else {
                println!("{}", render_elements(&elements));
            }
        }

        Commands::Summarize { html, max_chars } => {
            let mut perception = config.perception.clone();
            if let Some(max_chars) = max_chars {
                perception.max_content_chars = max_chars;
            }
            println!("{}", PageSummarizer::new(perception).summarize(&read_html(&html)?));
        }

        Commands::Diff {
            before,
            after,
            mode,
        } => {
            let prev = extractor.extract(&read_html(&before)?, mode);
            let curr = extractor.extract(&read_html(&after)?, mode);
            let report = compute_element_diff(&prev, &curr);
            if report.is_empty() {
                println!("No changes.");
            } else {
                println!("{report}");
            }
        }

        Commands::Resolve { html, output, mode } => {
            let elements = extractor.extract(&read_html(&html)?, mode);
            let raw = read_model_output(&output)?;
            let action = Resolver::default().resolve(&raw, &elements);
            println!("{}", serde_json::to_string_pretty(&action)?);
        }

        Commands::Replay { trace } => {
            let trace = Trace::load(&trace)?;
            for outcome in trace::replay(&trace, &config) {
                println!("{}", serde_json::to_string(&outcome)?);
            }
        }

        Commands::Completions { .. } => unreachable!("handled before config loading"),
    }

    Ok(())
}
