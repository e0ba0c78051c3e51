//! Recorded task traces and their offline replay.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use agentic_web::{AgentConfig, HistoryEntry, StepInput, StepOutcome, SuccessCriteria, TaskRegistry};

/// One recorded task: its criteria plus what each step saw and decided.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Trace {
    pub task_id: String,
    pub criteria: SuccessCriteria,
    pub steps: Vec<TraceStep>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceStep {
    /// Inline page snapshot.
    pub html: Option<String>,
    /// Snapshot file, relative to the trace file.
    pub html_file: Option<PathBuf>,
    pub url: String,
    pub history: Vec<HistoryEntry>,
    /// Raw decision-maker output; absent means it returned nothing.
    pub model_output: Option<String>,
}

impl Trace {
    /// Load a trace, inlining any `html_file` snapshots.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading trace {}", path.display()))?;
        let mut trace: Trace = serde_json::from_str(&raw)
            .with_context(|| format!("parsing trace {}", path.display()))?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        for (index, step) in trace.steps.iter_mut().enumerate() {
            if step.html.is_some() {
                continue;
            }
            let Some(file) = &step.html_file else {
                bail!("step {index} has neither html nor html_file");
            };
            let file = base.join(file);
            let html = std::fs::read_to_string(&file)
                .with_context(|| format!("reading snapshot {}", file.display()))?;
            step.html = Some(html);
        }

        tracing::debug!("Loaded trace '{}' with {} steps", trace.task_id, trace.steps.len());
        Ok(trace)
    }
}

/// Replay every step through a fresh registry. Stops after early completion.
pub fn replay(trace: &Trace, config: &AgentConfig) -> Vec<StepOutcome> {
    let mut registry = TaskRegistry::new(config.clone());
    let session = registry.session(&trace.task_id, trace.criteria.clone());

    let mut outcomes = Vec::with_capacity(trace.steps.len());
    for (step_index, step) in trace.steps.iter().enumerate() {
        let input = StepInput {
            html: step.html.as_deref().unwrap_or_default(),
            url: &step.url,
            step_index,
            history: &step.history,
        };
        let outcome = session.step(input, |_| step.model_output.clone());
        let completed = outcome.completed;
        outcomes.push(outcome);
        if completed {
            tracing::info!("Task '{}' complete after {} steps", trace.task_id, step_index + 1);
            break;
        }
    }
    outcomes
}
