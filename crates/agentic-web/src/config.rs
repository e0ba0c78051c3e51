//! Configuration loading and resolution.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::types::{WebError, WebResult};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "AGENTIC_WEB_CONFIG";

/// Limits and markers used by extraction and summarization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerceptionConfig {
    /// Hard cap on elements returned by one extraction pass.
    pub max_elements: usize,
    /// Maximum characters kept of an element's visible text.
    pub max_text_len: usize,
    /// Maximum characters of the page summary.
    pub max_content_chars: usize,
    /// Attributes marking anti-scraping decoy nodes.
    pub decoy_attributes: Vec<String>,
    /// How many ancestor levels are scanned for a decoy marker.
    pub decoy_ancestor_depth: usize,
    /// How many ancestor levels can hide an element through inline style.
    pub hidden_ancestor_depth: usize,
}

impl Default for PerceptionConfig {
    fn default() -> Self {
        Self {
            max_elements: 150,
            max_text_len: 80,
            max_content_chars: 12_000,
            decoy_attributes: vec!["data-decoy".to_string()],
            decoy_ancestor_depth: 5,
            hidden_ancestor_depth: 3,
        }
    }
}

/// Thresholds for stuck detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Capacity of the action-repetition window.
    pub recent_window: usize,
    /// Occurrences of one action key inside the window that count as a loop.
    pub repeat_threshold: usize,
    /// Consecutive failed steps that count as stuck.
    pub failure_streak_threshold: u32,
    /// Cumulative visits of one URL that count as a loop.
    pub url_visit_threshold: u32,
    /// Characters of the action target kept in the identity key.
    pub target_key_chars: usize,
    /// Step budget shown to the decision-maker.
    pub max_steps: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            recent_window: 10,
            repeat_threshold: 3,
            failure_streak_threshold: 3,
            url_visit_threshold: 5,
            target_key_chars: 60,
            max_steps: 30,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub perception: PerceptionConfig,
    pub planner: PlannerConfig,
}

impl AgentConfig {
    /// Load a JSON config file. Missing fields take their defaults.
    pub fn from_file(path: &Path) -> WebResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: AgentConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Resolve and load the effective configuration.
    ///
    /// Falls back to defaults when no config file is found.
    pub fn load(explicit: Option<&str>) -> WebResult<Self> {
        match resolve_config_path(explicit) {
            Some(path) => Self::from_file(&path),
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> WebResult<()> {
        if self.perception.max_elements == 0 {
            return Err(WebError::Config("perception.max_elements must be > 0".into()));
        }
        if self.planner.recent_window == 0 {
            return Err(WebError::Config("planner.recent_window must be > 0".into()));
        }
        if self.planner.repeat_threshold == 0 {
            return Err(WebError::Config("planner.repeat_threshold must be > 0".into()));
        }
        Ok(())
    }
}

/// Resolve the config file path: explicit flag, then environment, then
/// `.agentic-web/config.json` in the working directory.
pub fn resolve_config_path(explicit: Option<&str>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(PathBuf::from(path));
    }

    if let Ok(env_path) = std::env::var(CONFIG_ENV) {
        if !env_path.trim().is_empty() {
            return Some(PathBuf::from(env_path));
        }
    }

    let cwd_config = PathBuf::from(".agentic-web/config.json");
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    None
}
