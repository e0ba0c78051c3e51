//! Progress tracking across the steps of one task.
//!
//! The planner keeps a bounded window of recent action keys, the failure
//! streak and per-URL visit counts. Every update re-derives the phase and the
//! stuck verdict from scratch; nothing derived survives to the next update.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::config::PlannerConfig;
use crate::types::{truncate, HistoryEntry};

/// History entries inspected when inferring the phase.
const PHASE_WINDOW: usize = 3;

/// History action names that mean "nothing was done".
const NO_ACTION_NAMES: &[&str] = &["noop", "none", ""];

/// Coarse stage of the task, inferred from recent history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Exploring,
    FillingForm,
    Submitting,
    Navigating,
    Verifying,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Exploring => "exploring",
            Phase::FillingForm => "filling_form",
            Phase::Submitting => "submitting",
            Phase::Navigating => "navigating",
            Phase::Verifying => "verifying",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which check flagged the task as stuck.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StuckReason {
    Repetition {
        action_type: String,
        target: String,
        count: usize,
        window: usize,
    },
    FailureStreak {
        streak: u32,
    },
    UrlLoop {
        url: String,
        count: u32,
    },
}

impl StuckReason {
    /// Recovery hint shown to the decision-maker.
    pub fn hint(&self) -> String {
        match self {
            StuckReason::Repetition {
                action_type,
                target,
                count,
                window,
            } => format!(
                "Action '{}' on '{}' repeated {} times in last {} steps. \
                 Try a different approach: use an alternative selector, scroll to find the element, \
                 or navigate to a different page.",
                action_type,
                truncate(target, 40),
                count,
                window
            ),
            StuckReason::FailureStreak { streak } => format!(
                "{} consecutive action failures. \
                 Try: check for validation errors on the page, use a different selector, \
                 scroll down, or navigate back and try a different approach.",
                streak
            ),
            StuckReason::UrlLoop { url, count } => format!(
                "Visited '{}' {} times. \
                 Try navigating to a different page or taking a different action path.",
                truncate(url, 50),
                count
            ),
        }
    }
}

/// What the planner needs to know about an action: its type and target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackedAction {
    pub action_type: String,
    pub target: String,
    pub text: Option<String>,
}

impl TrackedAction {
    /// Identity key used for repetition detection.
    pub fn key(&self, target_chars: usize) -> String {
        let target: String = self.target.chars().take(target_chars).collect();
        format!("{}:{}", self.action_type, target)
    }
}

impl From<&Action> for TrackedAction {
    fn from(action: &Action) -> Self {
        Self {
            action_type: action.kind().as_str().to_string(),
            target: action.target().unwrap_or_default().to_string(),
            text: action.text().map(str::to_string),
        }
    }
}

impl From<&HistoryEntry> for TrackedAction {
    fn from(entry: &HistoryEntry) -> Self {
        Self {
            action_type: entry.action.trim().to_lowercase(),
            target: entry.candidate_id.clone().unwrap_or_default(),
            text: entry.text.clone(),
        }
    }
}

/// Progress accumulator for one task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlanState {
    pub phase: Phase,
    pub recent_action_keys: VecDeque<String>,
    pub failure_streak: u32,
    pub total_failures: u32,
    pub last_url: String,
    pub url_visit_count: BTreeMap<String, u32>,
    pub is_stuck: bool,
    pub recovery_suggestion: String,
    pub stuck_reason: Option<StuckReason>,
    pub step_count: usize,
}

/// Tracks phase, repetition, failures and URL loops for one task.
#[derive(Debug, Clone, Default)]
pub struct Planner {
    config: PlannerConfig,
    state: PlanState,
}

impl Planner {
    pub fn new(config: PlannerConfig) -> Self {
        Self {
            config,
            state: PlanState::default(),
        }
    }

    pub fn state(&self) -> &PlanState {
        &self.state
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Fold one step into the state and re-derive the verdict.
    pub fn update(
        &mut self,
        last_action: Option<&TrackedAction>,
        history: &[HistoryEntry],
        current_url: &str,
    ) -> &PlanState {
        self.state.step_count = history.len();

        if !current_url.is_empty() {
            *self
                .state
                .url_visit_count
                .entry(normalize_url(current_url))
                .or_insert(0) += 1;
            self.state.last_url = current_url.to_string();
        }

        if let Some(action) = last_action {
            self.state
                .recent_action_keys
                .push_back(action.key(self.config.target_key_chars));
            while self.state.recent_action_keys.len() > self.config.recent_window {
                self.state.recent_action_keys.pop_front();
            }
        }

        if let Some(last) = history.last() {
            if last.exec_ok {
                self.state.failure_streak = 0;
            } else {
                self.state.failure_streak += 1;
                self.state.total_failures += 1;
            }
        }

        self.update_phase(history);

        let was_stuck = self.state.is_stuck;
        let reason = self.detect_stuck();
        self.state.is_stuck = reason.is_some();
        self.state.recovery_suggestion = reason.as_ref().map(StuckReason::hint).unwrap_or_default();
        self.state.stuck_reason = reason;

        if self.state.is_stuck && !was_stuck {
            tracing::info!("stuck detected: {}", self.state.recovery_suggestion);
        }
        tracing::debug!(
            phase = %self.state.phase,
            step = self.state.step_count,
            failure_streak = self.state.failure_streak,
            "planner updated"
        );

        &self.state
    }

    fn update_phase(&mut self, history: &[HistoryEntry]) {
        if history.is_empty() {
            self.state.phase = Phase::Exploring;
            return;
        }

        let recent = &history[history.len().saturating_sub(PHASE_WINDOW)..];
        let types: Vec<String> = recent
            .iter()
            .map(|h| h.action.trim().to_lowercase())
            .collect();
        let any = |names: &[&str]| types.iter().any(|t| names.contains(&t.as_str()));

        if any(&["fill", "type"]) {
            self.state.phase = Phase::FillingForm;
        } else if any(&["click"]) && self.state.phase == Phase::FillingForm {
            self.state.phase = Phase::Submitting;
        } else if any(&["navigate"]) {
            self.state.phase = Phase::Navigating;
        } else if self.state.step_count > 1
            && types.iter().all(|t| NO_ACTION_NAMES.contains(&t.as_str()))
        {
            self.state.phase = Phase::Verifying;
        }
    }

    /// Repetition, then failure streak, then URL loop.
    fn detect_stuck(&self) -> Option<StuckReason> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for key in &self.state.recent_action_keys {
            *counts.entry(key.as_str()).or_insert(0) += 1;
        }
        let repeated = self
            .state
            .recent_action_keys
            .iter()
            .find(|key| counts[key.as_str()] >= self.config.repeat_threshold);
        if let Some(key) = repeated {
            let (action_type, target) = key.split_once(':').unwrap_or((key.as_str(), ""));
            return Some(StuckReason::Repetition {
                action_type: action_type.to_string(),
                target: target.to_string(),
                count: counts[key.as_str()],
                window: self.config.recent_window,
            });
        }

        if self.state.failure_streak >= self.config.failure_streak_threshold {
            return Some(StuckReason::FailureStreak {
                streak: self.state.failure_streak,
            });
        }

        self.state
            .url_visit_count
            .iter()
            .find(|&(_, &count)| count >= self.config.url_visit_threshold)
            .map(|(url, &count)| StuckReason::UrlLoop {
                url: url.clone(),
                count,
            })
    }

    /// Planning block for the next prompt.
    pub fn context_for_prompt(&self) -> String {
        let mut lines = vec![
            format!("Current phase: {}", self.state.phase),
            format!(
                "Steps taken: {}/{}",
                self.state.step_count, self.config.max_steps
            ),
        ];
        if self.state.total_failures > 0 {
            lines.push(format!("Total failures: {}", self.state.total_failures));
        }
        if self.state.is_stuck {
            lines.push(format!(
                "\nSTUCK DETECTED: {}",
                self.state.recovery_suggestion
            ));
            lines.push("You MUST try a DIFFERENT approach than your previous actions.".to_string());
        }
        lines.join("\n")
    }

    pub fn reset(&mut self) {
        self.state = PlanState::default();
    }
}

/// Drop the query string so revisits with different parameters collide.
pub fn normalize_url(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_query(None);
            parsed.to_string()
        }
        Err(_) => url.split('?').next().unwrap_or(url).to_string(),
    }
}
