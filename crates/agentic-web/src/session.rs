//! Per-task sessions and the keyed registry that owns them.
//!
//! A [`TaskSession`] runs one step of the perception pipeline: extract and
//! summarize the page, check the success criteria, update the planner, diff
//! against the previous snapshot, ask the decision-maker, and resolve its
//! answer. The decision-maker itself is an opaque closure.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::config::AgentConfig;
use crate::diff::compute_element_diff;
use crate::extract::ElementExtractor;
use crate::planner::{Phase, PlanState, Planner, TrackedAction};
use crate::render::render_elements;
use crate::resolver::{ResolveError, Resolver};
use crate::summary::PageSummarizer;
use crate::types::{ExtractionMode, HistoryEntry, InteractiveElement};

/// Structured success criteria supplied by the task-analysis collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuccessCriteria {
    /// URL fragments the task must reach.
    pub url_targets: Vec<String>,
    /// Text that must appear on the page.
    pub required_text: Vec<String>,
    pub extraction_mode: ExtractionMode,
}

impl SuccessCriteria {
    pub fn has_criteria(&self) -> bool {
        !self.url_targets.is_empty() || !self.required_text.is_empty()
    }

    /// True only when there is at least one criterion and all of them hold.
    pub fn is_met(&self, url: &str, html: &str) -> bool {
        if !self.has_criteria() {
            return false;
        }
        if !self.url_targets.is_empty()
            && !self
                .url_targets
                .iter()
                .any(|target| url.contains(target.as_str()) || url.ends_with(target.as_str()))
        {
            return false;
        }
        if !self.required_text.is_empty() {
            let html = html.to_lowercase();
            if !self
                .required_text
                .iter()
                .all(|text| html.contains(&text.to_lowercase()))
            {
                return false;
            }
        }
        true
    }
}

/// What the environment reports for one step.
#[derive(Debug, Clone, Copy)]
pub struct StepInput<'a> {
    pub html: &'a str,
    pub url: &'a str,
    pub step_index: usize,
    pub history: &'a [HistoryEntry],
}

/// Everything the decision-maker sees for one step.
#[derive(Debug)]
pub struct StepContext<'a> {
    pub task_id: &'a str,
    pub step_index: usize,
    pub url: &'a str,
    pub elements: &'a [InteractiveElement],
    pub elements_text: String,
    pub page_summary: String,
    /// Empty on the first step or when nothing changed.
    pub page_diff: String,
    pub planning: String,
    pub plan: &'a PlanState,
    pub criteria: &'a SuccessCriteria,
    pub history: &'a [HistoryEntry],
}

/// Result of one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    pub step_index: usize,
    /// `None` means "take no action this step".
    pub action: Option<Action>,
    pub resolved_from: Option<String>,
    /// The success criteria already hold; the decision-maker was not asked.
    pub completed: bool,
    pub element_count: usize,
    pub phase: Phase,
    pub is_stuck: bool,
    pub recovery_suggestion: String,
    /// Why the decision produced no action, if it didn't.
    pub rejection: Option<String>,
}

/// One task's pipeline state.
#[derive(Debug, Clone)]
pub struct TaskSession {
    task_id: String,
    criteria: SuccessCriteria,
    extractor: ElementExtractor,
    summarizer: PageSummarizer,
    resolver: Resolver,
    planner: Planner,
    previous: Vec<InteractiveElement>,
    last_action: Option<Action>,
}

impl TaskSession {
    pub fn new(task_id: &str, criteria: SuccessCriteria, config: &AgentConfig) -> Self {
        Self {
            task_id: task_id.to_string(),
            criteria,
            extractor: ElementExtractor::new(config.perception.clone()),
            summarizer: PageSummarizer::new(config.perception.clone()),
            resolver: Resolver::default(),
            planner: Planner::new(config.planner.clone()),
            previous: Vec::new(),
            last_action: None,
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn criteria(&self) -> &SuccessCriteria {
        &self.criteria
    }

    pub fn planner(&self) -> &Planner {
        &self.planner
    }

    pub fn last_action(&self) -> Option<&Action> {
        self.last_action.as_ref()
    }

    /// Forget all progress while keeping the criteria.
    pub fn reset(&mut self) {
        self.planner.reset();
        self.previous.clear();
        self.last_action = None;
    }

    /// Run one step; `decide` receives the context and returns raw model output.
    pub fn step<F>(&mut self, input: StepInput<'_>, decide: F) -> StepOutcome
    where
        F: FnOnce(&StepContext<'_>) -> Option<String>,
    {
        let elements = self
            .extractor
            .extract(input.html, self.criteria.extraction_mode);
        let page_summary = self.summarizer.summarize(input.html);
        tracing::info!(
            "Step {}: {} elements, page_summary={} chars, url={}",
            input.step_index,
            elements.len(),
            page_summary.chars().count(),
            input.url.chars().take(80).collect::<String>()
        );

        if self.criteria.is_met(input.url, input.html) {
            tracing::info!("Early completion detected at step {}", input.step_index);
            let outcome = self.outcome(input.step_index, elements.len(), None, None, None);
            self.previous = elements;
            self.last_action = None;
            return StepOutcome {
                completed: true,
                ..outcome
            };
        }

        let tracked = self
            .last_action
            .as_ref()
            .map(TrackedAction::from)
            .or_else(|| input.history.last().map(TrackedAction::from));
        self.planner.update(tracked.as_ref(), input.history, input.url);

        let context = StepContext {
            task_id: &self.task_id,
            step_index: input.step_index,
            url: input.url,
            elements: &elements,
            elements_text: render_elements(&elements),
            page_summary,
            page_diff: compute_element_diff(&self.previous, &elements),
            planning: self.planner.context_for_prompt(),
            plan: self.planner.state(),
            criteria: &self.criteria,
            history: input.history,
        };
        let output = decide(&context);

        let (action, resolved_from, rejection) = match output {
            None => (None, None, Some("decision-maker returned no output".to_string())),
            Some(output) => match self.resolver.try_resolve(&output, &elements) {
                Ok(resolved) => (Some(resolved.action), resolved.resolved_from, None),
                Err(err) => {
                    if err == ResolveError::NoAction {
                        tracing::debug!("model chose no action");
                    } else {
                        tracing::warn!("{}", err);
                    }
                    (None, None, Some(err.to_string()))
                }
            },
        };

        match &action {
            Some(action) => tracing::info!("Step {} decided: {}", input.step_index, action.kind()),
            None => tracing::info!("Step {} decided: NOOP", input.step_index),
        }

        let outcome = self.outcome(
            input.step_index,
            elements.len(),
            action.clone(),
            resolved_from,
            rejection,
        );
        self.previous = elements;
        self.last_action = action;
        outcome
    }

    fn outcome(
        &self,
        step_index: usize,
        element_count: usize,
        action: Option<Action>,
        resolved_from: Option<String>,
        rejection: Option<String>,
    ) -> StepOutcome {
        let state = self.planner.state();
        StepOutcome {
            step_index,
            action,
            resolved_from,
            completed: false,
            element_count,
            phase: state.phase,
            is_stuck: state.is_stuck,
            recovery_suggestion: state.recovery_suggestion.clone(),
            rejection,
        }
    }
}

/// Task id → session. Each session has a single writer through `&mut`.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    config: AgentConfig,
    sessions: HashMap<String, TaskSession>,
}

impl TaskRegistry {
    pub fn new(config: AgentConfig) -> Self {
        Self {
            config,
            sessions: HashMap::new(),
        }
    }

    /// Get or create the session for `task_id`.
    ///
    /// `criteria` is only used when the session is created.
    pub fn session(&mut self, task_id: &str, criteria: SuccessCriteria) -> &mut TaskSession {
        let config = &self.config;
        self.sessions.entry(task_id.to_string()).or_insert_with(|| {
            tracing::info!(
                "Opening session for task '{task_id}': url_targets={}, required_text={}",
                criteria.url_targets.len(),
                criteria.required_text.len()
            );
            TaskSession::new(task_id, criteria, config)
        })
    }

    pub fn get(&self, task_id: &str) -> Option<&TaskSession> {
        self.sessions.get(task_id)
    }

    /// Reset a session's progress. Returns false if the task is unknown.
    pub fn reset(&mut self, task_id: &str) -> bool {
        match self.sessions.get_mut(task_id) {
            Some(session) => {
                session.reset();
                true
            }
            None => false,
        }
    }

    pub fn evict(&mut self, task_id: &str) -> Option<TaskSession> {
        let evicted = self.sessions.remove(task_id);
        if evicted.is_some() {
            tracing::info!("Evicted session for task '{task_id}'");
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
