//! AgenticWeb — perception, action resolution and progress tracking for web agents.

pub mod action;
pub mod config;
pub mod diff;
pub mod extract;
pub mod planner;
pub mod render;
pub mod resolver;
pub mod selector;
pub mod session;
pub mod summary;
pub mod types;

pub use action::{Action, ActionKind, ScrollDirection};
pub use config::{AgentConfig, PerceptionConfig, PlannerConfig};
pub use diff::{compute_element_diff, diff_elements, identity_key, ElementDiff};
pub use extract::{extract_elements, process_html, ElementExtractor};
pub use planner::{Phase, PlanState, Planner, StuckReason, TrackedAction};
pub use render::render_elements;
pub use resolver::{
    css_to_xpath, extract_thinking, resolve_action, ResolveError, Resolved, Resolver,
    ResolverTables,
};
pub use selector::{is_stable_id, synthesize, SynthesizedSelector};
pub use session::{StepContext, StepInput, StepOutcome, SuccessCriteria, TaskRegistry, TaskSession};
pub use summary::{summarize_page, PageSummarizer};
pub use types::*;
