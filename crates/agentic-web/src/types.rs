//! Core data types shared by the perception, resolution and planning layers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One DOM node judged interactive during a single extraction pass.
///
/// Elements are rebuilt from scratch on every extraction; `eid` is only
/// meaningful within the pass that produced it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractiveElement {
    /// Short sequential identifier (`"e1"`, `"e2"`, ...).
    pub eid: String,
    pub tag: String,
    /// Lower-cased `type` attribute.
    #[serde(rename = "type")]
    pub input_type: String,
    pub name: String,
    pub id: String,
    /// Class list joined by single spaces.
    pub classes: String,
    /// Visible text, whitespace-collapsed and truncated.
    pub text: String,
    pub placeholder: String,
    pub value: String,
    pub href: String,
    pub aria_label: String,
    pub role: String,
    /// Option labels for `<select>` elements, in document order.
    pub options: Vec<String>,
    pub css_selector: String,
    /// Never empty; falls back to a bare `//tag` path.
    pub xpath: String,
    pub is_hidden: bool,
    pub is_required: bool,
    pub in_modal: bool,
}

/// Which elements an extraction pass keeps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMode {
    /// No tag restriction.
    #[default]
    AllFields,
    /// Form controls only.
    InputFields,
    /// Anchors and buttons only.
    LinksOnly,
}

impl ExtractionMode {
    /// Tags admitted by this mode, or `None` when every tag is admitted.
    ///
    /// Nodes that are interactive through a role, handler attribute,
    /// tabindex or contenteditable bypass the tag restriction.
    pub fn allowed_tags(self) -> Option<&'static [&'static str]> {
        match self {
            ExtractionMode::AllFields => None,
            ExtractionMode::InputFields => Some(&["input", "select", "textarea", "button"]),
            ExtractionMode::LinksOnly => Some(&["a", "button"]),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExtractionMode::AllFields => "all_fields",
            ExtractionMode::InputFields => "input_fields",
            ExtractionMode::LinksOnly => "links_only",
        }
    }
}

impl fmt::Display for ExtractionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExtractionMode {
    type Err = WebError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all_fields" => Ok(ExtractionMode::AllFields),
            "input_fields" => Ok(ExtractionMode::InputFields),
            "links_only" => Ok(ExtractionMode::LinksOnly),
            other => Err(WebError::InvalidInput(format!(
                "unknown extraction mode: {other}. Use all_fields, input_fields or links_only."
            ))),
        }
    }
}

/// One executed step as reported by the environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(default)]
    pub step: u32,
    /// Action type name as the environment recorded it.
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub candidate_id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default = "default_exec_ok")]
    pub exec_ok: bool,
    #[serde(default)]
    pub error: Option<String>,
}

fn default_exec_ok() -> bool {
    true
}

impl Default for HistoryEntry {
    fn default() -> Self {
        Self {
            step: 0,
            action: String::new(),
            candidate_id: None,
            text: None,
            exec_ok: true,
            error: None,
        }
    }
}

/// Errors raised by the I/O-facing parts of the library.
///
/// The perception pipeline itself is fail-soft and never returns these.
#[derive(thiserror::Error, Debug)]
pub enum WebError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Config error: {0}")]
    Config(String),
}

/// Convenience result type.
pub type WebResult<T> = Result<T, WebError>;

/// Truncate to `max_len` characters, marking the cut with an ellipsis.
pub(crate) fn truncate(s: &str, max_len: usize) -> String {
    let s = s.trim();
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max_len.saturating_sub(1)).collect();
    out.push('\u{2026}');
    out
}
