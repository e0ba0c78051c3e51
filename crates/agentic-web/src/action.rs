//! Resolved actions handed to the environment.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Canonical action types understood by the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Click,
    Fill,
    Type,
    SelectOption,
    Navigate,
    Scroll,
    Hover,
    Keys,
    GoBack,
    GoForward,
    Noop,
}

impl ActionKind {
    pub const ALL: [ActionKind; 11] = [
        ActionKind::Click,
        ActionKind::Fill,
        ActionKind::Type,
        ActionKind::SelectOption,
        ActionKind::Navigate,
        ActionKind::Scroll,
        ActionKind::Hover,
        ActionKind::Keys,
        ActionKind::GoBack,
        ActionKind::GoForward,
        ActionKind::Noop,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Click => "click",
            ActionKind::Fill => "fill",
            ActionKind::Type => "type",
            ActionKind::SelectOption => "select_option",
            ActionKind::Navigate => "navigate",
            ActionKind::Scroll => "scroll",
            ActionKind::Hover => "hover",
            ActionKind::Keys => "keys",
            ActionKind::GoBack => "go_back",
            ActionKind::GoForward => "go_forward",
            ActionKind::Noop => "noop",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// Scroll direction; unknown values fall back to `Down`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollDirection {
    Up,
    #[default]
    Down,
    Left,
    Right,
}

impl ScrollDirection {
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" => ScrollDirection::Up,
            "left" => ScrollDirection::Left,
            "right" => ScrollDirection::Right,
            _ => ScrollDirection::Down,
        }
    }
}

/// A validated instruction for the environment.
///
/// Each variant carries exactly the fields its type requires, so an `Action`
/// can never be partially formed. "No action" is represented by `None` at
/// the call sites, never by a variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Click { xpath: String },
    Hover { xpath: String },
    Fill { xpath: String, text: String },
    Type { xpath: String, text: String },
    SelectOption { xpath: String, text: String },
    Navigate { url: String },
    Scroll { direction: ScrollDirection },
    Keys { keys: String },
    GoBack,
    GoForward,
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Click { .. } => ActionKind::Click,
            Action::Hover { .. } => ActionKind::Hover,
            Action::Fill { .. } => ActionKind::Fill,
            Action::Type { .. } => ActionKind::Type,
            Action::SelectOption { .. } => ActionKind::SelectOption,
            Action::Navigate { .. } => ActionKind::Navigate,
            Action::Scroll { .. } => ActionKind::Scroll,
            Action::Keys { .. } => ActionKind::Keys,
            Action::GoBack => ActionKind::GoBack,
            Action::GoForward => ActionKind::GoForward,
        }
    }

    /// The element selector or URL this action is aimed at, if any.
    pub fn target(&self) -> Option<&str> {
        match self {
            Action::Click { xpath }
            | Action::Hover { xpath }
            | Action::Fill { xpath, .. }
            | Action::Type { xpath, .. }
            | Action::SelectOption { xpath, .. } => Some(xpath),
            Action::Navigate { url } => Some(url),
            Action::Scroll { .. } | Action::Keys { .. } | Action::GoBack | Action::GoForward => {
                None
            }
        }
    }

    /// Text typed or chosen by this action, if any.
    pub fn text(&self) -> Option<&str> {
        match self {
            Action::Fill { text, .. }
            | Action::Type { text, .. }
            | Action::SelectOption { text, .. } => Some(text),
            Action::Keys { keys } => Some(keys),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_shape() {
        let action = Action::Click {
            xpath: r#"//*[@id="login"]"#.into(),
        };
        assert_eq!(
            serde_json::to_value(&action).unwrap(),
            json!({"type": "click", "xpath": "//*[@id=\"login\"]"})
        );
        assert_eq!(
            serde_json::to_value(Action::GoBack).unwrap(),
            json!({"type": "go_back"})
        );
        assert_eq!(
            serde_json::to_value(Action::Scroll {
                direction: ScrollDirection::Up
            })
            .unwrap(),
            json!({"type": "scroll", "direction": "up"})
        );
    }

    #[test]
    fn test_kind_names() {
        for kind in ActionKind::ALL {
            assert_eq!(kind.as_str().parse::<ActionKind>(), Ok(kind));
        }
        assert!("teleport".parse::<ActionKind>().is_err());
    }

    #[test]
    fn test_target_and_text() {
        let fill = Action::Fill {
            xpath: "//input".into(),
            text: "hi".into(),
        };
        assert_eq!(fill.kind(), ActionKind::Fill);
        assert_eq!(fill.target(), Some("//input"));
        assert_eq!(fill.text(), Some("hi"));
        assert_eq!(Action::GoForward.target(), None);
    }
}
