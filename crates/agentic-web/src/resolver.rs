//! Turns free-form model output into a validated [`Action`].
//!
//! Resolution is a two-phase pipeline. First a JSON object is located in the
//! text through an ordered chain of fallible strategies (whole text, balanced
//! brace scan, outermost braces). Then the object is normalized: the type is
//! mapped through the alias table, `eN` references are resolved against the
//! current element list, a CSS selector is approximated as XPath when no
//! XPath is given, and the required fields for the type are checked. Any
//! failure rejects the whole action.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::action::{Action, ActionKind, ScrollDirection};
use crate::types::{truncate, InteractiveElement};

/// Characters of raw output kept when logging an unparseable response.
const RAW_PREFIX_CHARS: usize = 200;

/// Fields that may carry a symbolic `eN` reference, in lookup order.
const REFERENCE_FIELDS: &[&str] = &["xpath", "selector", "css_selector", "target", "element"];

/// Fields holding a CSS selector to approximate when no XPath is given.
const CSS_FIELDS: &[&str] = &["selector", "css_selector", "css"];

/// Fields coalesced into `keys`, in priority order.
const KEY_FIELDS: &[&str] = &["keys", "key", "text"];

fn eid_ref_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^#?e(\d+)$").expect("eid reference regex is valid"))
}

fn embedded_eid_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\be(\d+)\b").expect("embedded eid regex is valid"))
}

fn action_key_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""action"\s*:\s*\{"#).expect("action key regex is valid"))
}

fn type_key_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""type"\s*:"#).expect("type key regex is valid"))
}

fn css_attr_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^(\w+)?\[(\w[\w-]*)="([^"]+)"\]$"#).expect("css attribute regex is valid")
    })
}

fn css_class_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\w+)\.(.+)$").expect("css class regex is valid"))
}

fn css_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\w+$").expect("css tag regex is valid"))
}

/// A field an action type may require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Xpath,
    Text,
    Url,
    Keys,
}

impl Field {
    pub fn as_str(self) -> &'static str {
        match self {
            Field::Xpath => "xpath",
            Field::Text => "text",
            Field::Url => "url",
            Field::Keys => "keys",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a model response produced no action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("could not extract an action from model output: {prefix}")]
    Unparseable { prefix: String },

    #[error("model chose to take no action")]
    NoAction,

    #[error("unknown action type: {0}")]
    UnknownType(String),

    #[error("missing required field '{field}' for action type '{kind}'")]
    MissingField { field: Field, kind: ActionKind },
}

/// A validated action plus the `eid` its selector was resolved from, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub action: Action,
    pub resolved_from: Option<String>,
}

/// Immutable lookup tables used during normalization.
#[derive(Debug, Clone)]
pub struct ResolverTables {
    /// Lower-case alias → canonical type.
    pub aliases: HashMap<String, ActionKind>,
    /// Fields each type must carry after resolution.
    pub required: HashMap<ActionKind, Vec<Field>>,
    /// Aliases meaning "press Enter"; they default `keys` to `Enter`.
    pub enter_aliases: HashSet<String>,
}

impl Default for ResolverTables {
    fn default() -> Self {
        use ActionKind::*;

        let aliases = [
            ("input", Fill),
            ("enter_text", Fill),
            ("enter", Fill),
            ("write", Fill),
            ("set_value", Fill),
            ("type_text", Type),
            ("append", Type),
            ("go_to", Navigate),
            ("goto", Navigate),
            ("go", Navigate),
            ("open", Navigate),
            ("visit", Navigate),
            ("press", Click),
            ("tap", Click),
            ("submit", Click),
            ("choose", SelectOption),
            ("select", SelectOption),
            ("dropdown", SelectOption),
            ("scroll_down", Scroll),
            ("scroll_up", Scroll),
            ("mouse_over", Hover),
            ("mouseover", Hover),
            ("hover_over", Hover),
            ("back", GoBack),
            ("navigate_back", GoBack),
            ("browser_back", GoBack),
            ("forward", GoForward),
            ("press_key", Keys),
            ("key", Keys),
            ("keyboard", Keys),
            ("press_enter", Keys),
            ("hit_enter", Keys),
            ("enter_key", Keys),
            ("send_keys", Keys),
            ("none", Noop),
            ("done", Noop),
            ("complete", Noop),
            ("wait", Noop),
            ("no_op", Noop),
            ("no_action", Noop),
        ]
        .into_iter()
        .map(|(alias, kind)| (alias.to_string(), kind))
        .collect();

        let required = [
            (Click, vec![Field::Xpath]),
            (Hover, vec![Field::Xpath]),
            (Fill, vec![Field::Xpath, Field::Text]),
            (Type, vec![Field::Xpath, Field::Text]),
            (SelectOption, vec![Field::Xpath, Field::Text]),
            (Navigate, vec![Field::Url]),
            (Keys, vec![Field::Keys]),
            (Scroll, vec![]),
            (GoBack, vec![]),
            (GoForward, vec![]),
            (Noop, vec![]),
        ]
        .into_iter()
        .collect();

        let enter_aliases = ["press_enter", "hit_enter", "enter_key"]
            .into_iter()
            .map(String::from)
            .collect();

        Self {
            aliases,
            required,
            enter_aliases,
        }
    }
}

impl ResolverTables {
    /// Canonical type for a raw (already lower-cased) type name.
    pub fn canonical(&self, raw: &str) -> Option<ActionKind> {
        self.aliases
            .get(raw)
            .copied()
            .or_else(|| raw.parse::<ActionKind>().ok())
    }

    pub fn required_fields(&self, kind: ActionKind) -> &[Field] {
        self.required.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Resolves model output against the current element list.
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    tables: ResolverTables,
}

impl Resolver {
    pub fn new(tables: ResolverTables) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &ResolverTables {
        &self.tables
    }

    /// Resolve, reporting why nothing was produced.
    pub fn try_resolve(
        &self,
        output: &str,
        elements: &[InteractiveElement],
    ) -> Result<Resolved, ResolveError> {
        let text = strip_fences(output);
        let raw = locate(&text, pick_action).ok_or_else(|| ResolveError::Unparseable {
            prefix: truncate(&text, RAW_PREFIX_CHARS),
        })?;
        self.normalize(raw, elements)
    }

    /// Resolve, logging and discarding any rejection.
    pub fn resolve(&self, output: &str, elements: &[InteractiveElement]) -> Option<Action> {
        match self.try_resolve(output, elements) {
            Ok(resolved) => Some(resolved.action),
            Err(ResolveError::NoAction) => {
                tracing::debug!("model chose no action");
                None
            }
            Err(err) => {
                tracing::warn!("{}", err);
                None
            }
        }
    }

    fn normalize(
        &self,
        mut raw: Map<String, Value>,
        elements: &[InteractiveElement],
    ) -> Result<Resolved, ResolveError> {
        let raw_type = raw
            .get("type")
            .or_else(|| raw.get("action"))
            .and_then(field_string)
            .unwrap_or_default()
            .trim()
            .to_lowercase();

        let kind = self
            .tables
            .canonical(&raw_type)
            .ok_or_else(|| ResolveError::UnknownType(raw_type.clone()))?;
        if kind == ActionKind::Noop {
            return Err(ResolveError::NoAction);
        }

        let resolved_from = resolve_references(&mut raw, elements);

        let mut xpath = string_field(&raw, "xpath");
        if xpath.is_none() {
            xpath = CSS_FIELDS
                .iter()
                .find_map(|key| string_field(&raw, key))
                .map(|css| css_to_xpath(&css))
                .filter(|x| !x.is_empty());
        }

        let text = literal_field(&raw, "text");
        let url = string_field(&raw, "url");
        let mut keys = KEY_FIELDS.iter().find_map(|key| literal_field(&raw, key));
        if kind == ActionKind::Keys && keys.is_none() && self.tables.enter_aliases.contains(&raw_type)
        {
            keys = Some("Enter".to_string());
        }

        for &field in self.tables.required_fields(kind) {
            let present = match field {
                Field::Xpath => xpath.is_some(),
                Field::Text => text.is_some(),
                Field::Url => url.is_some(),
                Field::Keys => keys.is_some(),
            };
            if !present {
                return Err(ResolveError::MissingField { field, kind });
            }
        }

        let xpath = xpath.unwrap_or_default();
        let text = text.unwrap_or_default();
        let action = match kind {
            ActionKind::Click => Action::Click { xpath },
            ActionKind::Hover => Action::Hover { xpath },
            ActionKind::Fill => Action::Fill { xpath, text },
            ActionKind::Type => Action::Type { xpath, text },
            ActionKind::SelectOption => Action::SelectOption { xpath, text },
            ActionKind::Navigate => Action::Navigate {
                url: url.unwrap_or_default(),
            },
            ActionKind::Scroll => Action::Scroll {
                direction: scroll_direction(&raw, &raw_type),
            },
            ActionKind::Keys => Action::Keys {
                keys: keys.unwrap_or_default(),
            },
            ActionKind::GoBack => Action::GoBack,
            ActionKind::GoForward => Action::GoForward,
            ActionKind::Noop => return Err(ResolveError::NoAction),
        };

        Ok(Resolved {
            action,
            resolved_from,
        })
    }
}

/// Resolve with the built-in tables.
pub fn resolve_action(output: &str, elements: &[InteractiveElement]) -> Option<Action> {
    static DEFAULT: OnceLock<Resolver> = OnceLock::new();
    DEFAULT.get_or_init(Resolver::default).resolve(output, elements)
}

/// The `thinking` field of the model's JSON envelope, if present.
pub fn extract_thinking(output: &str) -> Option<String> {
    let text = strip_fences(output);
    locate(&text, |obj| obj.get("thinking").and_then(field_string))
}

/// Best-effort translation of a simple CSS selector into XPath.
///
/// Handles absolute paths, `#id`, `tag[attr="val"]`, `tag.class` and bare
/// tags. Anything else is returned unchanged.
pub fn css_to_xpath(css: &str) -> String {
    let css = css.trim();
    if css.is_empty() {
        return String::new();
    }
    if css.starts_with('/') {
        return css.to_string();
    }
    if let Some(id) = css.strip_prefix('#') {
        return format!(r#"//*[@id="{}"]"#, id);
    }
    if let Some(caps) = css_attr_re().captures(css) {
        let tag = caps.get(1).map_or("*", |m| m.as_str());
        return format!(r#"//{}[@{}="{}"]"#, tag, &caps[2], &caps[3]);
    }
    if let Some(caps) = css_class_re().captures(css) {
        return format!(
            r#"//{}[contains(@class, "{}")]"#,
            &caps[1],
            caps[2].replace('.', " ")
        );
    }
    if css_tag_re().is_match(css) {
        return format!("//{}", css);
    }
    css.to_string()
}

/// Remove Markdown fence lines when the output opens with one.
fn strip_fences(output: &str) -> String {
    let text = output.trim();
    if !text.starts_with("```") {
        return text.to_string();
    }
    text.lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// A strategy proposes candidate JSON snippets, best first.
type Strategy = fn(&str) -> Vec<&str>;

const STRATEGIES: &[(&str, Strategy)] = &[
    ("whole_text", whole_text),
    ("balanced_object", balanced_objects),
    ("outermost_braces", outermost_braces),
];

/// Run the strategy chain, returning the first candidate `pick` accepts.
fn locate<T>(text: &str, pick: impl Fn(&Map<String, Value>) -> Option<T>) -> Option<T> {
    STRATEGIES.iter().find_map(|(name, strategy)| {
        strategy(text).into_iter().find_map(|candidate| {
            let obj = match serde_json::from_str::<Value>(candidate) {
                Ok(Value::Object(obj)) => obj,
                _ => return None,
            };
            let picked = pick(&obj)?;
            tracing::debug!(strategy = *name, "located JSON object in model output");
            Some(picked)
        })
    })
}

fn whole_text(text: &str) -> Vec<&str> {
    vec![text]
}

/// Brace-balanced spans that look like an envelope, then like an action.
fn balanced_objects(text: &str) -> Vec<&str> {
    let spans = balanced_spans(text);
    let with_action = spans.iter().filter(|s| action_key_re().is_match(s));
    let with_type = spans.iter().filter(|s| type_key_re().is_match(s));
    with_action.chain(with_type).copied().collect()
}

/// Every `{...}` span in one pass, ordered by opening position.
///
/// String literals are only tracked inside an open brace, so stray quotes in
/// surrounding prose do not hide the object.
fn balanced_spans(text: &str) -> Vec<&str> {
    let mut open: Vec<usize> = Vec::new();
    let mut spans: Vec<(usize, usize)> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' if !open.is_empty() => in_string = true,
            '{' => open.push(i),
            '}' => {
                if let Some(start) = open.pop() {
                    spans.push((start, i));
                }
            }
            _ => {}
        }
    }
    spans.sort_unstable_by_key(|&(start, _)| start);
    spans
        .into_iter()
        .map(|(start, end)| &text[start..=end])
        .collect()
}

fn outermost_braces(text: &str) -> Vec<&str> {
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if end > start => vec![&text[start..=end]],
        _ => Vec::new(),
    }
}

/// The action object inside an envelope, or the object itself.
fn pick_action(obj: &Map<String, Value>) -> Option<Map<String, Value>> {
    if let Some(Value::Object(action)) = obj.get("action") {
        return Some(action.clone());
    }
    if obj.contains_key("type") || matches!(obj.get("action"), Some(Value::String(_))) {
        return Some(obj.clone());
    }
    None
}

/// Rewrite `xpath` from `eN` references; returns the resolved `eid`.
fn resolve_references(
    raw: &mut Map<String, Value>,
    elements: &[InteractiveElement],
) -> Option<String> {
    let by_eid: HashMap<&str, &InteractiveElement> =
        elements.iter().map(|e| (e.eid.as_str(), e)).collect();
    let lookup = |digits: &str| lookup_eid(&by_eid, digits);

    let mut resolved_from = None;
    let mut xpath_is_dangling_ref = false;
    for &field in REFERENCE_FIELDS {
        let Some(value) = string_field(raw, field) else {
            continue;
        };
        let Some(caps) = eid_ref_re().captures(value.trim()) else {
            continue;
        };
        match lookup(&caps[1]) {
            Some((eid, element)) => {
                tracing::debug!("{} resolved {} -> {}", field, eid, element.xpath);
                raw.insert("xpath".into(), Value::String(element.xpath.clone()));
                resolved_from = Some(eid);
                xpath_is_dangling_ref = false;
                break;
            }
            None if field == "xpath" => xpath_is_dangling_ref = true,
            None => {}
        }
    }

    if xpath_is_dangling_ref {
        tracing::debug!("dropping unresolved element reference in xpath");
        raw.remove("xpath");
        return None;
    }

    if resolved_from.is_none() {
        if let Some(xpath) = string_field(raw, "xpath").filter(|x| !x.starts_with('/')) {
            if let Some((eid, element)) = embedded_eid_re()
                .captures(&xpath)
                .and_then(|caps| lookup(&caps[1]))
            {
                tracing::debug!("embedded reference {} -> {}", eid, element.xpath);
                raw.insert("xpath".into(), Value::String(element.xpath.clone()));
                resolved_from = Some(eid);
            }
        }
    }

    resolved_from
}

/// Element for the digits of an `eN` token; `e01` and `e1` are the same.
fn lookup_eid<'a>(
    by_eid: &HashMap<&str, &'a InteractiveElement>,
    digits: &str,
) -> Option<(String, &'a InteractiveElement)> {
    let eid = format!("e{}", digits.parse::<u64>().ok()?);
    let element = by_eid.get(eid.as_str()).copied()?;
    Some((eid, element))
}

fn scroll_direction(raw: &Map<String, Value>, raw_type: &str) -> ScrollDirection {
    match string_field(raw, "direction") {
        Some(direction) => ScrollDirection::parse_lenient(&direction),
        None if raw_type == "scroll_up" => ScrollDirection::Up,
        None => ScrollDirection::Down,
    }
}

/// A non-empty field coerced to a string.
fn string_field(raw: &Map<String, Value>, key: &str) -> Option<String> {
    raw.get(key)
        .and_then(field_string)
        .filter(|s| !s.trim().is_empty())
}

/// A field coerced to a string, kept verbatim; only absent or empty is missing.
fn literal_field(raw: &Map<String, Value>, key: &str) -> Option<String> {
    raw.get(key).and_then(field_string).filter(|s| !s.is_empty())
}

fn field_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn login_elements() -> Vec<InteractiveElement> {
        vec![
            InteractiveElement {
                eid: "e1".into(),
                tag: "button".into(),
                xpath: r#"//*[@id="login"]"#.into(),
                ..Default::default()
            },
            InteractiveElement {
                eid: "e2".into(),
                tag: "input".into(),
                xpath: r#"//input[@name="email"]"#.into(),
                ..Default::default()
            },
        ]
    }

    fn resolve(output: &str) -> Option<Action> {
        Resolver::default().resolve(output, &login_elements())
    }

    #[test]
    fn test_resolves_bare_eid() {
        let resolved = Resolver::default()
            .try_resolve(r#"{"type":"click","xpath":"e1"}"#, &login_elements())
            .unwrap();
        assert_eq!(
            resolved.action,
            Action::Click {
                xpath: r#"//*[@id="login"]"#.into()
            }
        );
        assert_eq!(resolved.resolved_from.as_deref(), Some("e1"));
    }

    #[test]
    fn test_resolves_hash_prefixed_and_other_fields() {
        assert_eq!(
            resolve(r##"{"type":"fill","element":"#E2","text":"a@b.c"}"##),
            Some(Action::Fill {
                xpath: r#"//input[@name="email"]"#.into(),
                text: "a@b.c".into(),
            })
        );
        assert_eq!(
            resolve(r#"{"type":"click","target":"e01"}"#),
            Some(Action::Click {
                xpath: r#"//*[@id="login"]"#.into()
            })
        );
    }

    #[test]
    fn test_embedded_reference_in_xpath() {
        assert_eq!(
            resolve(r#"{"type":"click","xpath":"[e2]"}"#),
            Some(Action::Click {
                xpath: r#"//input[@name="email"]"#.into()
            })
        );
        // Absolute paths are left alone even if they contain an eN token.
        assert_eq!(
            resolve(r#"{"type":"click","xpath":"//div[@id=\"e1\"]"}"#),
            Some(Action::Click {
                xpath: r#"//div[@id="e1"]"#.into()
            })
        );
    }

    #[test]
    fn test_unknown_reference_falls_back_to_css() {
        assert_eq!(
            resolve(r##"{"type":"click","xpath":"e99","selector":"#go"}"##),
            Some(Action::Click {
                xpath: r#"//*[@id="go"]"#.into()
            })
        );
        assert_eq!(resolve(r#"{"type":"click","xpath":"e99"}"#), None);
    }

    #[test]
    fn test_missing_text_is_rejected() {
        let err = Resolver::default()
            .try_resolve(r#"{"type":"fill","xpath":"//input"}"#, &[])
            .unwrap_err();
        assert_eq!(
            err,
            ResolveError::MissingField {
                field: Field::Text,
                kind: ActionKind::Fill
            }
        );
        assert_eq!(
            resolve_action(r#"{"type":"fill","xpath":"//input"}"#, &[]),
            None
        );
    }

    #[test]
    fn test_alias_normalization() {
        assert_eq!(
            resolve(r#"{"type":" GoTo ","url":"http://x"}"#),
            Some(Action::Navigate {
                url: "http://x".into()
            })
        );
        assert_eq!(
            resolve(r#"{"type":"scroll_up"}"#),
            Some(Action::Scroll {
                direction: ScrollDirection::Up
            })
        );
        assert_eq!(
            resolve(r#"{"type":"scroll"}"#),
            Some(Action::Scroll {
                direction: ScrollDirection::Down
            })
        );
        assert_eq!(resolve(r#"{"type":"back"}"#), Some(Action::GoBack));
    }

    #[test]
    fn test_noop_and_unknown_types() {
        let resolver = Resolver::default();
        assert_eq!(
            resolver.try_resolve(r#"{"type":"done"}"#, &[]),
            Err(ResolveError::NoAction)
        );
        assert_eq!(
            resolver.try_resolve(r#"{"type":"teleport"}"#, &[]),
            Err(ResolveError::UnknownType("teleport".into()))
        );
    }

    #[test]
    fn test_keys_coalescing() {
        assert_eq!(
            resolve(r#"{"type":"press_enter"}"#),
            Some(Action::Keys {
                keys: "Enter".into()
            })
        );
        assert_eq!(
            resolve(r#"{"type":"send_keys","key":"Tab"}"#),
            Some(Action::Keys { keys: "Tab".into() })
        );
        assert_eq!(resolve(r#"{"type":"keys"}"#), None);
    }

    #[test]
    fn test_envelope_and_fences() {
        let output = "```json\n{\"thinking\": \"log in\", \"action\": {\"type\": \"click\", \"xpath\": \"e1\"}}\n```";
        assert_eq!(
            resolve(output),
            Some(Action::Click {
                xpath: r#"//*[@id="login"]"#.into()
            })
        );
        assert_eq!(extract_thinking(output).as_deref(), Some("log in"));
    }

    #[test]
    fn test_json_embedded_in_prose() {
        let output = r#"I will press it now. {"thinking": "go", "action": {"type": "tap", "xpath": "e1"}} Done."#;
        assert_eq!(
            resolve(output),
            Some(Action::Click {
                xpath: r#"//*[@id="login"]"#.into()
            })
        );
        let bare = r#"Next: {"type": "fill", "xpath": "e2", "text": "x{y}"} ok"#;
        assert_eq!(
            resolve(bare),
            Some(Action::Fill {
                xpath: r#"//input[@name="email"]"#.into(),
                text: "x{y}".into(),
            })
        );
    }

    #[test]
    fn test_outermost_braces_fallback() {
        // The inner object has a string `action`, which neither key pattern
        // of the balanced scan accepts.
        assert_eq!(
            resolve(r#"Sure: {"action":"navigate","url":"http://x"} ok"#),
            Some(Action::Navigate {
                url: "http://x".into()
            })
        );
    }

    #[test]
    fn test_balanced_spans() {
        let text = r#"Say "hi {"type": "a", "x": {"y": "}"}} and {}"#;
        assert_eq!(
            balanced_spans(text),
            vec![r#"{"type": "a", "x": {"y": "}"}}"#, r#"{"y": "}"}"#, "{}"]
        );
    }

    #[test]
    fn test_whitespace_text_is_kept() {
        assert_eq!(
            resolve(r#"{"type":"type","xpath":"//input","text":" "}"#),
            Some(Action::Type {
                xpath: "//input".into(),
                text: " ".into()
            })
        );
        assert_eq!(
            resolve(r#"{"type":"keys","keys":" "}"#),
            Some(Action::Keys { keys: " ".into() })
        );
        assert_eq!(resolve(r#"{"type":"fill","xpath":"//input","text":""}"#), None);
        assert_eq!(resolve(r#"{"type":"click","xpath":"  "}"#), None);
    }

    #[test]
    fn test_unparseable_output() {
        let err = Resolver::default()
            .try_resolve("I am not sure what to do.", &[])
            .unwrap_err();
        assert!(matches!(err, ResolveError::Unparseable { .. }));
        assert_eq!(extract_thinking("nothing here"), None);
    }

    #[test]
    fn test_string_action_field_is_the_type() {
        assert_eq!(
            resolve(r#"{"action":"navigate","url":"https://a.b"}"#),
            Some(Action::Navigate {
                url: "https://a.b".into()
            })
        );
    }

    #[test]
    fn test_text_coerced_to_string() {
        assert_eq!(
            resolve(r#"{"type":"select","xpath":"//select","text":3}"#),
            Some(Action::SelectOption {
                xpath: "//select".into(),
                text: "3".into(),
            })
        );
    }

    #[test]
    fn test_css_to_xpath() {
        assert_eq!(css_to_xpath("//a"), "//a");
        assert_eq!(css_to_xpath("#main"), r#"//*[@id="main"]"#);
        assert_eq!(
            css_to_xpath(r#"input[name="q"]"#),
            r#"//input[@name="q"]"#
        );
        assert_eq!(css_to_xpath(r#"[data-x="1"]"#), r#"//*[@data-x="1"]"#);
        assert_eq!(
            css_to_xpath("button.btn.primary"),
            r#"//button[contains(@class, "btn primary")]"#
        );
        assert_eq!(css_to_xpath("form"), "//form");
        assert_eq!(css_to_xpath("div > a"), "div > a");
        assert_eq!(css_to_xpath("  "), "");
    }
}
