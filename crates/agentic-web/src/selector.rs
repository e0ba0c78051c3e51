//! Stability-biased selector synthesis for a single DOM node.
//!
//! Both the CSS-like selector and the XPath follow the same preference for
//! attributes that survive page reloads: `name`, then `aria-label`, then an
//! `id` that passes [`is_stable_id`]. They diverge below that point. The
//! XPath prefers short direct text over volatile ids, the CSS selector prefers
//! classes. Either may degrade to the bare tag, which is expected to match
//! more than one node.

use std::sync::OnceLock;

use regex::Regex;
use scraper::ElementRef;

/// Longest direct text (exclusive) that is used as an XPath key.
const MAX_TEXT_KEY_LEN: usize = 50;

/// Characters of direct text embedded in a text-matching XPath.
const TEXT_KEY_CHARS: usize = 40;

/// Selector pair synthesized for one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedSelector {
    pub css: String,
    pub xpath: String,
}

fn stable_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_-]{0,30}$").expect("stable id regex is valid"))
}

fn numeric_suffix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[-_]\d+$").expect("numeric suffix regex is valid"))
}

fn hex_run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[0-9A-Fa-f]{8,}").expect("hex run regex is valid"))
}

/// Whether an `id` is likely to survive a reload.
///
/// Anti-scraping stacks mint per-render ids such as `card-2`, `item_17` or
/// `btn-9f8e7d6c5b`; those fail this check.
pub fn is_stable_id(id: &str) -> bool {
    stable_id_re().is_match(id) && !numeric_suffix_re().is_match(id) && !hex_run_re().is_match(id)
}

/// Synthesize the CSS-like selector and the XPath for `el`.
pub fn synthesize(el: &ElementRef<'_>) -> SynthesizedSelector {
    SynthesizedSelector {
        css: build_css_selector(el),
        xpath: build_xpath(el),
    }
}

/// Build the XPath for `el`, first applicable rule wins:
/// name, aria-label, stable id, short direct text, any id, first class, tag.
pub fn build_xpath(el: &ElementRef<'_>) -> String {
    let element = el.value();
    let tag = element.name();

    if let Some(name) = non_empty_attr(el, "name") {
        return format!("//{tag}[@name={}]", xpath_literal(name));
    }
    if let Some(aria) = non_empty_attr(el, "aria-label") {
        return format!("//{tag}[@aria-label={}]", xpath_literal(aria));
    }

    let id = non_empty_attr(el, "id");
    if let Some(id) = id.filter(|id| is_stable_id(id)) {
        return format!("//*[@id={}]", xpath_literal(id));
    }

    let text = direct_text(el);
    if !text.is_empty()
        && text.chars().count() < MAX_TEXT_KEY_LEN
        && !text.contains(['"', '\''])
    {
        let key: String = text.chars().take(TEXT_KEY_CHARS).collect();
        return format!("//{tag}[contains(text(), \"{key}\")]");
    }

    if let Some(id) = id {
        return format!("//*[@id={}]", xpath_literal(id));
    }

    if let Some(class) = class_list(el).next() {
        return format!("//{tag}[contains(@class, {})]", xpath_literal(class));
    }

    format!("//{tag}")
}

/// Build the CSS-like selector for `el`:
/// name, aria-label, stable id, classes, any id, tag.
pub fn build_css_selector(el: &ElementRef<'_>) -> String {
    let element = el.value();
    let tag = element.name();

    if let Some(name) = non_empty_attr(el, "name") {
        return format!("{tag}[name=\"{}\"]", escape_css_string(name));
    }
    if let Some(aria) = non_empty_attr(el, "aria-label") {
        return format!("{tag}[aria-label=\"{}\"]", escape_css_string(aria));
    }

    let id = non_empty_attr(el, "id");
    if let Some(id) = id.filter(|id| is_stable_id(id)) {
        return format!("#{id}");
    }

    let classes: Vec<String> = class_list(el).map(escape_css_ident).collect();
    if !classes.is_empty() {
        return format!("{tag}.{}", classes.join("."));
    }

    if let Some(id) = id {
        return format!("#{}", escape_css_ident(id));
    }

    tag.to_string()
}

/// Classes in attribute order. `Element::classes` sorts them.
pub(crate) fn class_list<'a>(el: &ElementRef<'a>) -> impl Iterator<Item = &'a str> {
    el.value().attr("class").unwrap_or("").split_whitespace()
}

/// Text held directly by `el`, excluding descendant elements, whitespace-collapsed.
pub fn direct_text(el: &ElementRef<'_>) -> String {
    let joined = el
        .children()
        .filter_map(|child| child.value().as_text().map(|t| &**t))
        .collect::<Vec<&str>>()
        .join(" ");
    collapse_whitespace(&joined)
}

pub(crate) fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn non_empty_attr<'a>(el: &ElementRef<'a>, attr: &str) -> Option<&'a str> {
    el.value().attr(attr).map(str::trim).filter(|v| !v.is_empty())
}

/// Quote `s` as an XPath 1.0 string literal.
pub fn xpath_literal(s: &str) -> String {
    if !s.contains('"') {
        return format!("\"{s}\"");
    }
    if !s.contains('\'') {
        return format!("'{s}'");
    }
    let parts: Vec<String> = s
        .split('"')
        .map(|part| format!("\"{part}\""))
        .collect();
    format!("concat({})", parts.join(", '\"', "))
}

fn escape_css_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn escape_css_ident(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for (i, c) in s.chars().enumerate() {
        if i == 0 && c.is_ascii_digit() {
            out.push_str(&format!("\\3{c} "));
        } else if c.is_ascii_alphanumeric() || c == '-' || c == '_' || !c.is_ascii() {
            out.push(c);
        } else {
            out.push('\\');
            out.push(c);
        }
    }
    out
}
