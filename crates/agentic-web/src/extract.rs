//! Interactive element extraction from raw HTML snapshots.
//!
//! A single document-order walk classifies every node, filters decoys and
//! skip-listed tags, applies the extraction mode, synthesizes selectors and
//! deduplicates. Elements inside an open dialog are promoted ahead of the
//! rest of the page before `eid`s are assigned.
//!
//! Extraction is synchronous and never fails: unparseable input yields an
//! empty list.

use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::OnceLock;

use scraper::{ElementRef, Html, Selector};

use crate::config::PerceptionConfig;
use crate::selector::{class_list, collapse_whitespace, synthesize};
use crate::summary::PageSummarizer;
use crate::types::{truncate, ExtractionMode, InteractiveElement};

/// Tags that are interactive on their own.
const INTERACTIVE_TAGS: &[&str] = &["input", "button", "select", "textarea", "a"];

/// Event-handler-like attributes that make any node interactive.
const INTERACTIVE_ATTRS: &[&str] = &[
    "onclick",
    "onsubmit",
    "onchange",
    "ng-click",
    "v-on:click",
    "@click",
];

/// ARIA roles that imply interactivity.
const INTERACTIVE_ROLES: &[&str] = &[
    "button", "link", "tab", "menuitem", "checkbox", "radio", "switch", "combobox", "listbox",
    "option", "textbox",
];

/// Non-content tags never reported.
const SKIP_TAGS: &[&str] = &[
    "script", "style", "noscript", "svg", "path", "meta", "link", "head",
];

/// Candidate modal containers, queried independently.
const MODAL_QUERIES: &[&str] = &[
    r#"[role="dialog"], [role="alertdialog"]"#,
    "dialog[open]",
    r#"[aria-modal="true"]"#,
];

/// Characters of leading text used to tell same-selector nodes apart.
const DEDUP_TEXT_CHARS: usize = 30;

fn option_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("option").expect("option selector is valid"))
}

/// Walks a parsed document and builds the interactive element list.
#[derive(Debug, Clone, Default)]
pub struct ElementExtractor {
    config: PerceptionConfig,
}

impl ElementExtractor {
    pub fn new(config: PerceptionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PerceptionConfig {
        &self.config
    }

    /// Extract interactive elements from `html` under `mode`.
    ///
    /// The result holds at most `max_elements` entries, modal elements first,
    /// with `eid`s numbered densely from `e1` over the final order.
    pub fn extract(&self, html: &str, mode: ExtractionMode) -> Vec<InteractiveElement> {
        if html.trim().is_empty() {
            return Vec::new();
        }
        let Some(document) = parse_html(html) else {
            return Vec::new();
        };

        let modal_roots: HashSet<_> = MODAL_QUERIES
            .iter()
            .filter_map(|query| Selector::parse(query).ok())
            .flat_map(|selector| {
                document
                    .select(&selector)
                    .map(|el| el.id())
                    .collect::<Vec<_>>()
            })
            .collect();
        let in_modal = |el: &ElementRef<'_>| {
            !modal_roots.is_empty()
                && (modal_roots.contains(&el.id())
                    || el.ancestors().any(|a| modal_roots.contains(&a.id())))
        };
        let allowed_tags = mode.allowed_tags();

        let mut elements: Vec<InteractiveElement> = Vec::new();
        let mut seen_keys: HashSet<String> = HashSet::new();

        for node in document.root_element().descendants() {
            let Some(el) = ElementRef::wrap(node) else {
                continue;
            };
            let tag = el.value().name();

            if SKIP_TAGS.contains(&tag) || !is_interactive(&el) {
                continue;
            }
            if let Some(allowed) = allowed_tags {
                if !allowed.contains(&tag) && !has_non_tag_interactivity(&el) {
                    continue;
                }
            }
            if self.is_decoy(&el) {
                tracing::debug!("Skipping decoy <{tag}>");
                continue;
            }

            let selector = synthesize(&el);
            let text = truncate(&element_text(&el), self.config.max_text_len);

            let key = dedup_key(&selector.css, &el, &text);
            let fresh = seen_keys.insert(key);
            if !fresh && selector.css != tag {
                continue;
            }

            elements.push(self.build_element(
                &el,
                selector.css,
                selector.xpath,
                text,
                in_modal(&el),
            ));
        }

        let elements = promote_modal(elements, self.config.max_elements);
        tracing::debug!(
            "Extracted {} interactive elements ({} in modal, mode={mode})",
            elements.len(),
            elements.iter().filter(|e| e.in_modal).count()
        );
        elements
    }

    fn build_element(
        &self,
        el: &ElementRef<'_>,
        css_selector: String,
        xpath: String,
        text: String,
        in_modal: bool,
    ) -> InteractiveElement {
        let element = el.value();
        let attr = |name: &str| element.attr(name).unwrap_or("").to_string();
        let tag = element.name().to_string();

        let options = if tag == "select" {
            select_options(el)
        } else {
            Vec::new()
        };

        InteractiveElement {
            eid: String::new(),
            input_type: attr("type").to_lowercase(),
            name: attr("name"),
            id: attr("id"),
            classes: class_list(el).collect::<Vec<_>>().join(" "),
            text,
            placeholder: attr("placeholder"),
            value: attr("value"),
            href: attr("href"),
            aria_label: attr("aria-label"),
            role: attr("role").to_lowercase(),
            options,
            css_selector,
            xpath,
            is_hidden: self.is_hidden(el),
            is_required: is_required(el),
            in_modal,
            tag,
        }
    }

    /// A node is a decoy when it, or one of its nearest ancestors, carries a
    /// decoy marker attribute.
    fn is_decoy(&self, el: &ElementRef<'_>) -> bool {
        let marked = |e: &ElementRef<'_>| {
            self.config.decoy_attributes.iter().any(|attr| {
                e.value()
                    .attr(attr)
                    .is_some_and(|v| !v.trim().eq_ignore_ascii_case("false"))
            })
        };
        marked(el)
            || el
                .ancestors()
                .filter_map(ElementRef::wrap)
                .take(self.config.decoy_ancestor_depth)
                .any(|a| marked(&a))
    }

    fn is_hidden(&self, el: &ElementRef<'_>) -> bool {
        let element = el.value();
        if hidden_by_self(el) {
            return true;
        }
        if element
            .attr("type")
            .is_some_and(|t| t.trim().eq_ignore_ascii_case("hidden"))
        {
            return true;
        }
        el.ancestors()
            .filter_map(ElementRef::wrap)
            .take(self.config.hidden_ancestor_depth)
            .filter(|a| !matches!(a.value().name(), "html" | "body"))
            .any(|a| hidden_by_self(&a))
    }
}

/// Extract with the default configuration.
pub fn extract_elements(html: &str, mode: ExtractionMode) -> Vec<InteractiveElement> {
    ElementExtractor::default().extract(html, mode)
}

/// Extract interactive elements and a readable page summary in one call.
pub fn process_html(html: &str, mode: ExtractionMode) -> (Vec<InteractiveElement>, String) {
    if html.trim().is_empty() {
        return (Vec::new(), String::new());
    }
    let config = PerceptionConfig::default();
    let elements = ElementExtractor::new(config.clone()).extract(html, mode);
    let summary = PageSummarizer::new(config).summarize(html);
    (elements, summary)
}

/// Parse leniently: full-document parse first, fragment parse as fallback.
///
/// html5ever recovers from any markup, so the fragment parser is the only
/// fallback and only runs if the document parser panics (the panic hook
/// still reports that panic on stderr).
pub(crate) fn parse_html(html: &str) -> Option<Html> {
    let strategies: [(&str, fn(&str) -> Html); 2] = [
        ("document", Html::parse_document),
        ("fragment", Html::parse_fragment),
    ];
    for (label, parse) in strategies {
        match panic::catch_unwind(AssertUnwindSafe(|| parse(html))) {
            Ok(document) => return Some(document),
            Err(_) => tracing::warn!("HTML {label} parser failed, trying next strategy"),
        }
    }
    tracing::warn!("All HTML parsers failed; treating page as empty");
    None
}

/// Stable partition with modal elements first, cut to `max` and renumbered.
///
/// The cap applies after promotion so a dialog late in the document keeps
/// its controls.
fn promote_modal(elements: Vec<InteractiveElement>, max: usize) -> Vec<InteractiveElement> {
    let (mut ordered, rest): (Vec<_>, Vec<_>) = elements.into_iter().partition(|e| e.in_modal);
    ordered.extend(rest);
    if ordered.len() > max {
        tracing::debug!(
            "Element cap of {} reached, dropping {} elements",
            max,
            ordered.len() - max
        );
        ordered.truncate(max);
    }
    for (i, element) in ordered.iter_mut().enumerate() {
        element.eid = format!("e{}", i + 1);
    }
    ordered
}

fn is_interactive(el: &ElementRef<'_>) -> bool {
    INTERACTIVE_TAGS.contains(&el.value().name()) || has_non_tag_interactivity(el)
}

/// Interactive through a handler attribute, role, contenteditable or tabindex,
/// independent of the tag.
fn has_non_tag_interactivity(el: &ElementRef<'_>) -> bool {
    let element = el.value();
    if INTERACTIVE_ATTRS
        .iter()
        .any(|attr| element.attr(attr).is_some_and(|v| !v.is_empty()))
    {
        return true;
    }
    if let Some(role) = element.attr("role") {
        if INTERACTIVE_ROLES.contains(&role.trim().to_lowercase().as_str()) {
            return true;
        }
    }
    if let Some(editable) = element.attr("contenteditable") {
        let editable = editable.trim();
        if editable.is_empty() || editable.eq_ignore_ascii_case("true") {
            return true;
        }
    }
    element
        .attr("tabindex")
        .is_some_and(|t| t.trim() != "-1")
}

fn dedup_key(css: &str, el: &ElementRef<'_>, text: &str) -> String {
    let element = el.value();
    let differentiator = element
        .attr("href")
        .filter(|v| !v.is_empty())
        .or_else(|| element.attr("name").filter(|v| !v.is_empty()))
        .map(str::to_string)
        .unwrap_or_else(|| text.chars().take(DEDUP_TEXT_CHARS).collect());
    format!("{css}|{differentiator}")
}

fn element_text(el: &ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}

fn select_options(el: &ElementRef<'_>) -> Vec<String> {
    el.select(option_selector())
        .filter_map(|opt| {
            let text = element_text(&opt);
            if !text.is_empty() {
                return Some(text);
            }
            opt.value()
                .attr("value")
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        })
        .collect()
}

fn is_required(el: &ElementRef<'_>) -> bool {
    let element = el.value();
    element.attr("required").is_some()
        || element
            .attr("aria-required")
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
}

/// Hidden through its own inline style, `hidden` or `aria-hidden`.
fn hidden_by_self(el: &ElementRef<'_>) -> bool {
    let element = el.value();
    element.attr("hidden").is_some()
        || element
            .attr("aria-hidden")
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
        || element.attr("style").is_some_and(style_hides)
}

/// Whether an inline style declaration list hides the node.
fn style_hides(style: &str) -> bool {
    style.split(';').any(|decl| {
        let Some((prop, value)) = decl.split_once(':') else {
            return false;
        };
        let prop = prop.trim().to_ascii_lowercase();
        let value = value
            .trim()
            .trim_end_matches("!important")
            .trim()
            .to_ascii_lowercase();
        match prop.as_str() {
            "display" => value == "none",
            "visibility" => value == "hidden",
            "pointer-events" => value == "none",
            "opacity" => value.parse::<f32>().is_ok_and(|o| o <= 0.0),
            _ => false,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(html: &str) -> Vec<InteractiveElement> {
        extract_elements(html, ExtractionMode::AllFields)
    }

    #[test]
    fn test_basic_form() {
        let html = r#"
        <html><body>
            <form>
                <input type="email" name="email" placeholder="Email" required />
                <input type="password" name="password" />
                <select name="country">
                    <option value="us">United States</option>
                    <option value="ca"></option>
                </select>
                <button type="submit">Sign in</button>
            </form>
        </body></html>
        "#;

        let elements = extract(html);
        assert_eq!(elements.len(), 4);

        let email = &elements[0];
        assert_eq!(email.eid, "e1");
        assert_eq!(email.input_type, "email");
        assert_eq!(email.xpath, r#"//input[@name="email"]"#);
        assert!(email.is_required);
        assert!(!elements[1].is_required);

        let select = &elements[2];
        assert_eq!(select.options, vec!["United States", "ca"]);

        let button = &elements[3];
        assert_eq!(button.eid, "e4");
        assert_eq!(button.text, "Sign in");
        assert_eq!(button.xpath, r#"//button[contains(text(), "Sign in")]"#);
    }

    #[test]
    fn test_non_tag_interactivity() {
        let html = r#"
        <div onclick="go()">Clickable div</div>
        <span role="button">Role span</span>
        <div contenteditable="true">Editor</div>
        <li tabindex="0">Focusable</li>
        <li tabindex="-1">Not focusable</li>
        <p>Plain text</p>
        "#;

        let elements = extract(html);
        let tags: Vec<&str> = elements.iter().map(|e| e.tag.as_str()).collect();
        assert_eq!(tags, vec!["div", "span", "div", "li"]);
    }

    #[test]
    fn test_skip_tags_ignored() {
        let html = r#"<svg onclick="x()"><path onclick="y()"></path></svg><a href="/ok">ok</a>"#;
        let elements = extract(html);
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].tag, "a");
    }

    #[test]
    fn test_decoys_and_descendants_skipped() {
        let html = r#"
        <div data-decoy="1"><div><div><button>Trap</button></div></div></div>
        <button data-decoy>Also trap</button>
        <button>Real</button>
        "#;
        let elements = extract(html);
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].text, "Real");
    }

    #[test]
    fn test_decoy_scan_is_bounded() {
        let html = r#"
        <div data-decoy="1"><div><div><div><div><div><div>
            <button>Deep</button>
        </div></div></div></div></div></div></div>
        "#;
        let elements = extract(html);
        assert_eq!(elements.len(), 1);
    }

    #[test]
    fn test_mode_filters() {
        let html = r#"
        <a href="/home">Home</a>
        <input name="q" />
        <button>Go</button>
        <div role="tab">Tab</div>
        <textarea name="notes"></textarea>
        "#;

        let inputs = extract_elements(html, ExtractionMode::InputFields);
        let tags: Vec<&str> = inputs.iter().map(|e| e.tag.as_str()).collect();
        assert_eq!(tags, vec!["input", "button", "div", "textarea"]);

        let links = extract_elements(html, ExtractionMode::LinksOnly);
        let tags: Vec<&str> = links.iter().map(|e| e.tag.as_str()).collect();
        assert_eq!(tags, vec!["a", "button", "div"]);
    }

    #[test]
    fn test_dedup_by_selector_and_differentiator() {
        let html = r#"
        <button class="add">Add</button>
        <button class="add">Add</button>
        <button class="add">Remove</button>
        <a class="nav" href="/a">A</a>
        <a class="nav" href="/b">B</a>
        "#;
        let elements = extract(html);
        let texts: Vec<&str> = elements.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["Add", "Remove", "A", "B"]);
    }

    #[test]
    fn test_bare_tag_selectors_never_deduped() {
        let html = "<button></button><button></button><button></button>";
        let elements = extract(html);
        assert_eq!(elements.len(), 3);
        assert!(elements.iter().all(|e| e.xpath == "//button"));
    }

    #[test]
    fn test_element_cap() {
        let html: String = (0..200)
            .map(|i| format!(r#"<a href="/p/{i}">Item {i}</a>"#))
            .collect();
        let elements = extract(&html);
        assert_eq!(elements.len(), 150);
        assert_eq!(elements[149].eid, "e150");

        let small = ElementExtractor::new(PerceptionConfig {
            max_elements: 5,
            ..PerceptionConfig::default()
        });
        assert_eq!(small.extract(&html, ExtractionMode::AllFields).len(), 5);
    }

    #[test]
    fn test_hidden_detection() {
        let html = r#"
        <input name="a" style="display: none" />
        <input name="b" type="hidden" />
        <input name="c" hidden />
        <input name="d" aria-hidden="true" />
        <div style="visibility:hidden"><span><input name="e" /></span></div>
        <input name="f" style="opacity: 0.5" />
        <input name="g" style="opacity:0" />
        <input name="h" />
        <input name="i" style="pointer-events: none !important" />
        "#;
        let elements = extract(html);
        let hidden: Vec<(&str, bool)> = elements
            .iter()
            .map(|e| (e.name.as_str(), e.is_hidden))
            .collect();
        assert_eq!(
            hidden,
            vec![
                ("a", true),
                ("b", true),
                ("c", true),
                ("d", true),
                ("e", true),
                ("f", false),
                ("g", true),
                ("h", false),
                ("i", true),
            ]
        );
    }

    #[test]
    fn test_hidden_inheritance_is_bounded() {
        let html = r#"
        <div style="display:none"><div><div><div><input name="deep" /></div></div></div></div>
        "#;
        let elements = extract(html);
        assert_eq!(elements.len(), 1);
        assert!(!elements[0].is_hidden);
    }

    #[test]
    fn test_aria_required() {
        let html = r#"<input name="x" aria-required="TRUE" />"#;
        assert!(extract(html)[0].is_required);
    }

    #[test]
    fn test_modal_elements_promoted() {
        let html = r#"
        <a href="/home">Home</a>
        <button>Background</button>
        <div role="dialog">
            <p>Accept cookies?</p>
            <button>Accept</button>
            <button>Reject</button>
        </div>
        <input name="search" />
        "#;
        let elements = extract(html);
        let summary: Vec<(&str, &str, bool)> = elements
            .iter()
            .map(|e| (e.eid.as_str(), e.text.as_str(), e.in_modal))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("e1", "Accept", true),
                ("e2", "Reject", true),
                ("e3", "Home", false),
                ("e4", "Background", false),
                ("e5", "", false),
            ]
        );
    }

    #[test]
    fn test_open_dialog_and_aria_modal() {
        let html = r#"
        <button>Outside</button>
        <dialog open><button>In dialog</button></dialog>
        <dialog><button>Closed dialog</button></dialog>
        <section aria-modal="true"><a href="/x">In aria modal</a></section>
        "#;
        let elements = extract(html);
        let modal: Vec<&str> = elements
            .iter()
            .filter(|e| e.in_modal)
            .map(|e| e.text.as_str())
            .collect();
        assert_eq!(modal, vec!["In dialog", "In aria modal"]);
        assert_eq!(elements[0].eid, "e1");
        assert!(elements[0].in_modal);
    }

    #[test]
    fn test_alertdialog_is_modal() {
        let html = r#"
        <a href="/home">Home</a>
        <div role="alertdialog"><button name="ok" class="zeta alpha">OK</button></div>
        "#;
        let elements = extract(html);
        assert_eq!(elements[0].name, "ok");
        assert_eq!(elements[0].classes, "zeta alpha");
        assert!(elements[0].in_modal);
        assert_eq!(elements[1].href, "/home");
        assert!(!elements[1].in_modal);
    }

    #[test]
    fn test_cap_keeps_late_dialog() {
        let links: String = (0..160)
            .map(|i| format!(r#"<a href="/p/{i}">Item {i}</a>"#))
            .collect();
        let html = format!(
            r#"{links}<div role="dialog"><button name="accept">Accept</button></div>"#
        );
        let elements = extract(&html);
        assert_eq!(elements.len(), 150);
        assert_eq!(elements[0].eid, "e1");
        assert_eq!(elements[0].name, "accept");
        assert!(elements[0].in_modal);
        assert_eq!(elements[149].text, "Item 148");
        assert_eq!(elements[149].eid, "e150");
    }

    #[test]
    fn test_text_truncated() {
        let long = "word ".repeat(40);
        let html = format!(r#"<a href="/x">{long}</a>"#);
        let elements = extract(&html);
        assert_eq!(elements[0].text.chars().count(), 80);
        assert!(elements[0].text.ends_with('\u{2026}'));
    }

    #[test]
    fn test_malformed_and_empty_input() {
        assert!(extract("").is_empty());
        assert!(extract("   \n ").is_empty());
        let elements = extract("<div><button>Unclosed<a href='/y'>link");
        assert_eq!(elements.len(), 2);
        assert!(elements.iter().all(|e| !e.xpath.is_empty()));
    }

    #[test]
    fn test_process_html_returns_summary() {
        let (elements, summary) = process_html(
            "<html><head><title>Shop</title></head><body><h1>Deals</h1><a href='/d'>Go</a></body></html>",
            ExtractionMode::AllFields,
        );
        assert_eq!(elements.len(), 1);
        assert!(summary.starts_with("Page Title: Shop"));

        let (elements, summary) = process_html("  ", ExtractionMode::AllFields);
        assert!(elements.is_empty());
        assert!(summary.is_empty());
    }
}
