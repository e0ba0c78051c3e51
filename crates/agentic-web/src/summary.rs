//! Bounded, readable text digest of a page.
//!
//! Renders the main content region as lightweight Markdown (headings, list
//! items, paragraph breaks) and trims it to the configured character budget.

use std::sync::OnceLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::config::PerceptionConfig;
use crate::extract::parse_html;
use crate::selector::collapse_whitespace;

/// Subtrees that never contribute text.
const SKIP_TAGS: &[&str] = &[
    "script", "style", "noscript", "svg", "template", "head", "iframe", "object",
];

/// Tags rendered on their own line.
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "section", "article", "main", "header", "footer", "nav", "aside", "form",
    "table", "tr", "ul", "ol", "blockquote", "pre", "dl", "dt", "dd", "figure", "figcaption",
    "fieldset", "details", "summary", "dialog", "label",
];

/// Candidate content roots, most specific first.
const CONTENT_ROOTS: &[&str] = &["main", "article", r#"[role="main"]"#, "body"];

fn blank_lines_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n{3,}").expect("blank lines regex is valid"))
}

fn spaces_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r" {2,}").expect("spaces regex is valid"))
}

fn inline_ws_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("inline whitespace regex is valid"))
}

/// Produces page summaries under a character budget.
#[derive(Debug, Clone, Default)]
pub struct PageSummarizer {
    config: PerceptionConfig,
}

impl PageSummarizer {
    pub fn new(config: PerceptionConfig) -> Self {
        Self { config }
    }

    /// Summarize `html`. Returns an empty string for blank or unparseable input.
    pub fn summarize(&self, html: &str) -> String {
        if html.trim().is_empty() {
            return String::new();
        }
        let Some(document) = parse_html(html) else {
            return String::new();
        };

        let title = first_match(&document, "title")
            .map(|t| collapse_whitespace(&t.text().collect::<String>()))
            .unwrap_or_default();

        let root = CONTENT_ROOTS
            .iter()
            .find_map(|query| first_match(&document, query))
            .unwrap_or_else(|| document.root_element());

        let mut raw = String::new();
        self.render(root, &mut raw);

        let mut text = tidy(&raw);
        if !title.is_empty() {
            text = format!("Page Title: {title}\n\n{text}");
        }
        text.chars().take(self.config.max_content_chars).collect()
    }

    fn render(&self, el: ElementRef<'_>, out: &mut String) {
        let tag = el.value().name();
        if SKIP_TAGS.contains(&tag) || self.is_decoy(&el) {
            return;
        }

        if let Some(level) = heading_level(tag) {
            let text = collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "));
            if !text.is_empty() {
                out.push_str("\n\n");
                out.push_str(&"#".repeat(level));
                out.push(' ');
                out.push_str(&text);
                out.push_str("\n\n");
            }
            return;
        }

        match tag {
            "br" => out.push('\n'),
            "hr" => out.push_str("\n\n---\n\n"),
            "li" => {
                out.push_str("\n- ");
                self.render_children(el, out);
                out.push('\n');
            }
            "td" | "th" => {
                self.render_children(el, out);
                out.push_str(" | ");
            }
            _ if BLOCK_TAGS.contains(&tag) => {
                out.push('\n');
                self.render_children(el, out);
                out.push('\n');
            }
            _ => self.render_children(el, out),
        }
    }

    fn render_children(&self, el: ElementRef<'_>, out: &mut String) {
        for child in el.children() {
            if let Some(text) = child.value().as_text() {
                out.push_str(&inline_ws_re().replace_all(text, " "));
            } else if let Some(child_el) = ElementRef::wrap(child) {
                self.render(child_el, out);
            }
        }
    }

    fn is_decoy(&self, el: &ElementRef<'_>) -> bool {
        self.config
            .decoy_attributes
            .iter()
            .any(|attr| {
                el.value()
                    .attr(attr)
                    .is_some_and(|v| !v.trim().eq_ignore_ascii_case("false"))
            })
    }
}

/// Summarize with default limits except for the character budget.
pub fn summarize_page(html: &str, max_chars: usize) -> String {
    PageSummarizer::new(PerceptionConfig {
        max_content_chars: max_chars,
        ..PerceptionConfig::default()
    })
    .summarize(html)
}

fn first_match<'a>(document: &'a Html, query: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(query).ok()?;
    document.select(&selector).next()
}

fn heading_level(tag: &str) -> Option<usize> {
    match tag {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

fn tidy(raw: &str) -> String {
    let trimmed_lines = raw.lines().map(str::trim).collect::<Vec<_>>().join("\n");
    let collapsed = blank_lines_re().replace_all(&trimmed_lines, "\n\n");
    spaces_re().replace_all(&collapsed, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_and_headings() {
        let html = r#"
        <html><head><title> Acme  Store </title><style>body{}</style></head>
        <body>
            <nav><a href="/">Home</a></nav>
            <h1>Welcome</h1>
            <p>Great   deals
               today.</p>
            <ul><li>Shoes</li><li>Hats</li></ul>
            <script>var x = 1;</script>
        </body></html>
        "#;
        let summary = summarize_page(html, 12_000);
        assert!(summary.starts_with("Page Title: Acme Store\n\n"));
        assert!(summary.contains("# Welcome"));
        assert!(summary.contains("Great deals today."));
        assert!(summary.contains("- Shoes\n"));
        assert!(summary.contains("- Hats"));
        assert!(!summary.contains("var x"));
        assert!(!summary.contains("\n\n\n"));
    }

    #[test]
    fn test_prefers_main_content() {
        let html = r#"
        <body>
            <header>Site chrome</header>
            <main><h2>Article</h2><p>Body text</p></main>
            <footer>Footer links</footer>
        </body>
        "#;
        let summary = summarize_page(html, 12_000);
        assert!(summary.contains("## Article"));
        assert!(!summary.contains("Site chrome"));
        assert!(!summary.contains("Footer"));
    }

    #[test]
    fn test_decoy_text_excluded() {
        let html = r#"<body><p>Real</p><div data-decoy="1">Ignore me</div></body>"#;
        let summary = summarize_page(html, 12_000);
        assert_eq!(summary, "Real");
    }

    #[test]
    fn test_budget_respected() {
        let html = format!("<body><p>{}</p></body>", "é".repeat(500));
        let summary = summarize_page(&html, 100);
        assert_eq!(summary.chars().count(), 100);
    }

    #[test]
    fn test_blank_input() {
        assert_eq!(summarize_page("", 100), "");
        assert_eq!(summarize_page("  \n", 100), "");
    }
}
