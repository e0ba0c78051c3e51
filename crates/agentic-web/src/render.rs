//! Compact text rendering of extracted elements for the decision-maker.

use crate::types::{truncate, InteractiveElement};

/// Options shown per `<select>` before the list is cut.
const MAX_RENDERED_OPTIONS: usize = 8;

impl InteractiveElement {
    /// Single-line representation, e.g.
    /// `[e3] input type="email" name="email" [required] xpath="//input[@name="email"]"`.
    pub fn to_compact(&self) -> String {
        let mut parts = vec![format!("[{}]", self.eid), self.tag.clone()];
        let mut push = |key: &str, value: &str, max: Option<usize>| {
            if !value.is_empty() {
                let value = max.map_or_else(|| value.to_string(), |m| truncate(value, m));
                parts.push(format!("{key}=\"{value}\""));
            }
        };
        push("type", &self.input_type, None);
        push("name", &self.name, None);
        push("role", &self.role, None);
        push("placeholder", &self.placeholder, None);
        push("value", &self.value, Some(40));
        push("href", &self.href, Some(60));
        push("aria", &self.aria_label, Some(40));
        push("text", &self.text, Some(50));

        if !self.options.is_empty() {
            let shown: Vec<&str> = self
                .options
                .iter()
                .take(MAX_RENDERED_OPTIONS)
                .map(String::as_str)
                .collect();
            parts.push(format!("options=[{}]", shown.join(", ")));
        }
        if self.is_required {
            parts.push("[required]".to_string());
        }
        if self.is_hidden {
            parts.push("[hidden]".to_string());
        }
        if self.in_modal {
            parts.push("[modal]".to_string());
        }
        parts.push(format!("xpath=\"{}\"", self.xpath));
        parts.join(" ")
    }
}

/// Render the element list, visible elements first.
pub fn render_elements(elements: &[InteractiveElement]) -> String {
    if elements.is_empty() {
        return "No interactive elements found on the page.".to_string();
    }

    let (visible, hidden): (Vec<_>, Vec<_>) = elements.iter().partition(|e| !e.is_hidden);

    let mut lines = vec!["Interactive elements:".to_string()];
    lines.extend(visible.iter().map(|e| format!("  {}", e.to_compact())));

    if !hidden.is_empty() {
        lines.push(format!("\nHidden elements ({}):", hidden.len()));
        lines.extend(hidden.iter().map(|e| format!("  {}", e.to_compact())));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(eid: &str, tag: &str) -> InteractiveElement {
        InteractiveElement {
            eid: eid.to_string(),
            tag: tag.to_string(),
            xpath: format!("//{tag}"),
            ..Default::default()
        }
    }

    #[test]
    fn test_compact_line() {
        let mut e = element("e3", "select");
        e.name = "size".into();
        e.options = (1..=10).map(|i| i.to_string()).collect();
        e.is_required = true;
        e.in_modal = true;
        assert_eq!(
            e.to_compact(),
            r#"[e3] select name="size" options=[1, 2, 3, 4, 5, 6, 7, 8] [required] [modal] xpath="//select""#
        );
    }

    #[test]
    fn test_hidden_listed_last() {
        let mut hidden = element("e1", "input");
        hidden.is_hidden = true;
        let rendered = render_elements(&[hidden, element("e2", "button")]);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "Interactive elements:");
        assert!(lines[1].starts_with("  [e2] button"));
        assert_eq!(lines[3], "Hidden elements (1):");
        assert!(lines[4].starts_with("  [e1] input"));
    }

    #[test]
    fn test_empty_list() {
        assert_eq!(
            render_elements(&[]),
            "No interactive elements found on the page."
        );
    }
}
