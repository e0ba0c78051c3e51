//! Change detection between consecutive element snapshots.
//!
//! Elements are matched through an identity key built from tag, selector and
//! a differentiating attribute, never through `eid`, which is reassigned on
//! every extraction.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{truncate, InteractiveElement};

/// New elements listed before the rest are summarized.
const MAX_NEW_LISTED: usize = 10;

/// Removed elements listed before the rest are summarized.
const MAX_REMOVED_LISTED: usize = 5;

/// One element whose tracked state changed between snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedElement {
    pub element: InteractiveElement,
    pub changes: Vec<String>,
}

/// Added, removed and changed elements between two snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementDiff {
    /// In current-snapshot order.
    pub added: Vec<InteractiveElement>,
    /// In previous-snapshot order.
    pub removed: Vec<InteractiveElement>,
    /// In current-snapshot order.
    pub changed: Vec<ChangedElement>,
}

impl ElementDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }

    /// Human-readable report, empty when nothing changed.
    pub fn render(&self) -> String {
        if self.is_empty() {
            return String::new();
        }

        let mut lines = vec!["## Page Changes Since Last Step".to_string()];

        for e in self.added.iter().take(MAX_NEW_LISTED) {
            let mut desc = e.tag.clone();
            if !e.text.is_empty() {
                desc.push_str(&format!(" \"{}\"", truncate(&e.text, 30)));
            } else if !e.placeholder.is_empty() {
                desc.push_str(&format!(" placeholder=\"{}\"", e.placeholder));
            } else if !e.name.is_empty() {
                desc.push_str(&format!(" name=\"{}\"", e.name));
            }
            lines.push(format!("  + NEW [{}] {desc}", e.eid));
        }
        if self.added.len() > MAX_NEW_LISTED {
            lines.push(format!(
                "  + ... and {} more new elements",
                self.added.len() - MAX_NEW_LISTED
            ));
        }

        for e in self.removed.iter().take(MAX_REMOVED_LISTED) {
            let mut desc = e.tag.clone();
            if !e.text.is_empty() {
                desc.push_str(&format!(" \"{}\"", truncate(&e.text, 30)));
            } else if !e.name.is_empty() {
                desc.push_str(&format!(" name=\"{}\"", e.name));
            }
            lines.push(format!("  - REMOVED [{}] {desc}", e.eid));
        }
        if self.removed.len() > MAX_REMOVED_LISTED {
            lines.push(format!(
                "  - ... and {} more removed",
                self.removed.len() - MAX_REMOVED_LISTED
            ));
        }

        for changed in &self.changed {
            let e = &changed.element;
            let mut desc = e.tag.clone();
            if !e.name.is_empty() {
                desc.push_str(&format!(" name=\"{}\"", e.name));
            }
            lines.push(format!(
                "  ~ CHANGED [{}] {desc}: {}",
                e.eid,
                changed.changes.join("; ")
            ));
        }

        lines.join("\n")
    }
}

impl fmt::Display for ElementDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Identity of an element across snapshots.
pub fn identity_key(e: &InteractiveElement) -> String {
    let extra = [&e.name, &e.id, &e.placeholder]
        .into_iter()
        .find(|v| !v.is_empty())
        .cloned()
        .unwrap_or_else(|| e.text.chars().take(20).collect());
    format!("{}|{}|{extra}", e.tag, e.css_selector)
}

/// Compare two snapshots. An empty previous snapshot yields an empty diff.
pub fn diff_elements(prev: &[InteractiveElement], curr: &[InteractiveElement]) -> ElementDiff {
    if prev.is_empty() {
        return ElementDiff::default();
    }

    let prev_map = first_by_key(prev);
    let curr_map = first_by_key(curr);

    let mut diff = ElementDiff::default();
    let mut visited: HashSet<String> = HashSet::new();

    for e in curr {
        let key = identity_key(e);
        if !visited.insert(key.clone()) {
            continue;
        }
        match prev_map.get(&key) {
            None => diff.added.push(e.clone()),
            Some(before) => {
                let changes = describe_changes(before, e);
                if !changes.is_empty() {
                    diff.changed.push(ChangedElement {
                        element: e.clone(),
                        changes,
                    });
                }
            }
        }
    }

    let mut visited_prev: HashSet<String> = HashSet::new();
    for e in prev {
        let key = identity_key(e);
        if visited_prev.insert(key.clone()) && !curr_map.contains_key(&key) {
            diff.removed.push(e.clone());
        }
    }

    diff
}

/// Rendered diff report; empty when nothing changed.
pub fn compute_element_diff(prev: &[InteractiveElement], curr: &[InteractiveElement]) -> String {
    diff_elements(prev, curr).render()
}

fn first_by_key(elements: &[InteractiveElement]) -> HashMap<String, &InteractiveElement> {
    let mut map = HashMap::new();
    for e in elements {
        map.entry(identity_key(e)).or_insert(e);
    }
    map
}

fn describe_changes(before: &InteractiveElement, after: &InteractiveElement) -> Vec<String> {
    let mut changes = Vec::new();
    if before.value != after.value {
        changes.push(format!(
            "value: \"{}\" -> \"{}\"",
            truncate(&before.value, 20),
            truncate(&after.value, 20)
        ));
    }
    if before.text != after.text && before.tag != "a" {
        changes.push(format!(
            "text: \"{}\" -> \"{}\"",
            truncate(&before.text, 20),
            truncate(&after.text, 20)
        ));
    }
    if before.is_hidden != after.is_hidden {
        let now = if after.is_hidden { "hidden" } else { "visible" };
        changes.push(format!("visibility: {now}"));
    }
    changes
}
