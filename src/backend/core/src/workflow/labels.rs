//! Group labels encoded in workflow descriptions.
//!
//! A description such as `"Provision a site - Billing, Network"` labels the
//! workflow with `Billing` and `Network`. This is a heuristic over free text:
//! any description with a `-` followed by a capitalised word yields labels,
//! and everything after the first `-` is treated as the label list.

use regex::Regex;
use std::sync::OnceLock;

use super::WorkflowDef;

static LABEL_MARKER: OnceLock<Regex> = OnceLock::new();

fn label_marker() -> &'static Regex {
    LABEL_MARKER.get_or_init(|| Regex::new(r"-,? [A-Z]").expect("label marker pattern is valid"))
}

/// Labels listed in a description, whitespace removed, in order.
pub fn labels_of(description: &str) -> Vec<String> {
    if !label_marker().is_match(description) {
        return Vec::new();
    }
    let Some(dash) = description.find('-') else {
        return Vec::new();
    };
    description[dash + 1..]
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .split(',')
        .map(str::to_string)
        .collect()
}

/// Whether any label of the workflow matches any group, ignoring case.
pub fn is_labeled_with_group<S: AsRef<str>>(workflow: &WorkflowDef, groups: &[S]) -> bool {
    let groups: Vec<String> = groups.iter().map(|g| g.as_ref().to_lowercase()).collect();
    workflow
        .labels()
        .iter()
        .any(|label| groups.contains(&label.to_lowercase()))
}
