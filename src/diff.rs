//! Label Differ
//!
//! Computes which labels to add, edit and delete so a repository's labels
//! match the canonical set. Pure; every comparison is case-insensitive and a
//! missing description compares equal to an empty one.
//!
//! A desired label is only added when neither its name nor its description
//! matches any current label, and a current label is only deleted when neither
//! its name nor its description matches any desired label. A label that was
//! renamed but kept its description is therefore left alone rather than
//! duplicated.

use crate::github::Label;

/// Actions required to bring a repository in line with the canonical labels
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelDiff {
    /// Desired labels missing from the repository
    pub to_add: Vec<Label>,

    /// Desired labels whose repository counterpart differs in description or color
    pub to_edit: Vec<Label>,

    /// Repository labels with no desired counterpart
    pub to_delete: Vec<Label>,

    /// Desired labels already identical in the repository (reporting only)
    pub synchronized: Vec<Label>,
}

impl LabelDiff {
    /// Compare the desired labels against a repository's current labels
    pub fn compute(desired: &[Label], current: &[Label]) -> Self {
        let synchronized = desired
            .iter()
            .filter(|d| current.iter().any(|c| is_synchronized(d, c)))
            .cloned()
            .collect();

        let to_add = desired
            .iter()
            .filter(|d| current.iter().all(|c| !collides(d, c)))
            .cloned()
            .collect();

        let to_edit = desired
            .iter()
            .filter(|d| current.iter().any(|c| needs_update(d, c)))
            .cloned()
            .collect();

        let to_delete = current
            .iter()
            .filter(|c| desired.iter().all(|d| !collides(c, d)))
            .cloned()
            .collect();

        Self {
            to_add,
            to_edit,
            to_delete,
            synchronized,
        }
    }

    /// Whether any action is required
    pub fn has_changes(&self) -> bool {
        !(self.to_add.is_empty() && self.to_edit.is_empty() && self.to_delete.is_empty())
    }
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

fn same_name(a: &Label, b: &Label) -> bool {
    eq_ignore_case(&a.name, &b.name)
}

fn same_description(a: &Label, b: &Label) -> bool {
    eq_ignore_case(a.description_or_empty(), b.description_or_empty())
}

fn same_color(a: &Label, b: &Label) -> bool {
    eq_ignore_case(&a.color, &b.color)
}

/// Name or description match
fn collides(a: &Label, b: &Label) -> bool {
    same_name(a, b) || same_description(a, b)
}

fn is_synchronized(desired: &Label, current: &Label) -> bool {
    same_name(desired, current) && same_description(desired, current) && same_color(desired, current)
}

fn needs_update(desired: &Label, current: &Label) -> bool {
    same_name(desired, current)
        && (!same_description(desired, current) || !same_color(desired, current))
}
