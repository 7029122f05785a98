//! Progress Reporting
//!
//! The engine reports through two sinks: a transient status line and an
//! append-only log.

use colored::Colorize;

use crate::github::Label;

/// Destination for progress output
pub trait Reporter: Send + Sync {
    /// Replace the current status line
    fn set_status(&self, status: &str);

    /// Append a line to the log
    fn log(&self, line: &str);
}

/// Reporter writing to the terminal
///
/// Log lines go to stdout. Status lines are only shown when verbose, dimmed, on stderr.
#[derive(Debug, Clone, Default)]
pub struct ConsoleReporter {
    show_status: bool,
}

impl ConsoleReporter {
    pub fn new(show_status: bool) -> Self {
        Self { show_status }
    }
}

impl Reporter for ConsoleReporter {
    fn set_status(&self, status: &str) {
        if self.show_status {
            eprintln!("{} {}", "•".blue(), status.dimmed());
        }
    }

    fn log(&self, line: &str) {
        println!("{}", line);
    }
}

/// Comma-separated label names
pub fn label_names<'a, I>(labels: I) -> String
where
    I: IntoIterator<Item = &'a Label>,
{
    labels
        .into_iter()
        .map(|label| label.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// One line of the per-repository breakdown, e.g. `  2 to add     : bug, docs`
pub fn label_line(action: &str, labels: &[Label]) -> String {
    format!("{:>3} {:<9} : {}", labels.len(), action, label_names(labels))
}

/// Log line listing the labels read from a repository
pub fn labels_read_line(labels: &[Label]) -> String {
    format!("{:>2} labels   : {}", labels.len(), label_names(labels))
}
