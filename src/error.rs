//! Error Handling
//!
//! Error type definitions used in gh-label-sync

use std::fmt;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// A failure recorded while syncing a single repository
#[derive(Debug, Clone, PartialEq)]
pub struct RepositoryFailure {
    /// Repository name
    pub repository: String,

    /// Human-readable failure reason
    pub message: String,
}

impl fmt::Display for RepositoryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.repository, self.message)
    }
}

/// Error types for gh-label-sync
#[derive(Error, Debug)]
pub enum Error {
    /// Credential scope, identity or role check failed
    #[error("{0}")]
    Auth(String),

    /// Neither an organization nor a user exists with this name
    #[error("Could not find an organization or user named {0}")]
    AccountNotFound(String),

    /// The probe repository's labels never settled
    #[error(
        "Labels in probe repository {repository} did not settle after {attempts} reads; try again"
    )]
    ProbeExhausted { repository: String, attempts: u32 },

    #[error("GitHub API error: {0}")]
    GitHubApi(#[from] octocrab::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid repository filter '{pattern}': {source}")]
    InvalidFilter {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Configuration validation error: {0}")]
    ConfigValidation(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// One or more repositories could not be fully synced
    #[error("{} repository operation(s) failed:\n{}", .failures.len(), list_failures(.failures))]
    SyncFailed { failures: Vec<RepositoryFailure> },
}

impl Error {
    /// Create a new authorization error
    pub fn auth<S: Into<String>>(message: S) -> Self {
        Error::Auth(message.into())
    }

    /// Create a new configuration validation error
    pub fn config_validation<S: Into<String>>(message: S) -> Self {
        Error::ConfigValidation(message.into())
    }

    /// Whether rerunning the same command may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::ProbeExhausted { .. })
    }
}

fn list_failures(failures: &[RepositoryFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("  {f}"))
        .collect::<Vec<_>>()
        .join("\n")
}
