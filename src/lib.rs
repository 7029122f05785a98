//! # gh-label-sync
//!
//! Synchronizes issue labels across every repository owned by a GitHub
//! organization or user, using the account's default labels as the source of truth
//!
//! ## Features
//! - Canonical labels read from the account's default label template
//! - Add, edit and delete actions that can be individually disabled
//! - Dry-run mode
//! - Repository name filters (regular expressions)
//! - Archived repositories are skipped

pub mod access;
pub mod account;
pub mod canonical;
pub mod config;
pub mod diff;
pub mod error;
pub mod github;
pub mod report;
pub mod sync;

#[cfg(test)]
mod mock;

pub use config::{EffectivePermissions, RepositoryFilter, SyncFlags, SyncSettings};
pub use diff::LabelDiff;
pub use error::{Error, Result};
pub use github::{Account, AccountKind, GitHub, GitHubClient, Label, Repository};
pub use report::{ConsoleReporter, Reporter};
pub use sync::{LabelSyncer, SyncSummary};

/// Synchronize every repository of an account against its default labels
///
/// # Examples
///
/// ```rust,no_run
/// use gh_label_sync::{ConsoleReporter, SyncFlags, SyncSettings};
///
/// #[tokio::main]
/// async fn main() -> gh_label_sync::Result<()> {
///     let settings = SyncSettings::new(
///         "my-org",
///         "your_github_token",
///         &["^service-"],
///         SyncFlags { dry_run: true, ..SyncFlags::default() },
///     )?;
///
///     let summary = gh_label_sync::sync_account_labels(&settings, ConsoleReporter::new(false)).await?;
///     println!("Synced {} repositories", summary.repositories.len());
///     Ok(())
/// }
/// ```
pub async fn sync_account_labels<R>(settings: &SyncSettings, reporter: R) -> Result<SyncSummary>
where
    R: Reporter + 'static,
{
    settings.validate()?;

    let client = GitHubClient::new(&settings.access_token)?;
    let syncer = LabelSyncer::new(Box::new(client), Box::new(reporter));
    syncer.run(settings).await
}
