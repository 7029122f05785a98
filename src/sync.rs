//! Label Synchronization Functionality
//!
//! Drives a full run: validate access, resolve the account, read the
//! canonical labels, then bring each selected repository in line, one at a time.

use tracing::{debug, warn};

use crate::access::{validate_access, validate_user};
use crate::account;
use crate::canonical::CanonicalLabelExtractor;
use crate::config::{EffectivePermissions, SyncSettings};
use crate::diff::LabelDiff;
use crate::error::{Error, RepositoryFailure, Result};
use crate::github::{GitHub, Label, Repository};
use crate::report::{label_line, labels_read_line, Reporter};

/// Outcome of syncing one repository
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepositoryReport {
    /// Repository name
    pub name: String,

    /// Skipped because the repository is archived
    pub skipped_archived: bool,

    /// Labels already identical to the canonical set
    pub synchronized: usize,

    /// Labels created
    pub added: Vec<String>,

    /// Labels updated
    pub edited: Vec<String>,

    /// Labels deleted
    pub deleted: Vec<String>,

    /// Operations that failed
    pub failures: Vec<RepositoryFailure>,
}

impl RepositoryReport {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    fn add_failure(&mut self, message: String) {
        self.failures.push(RepositoryFailure {
            repository: self.name.clone(),
            message,
        });
    }

    /// Whether any label was changed
    pub fn has_changes(&self) -> bool {
        !(self.added.is_empty() && self.edited.is_empty() && self.deleted.is_empty())
    }
}

/// Outcome of a full run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncSummary {
    /// Number of canonical labels
    pub canonical_labels: usize,

    /// Per-repository outcomes, in sync order
    pub repositories: Vec<RepositoryReport>,
}

impl SyncSummary {
    pub fn added(&self) -> usize {
        self.repositories.iter().map(|r| r.added.len()).sum()
    }

    pub fn edited(&self) -> usize {
        self.repositories.iter().map(|r| r.edited.len()).sum()
    }

    pub fn deleted(&self) -> usize {
        self.repositories.iter().map(|r| r.deleted.len()).sum()
    }

    pub fn skipped(&self) -> usize {
        self.repositories.iter().filter(|r| r.skipped_archived).count()
    }

    /// Every failure across all repositories
    pub fn failures(&self) -> Vec<RepositoryFailure> {
        self.repositories
            .iter()
            .flat_map(|r| r.failures.iter().cloned())
            .collect()
    }
}

/// Label Synchronization Engine
///
/// Synchronizes the labels of every repository of an account with the
/// account's default labels
pub struct LabelSyncer {
    github: Box<dyn GitHub>,
    reporter: Box<dyn Reporter>,
}

impl LabelSyncer {
    /// Create a new label synchronization engine
    pub fn new(github: Box<dyn GitHub>, reporter: Box<dyn Reporter>) -> Self {
        Self { github, reporter }
    }

    /// Run a full synchronization
    ///
    /// Individual label operations that fail are recorded and the run
    /// continues with the remaining labels and repositories.
    ///
    /// # Errors
    /// - Access validation, account resolution, repository listing or
    ///   canonical label extraction failures abort the run before any
    ///   repository is touched
    /// - [`Error::SyncFailed`] listing every failed operation once all
    ///   repositories have been processed
    pub async fn run(&self, settings: &SyncSettings) -> Result<SyncSummary> {
        let github = self.github.as_ref();
        let reporter = self.reporter.as_ref();

        reporter.set_status("Starting...");
        reporter.log(&settings.account_name);

        validate_access(github).await?;
        let account = account::resolve(github, reporter, &settings.account_name).await?;
        validate_user(github, &account).await?;

        let repositories = account::list_repositories(github, reporter, &account).await?;
        let canonical = CanonicalLabelExtractor::new(github, reporter, &settings.probe)
            .extract(&account)
            .await?;
        reporter.log("");

        let worklist = settings.filter.select(&repositories);
        debug!(
            total = repositories.len(),
            selected = worklist.len(),
            "built repository worklist"
        );
        if worklist.is_empty() {
            reporter.log("(no repositories to sync)");
        }

        let mut summary = SyncSummary {
            canonical_labels: canonical.len(),
            repositories: Vec::with_capacity(worklist.len()),
        };
        for repository in worklist {
            let report = self
                .sync_repository(repository, &canonical, settings.permissions)
                .await;
            summary.repositories.push(report);
        }

        reporter.log("Done!");

        let failures = summary.failures();
        if failures.is_empty() {
            Ok(summary)
        } else {
            Err(Error::SyncFailed { failures })
        }
    }

    /// Bring one repository in line with the canonical labels
    ///
    /// Actions run in order: add, edit, delete.
    pub async fn sync_repository(
        &self,
        repository: &Repository,
        canonical: &[Label],
        permissions: EffectivePermissions,
    ) -> RepositoryReport {
        let reporter = self.reporter.as_ref();
        let mut report = RepositoryReport::new(&repository.name);
        reporter.log(&repository.name);

        if repository.archived {
            reporter.log("(skipping: repo is archived)");
            report.skipped_archived = true;
        } else {
            self.apply_diff(repository, canonical, permissions, &mut report)
                .await;
        }

        reporter.log("");
        report
    }

    async fn apply_diff(
        &self,
        repository: &Repository,
        canonical: &[Label],
        permissions: EffectivePermissions,
        report: &mut RepositoryReport,
    ) {
        let reporter = self.reporter.as_ref();

        reporter.set_status(&format!("Finding labels for {}...", repository.name));
        let current = match self.github.list_labels(repository).await {
            Ok(labels) => labels,
            Err(e) => {
                warn!(repository = %repository.name, error = %e, "failed to list labels");
                report.add_failure(format!("listing labels: {e}"));
                return;
            }
        };

        reporter.log(&labels_read_line(&current));

        reporter.set_status(&format!("Comparing labels in {}...", repository.name));
        let diff = LabelDiff::compute(canonical, &current);
        report.synchronized = diff.synchronized.len();

        reporter.log(&label_line("sync'd", &diff.synchronized));
        reporter.log(&label_line("to add", &diff.to_add));
        reporter.log(&label_line("to edit", &diff.to_edit));
        reporter.log(&label_line("to delete", &diff.to_delete));

        if permissions.add {
            for label in &diff.to_add {
                reporter.set_status(&format!("Adding {} to {}...", label.name, repository.name));
                match self.github.create_label(repository, label).await {
                    Ok(()) => {
                        reporter.log(&format!("Added {}", label.name));
                        report.added.push(label.name.clone());
                    }
                    Err(e) => report.add_failure(format!("adding {}: {e}", label.name)),
                }
            }
        }

        if permissions.edit {
            for label in &diff.to_edit {
                reporter.set_status(&format!("Editing {} in {}...", label.name, repository.name));
                match self.github.update_label(repository, label).await {
                    Ok(()) => {
                        reporter.log(&format!("Edited {}", label.name));
                        report.edited.push(label.name.clone());
                    }
                    Err(e) => report.add_failure(format!("editing {}: {e}", label.name)),
                }
            }
        }

        if permissions.delete {
            for label in &diff.to_delete {
                reporter.set_status(&format!(
                    "Deleting {} from {}...",
                    label.name, repository.name
                ));
                match self.github.delete_label(repository, &label.name).await {
                    Ok(()) => {
                        reporter.log(&format!("Deleted {}", label.name));
                        report.deleted.push(label.name.clone());
                    }
                    Err(e) => report.add_failure(format!("deleting {}: {e}", label.name)),
                }
            }
        }
    }
}
