//! Canonical Label Extraction
//!
//! GitHub seeds every new repository with the account's default labels. The
//! canonical set is read from a throwaway private repository which is then
//! deleted. Seeding happens asynchronously, so the labels are re-read until two
//! consecutive reads agree on the count.

use chrono::{DateTime, Local};
use tracing::{debug, warn};

use crate::config::ProbeSettings;
use crate::error::{Error, Result};
use crate::github::{Account, GitHub, Label, Repository};
use crate::report::{labels_read_line, Reporter};

/// Prefix of every probe repository name
pub const TEMP_REPOSITORY_PREFIX: &str = "temp-label-sync-";

/// Probe repository name for a point in time, e.g. `temp-label-sync-20240131-174502123`
pub fn temp_repository_name(now: DateTime<Local>) -> String {
    format!("{TEMP_REPOSITORY_PREFIX}{}", now.format("%Y%m%d-%H%M%S%3f"))
}

/// Reads an account's default labels through a probe repository
pub struct CanonicalLabelExtractor<'a> {
    github: &'a dyn GitHub,
    reporter: &'a dyn Reporter,
    probe: &'a ProbeSettings,
}

impl<'a> CanonicalLabelExtractor<'a> {
    pub fn new(github: &'a dyn GitHub, reporter: &'a dyn Reporter, probe: &'a ProbeSettings) -> Self {
        Self {
            github,
            reporter,
            probe,
        }
    }

    /// Extract the account's canonical labels
    ///
    /// The probe repository is deleted whether or not polling succeeds.
    ///
    /// # Errors
    /// - [`Error::ProbeExhausted`] if the labels do not settle within the configured reads
    /// - Any error creating, reading or deleting the probe repository
    pub async fn extract(&self, account: &Account) -> Result<Vec<Label>> {
        self.reporter
            .set_status(&format!("Finding labels for {}...", account.login));

        let name = temp_repository_name(Local::now());
        self.reporter
            .set_status(&format!("Creating temp repository {name}..."));
        let repository = self.github.create_temp_repository(account, &name).await?;
        self.reporter.log(&format!("Created temp repository {name}"));

        let labels = self.poll_until_settled(&repository).await;
        let deleted = self.delete_probe(account, &name).await;

        match (labels, deleted) {
            (Ok(labels), Ok(())) => {
                self.reporter.log(&labels_read_line(&labels));
                Ok(labels)
            }
            (Ok(_), Err(e)) => Err(e),
            (Err(e), deleted) => {
                if let Err(cleanup) = deleted {
                    warn!(repository = %name, error = %cleanup, "failed to delete probe repository");
                }
                Err(e)
            }
        }
    }

    /// Re-read labels until two consecutive reads have the same count
    async fn poll_until_settled(&self, repository: &Repository) -> Result<Vec<Label>> {
        self.reporter
            .set_status(&format!("Finding labels for {}...", repository.name));

        let mut previous = self.github.list_labels(repository).await?;
        let mut latest = self.github.list_labels(repository).await?;
        let mut attempts = 2u32;

        while previous.len() != latest.len() {
            if attempts >= self.probe.max_attempts {
                return Err(Error::ProbeExhausted {
                    repository: repository.name.clone(),
                    attempts,
                });
            }

            let delay = self.probe.delay_for(attempts - 2);
            debug!(
                previous = previous.len(),
                latest = latest.len(),
                ?delay,
                "probe labels still settling"
            );
            tokio::time::sleep(delay).await;

            previous = latest;
            latest = self.github.list_labels(repository).await?;
            attempts += 1;
        }

        Ok(latest)
    }

    async fn delete_probe(&self, account: &Account, name: &str) -> Result<()> {
        self.reporter
            .set_status(&format!("Deleting temp repository {name}..."));
        self.github.delete_repository(account, name).await?;
        self.reporter.log(&format!("Deleted temp repository {name}"));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::TimeZone;

    use super::*;
    use crate::mock::{FailOn, MockGitHub, MockOperation, RecordingReporter};

    fn fast_probe(max_attempts: u32) -> ProbeSettings {
        ProbeSettings {
            max_attempts,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    fn labels(count: usize) -> Vec<Label> {
        (0..count)
            .map(|i| Label::new(format!("label{i}"), "", "ffffff"))
            .collect()
    }

    fn created_and_deleted(github: &MockGitHub) -> (Vec<String>, Vec<String>) {
        let mut created = Vec::new();
        let mut deleted = Vec::new();
        for op in github.operations() {
            match op {
                MockOperation::CreateRepository { name } => created.push(name),
                MockOperation::DeleteRepository { name } => deleted.push(name),
                _ => {}
            }
        }
        (created, deleted)
    }

    #[test]
    fn test_temp_repository_name_format() {
        let now = Local.with_ymd_and_hms(2024, 1, 31, 17, 45, 2).unwrap();
        assert_eq!(temp_repository_name(now), "temp-label-sync-20240131-174502000");
    }

    #[tokio::test]
    async fn test_creates_and_deletes_temp_repository_for_organization() {
        let github = MockGitHub::new();
        github.set_probe_reads(vec![labels(3)]);
        let reporter = RecordingReporter::new();
        let probe = fast_probe(10);

        let extractor = CanonicalLabelExtractor::new(&github, &reporter, &probe);
        let result = extractor
            .extract(&Account::organization("acme"))
            .await
            .unwrap();

        assert_eq!(result.len(), 3);
        let (created, deleted) = created_and_deleted(&github);
        assert_eq!(created.len(), 1);
        assert!(created[0].starts_with("temp-label-sync-20"));
        assert_eq!(deleted, created);
        assert!(reporter.contains_line("Deleted temp repository temp-label-sync-"));
    }

    #[tokio::test]
    async fn test_creates_and_deletes_temp_repository_for_user() {
        let github = MockGitHub::new();
        github.set_probe_reads(vec![labels(1)]);
        let reporter = RecordingReporter::new();
        let probe = fast_probe(10);

        CanonicalLabelExtractor::new(&github, &reporter, &probe)
            .extract(&Account::user("octocat"))
            .await
            .unwrap();

        let (created, deleted) = created_and_deleted(&github);
        assert!(created[0].starts_with(TEMP_REPOSITORY_PREFIX));
        assert_eq!(deleted, created);
    }

    #[tokio::test]
    async fn test_waits_until_all_labels_have_been_created() {
        let github = MockGitHub::new();
        github.set_probe_reads(vec![labels(1), labels(2), labels(3), labels(3)]);
        let reporter = RecordingReporter::new();
        let probe = fast_probe(10);

        let result = CanonicalLabelExtractor::new(&github, &reporter, &probe)
            .extract(&Account::organization("acme"))
            .await
            .unwrap();

        assert_eq!(result.len(), 3);
        let reads = github
            .operations()
            .iter()
            .filter(|op| matches!(op, MockOperation::ListLabels { .. }))
            .count();
        assert_eq!(reads, 4);
    }

    #[tokio::test]
    async fn test_exhausted_polling_is_retryable_and_still_deletes_probe() {
        let github = MockGitHub::new();
        github.set_probe_reads((1..=10).map(labels).collect());
        let reporter = RecordingReporter::new();
        let probe = fast_probe(4);

        let err = CanonicalLabelExtractor::new(&github, &reporter, &probe)
            .extract(&Account::organization("acme"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ProbeExhausted { attempts: 4, .. }));
        assert!(err.is_retryable());
        let (created, deleted) = created_and_deleted(&github);
        assert_eq!(deleted, created);
    }

    #[tokio::test]
    async fn test_delete_failure_is_surfaced() {
        let github = MockGitHub::new();
        github.set_probe_reads(vec![labels(2)]);
        github.fail_on(FailOn::DeleteRepository);
        let reporter = RecordingReporter::new();
        let probe = fast_probe(10);

        let result = CanonicalLabelExtractor::new(&github, &reporter, &probe)
            .extract(&Account::organization("acme"))
            .await;

        assert!(result.is_err());
        assert!(!matches!(result, Err(Error::ProbeExhausted { .. })));
    }
}
