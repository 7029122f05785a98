//! In-memory GitHub for tests
//!
//! Stores accounts, repositories and labels in memory, records every mutating
//! call, and can be told to fail specific operations.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::github::{Account, GitHub, Label, Lookup, MembershipRole, Repository};
use crate::report::Reporter;

/// Operation to fail
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FailOn {
    GetOrganization,
    GetUser,
    ListLabels(String),
    CreateLabel(String),
    UpdateLabel(String),
    DeleteLabel(String),
    DeleteRepository,
}

/// Recorded call for verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    CreateRepository { name: String },
    DeleteRepository { name: String },
    ListLabels { repository: String },
    CreateLabel { repository: String, name: String },
    UpdateLabel { repository: String, name: String },
    DeleteLabel { repository: String, name: String },
}

#[derive(Debug, Default)]
struct MockGitHubInner {
    scopes: Vec<String>,
    organizations: Vec<String>,
    users: Vec<String>,
    current_user: String,
    roles: HashMap<(String, String), MembershipRole>,
    repositories: Vec<Repository>,
    labels: HashMap<String, Vec<Label>>,
    temp_repositories: HashSet<String>,
    probe_reads: VecDeque<Vec<Label>>,
    fail_on: HashSet<FailOn>,
    operations: Vec<MockOperation>,
    next_id: u64,
}

/// Mock GitHub; clones share state
#[derive(Debug, Clone, Default)]
pub struct MockGitHub {
    inner: Arc<Mutex<MockGitHubInner>>,
}

fn injected(operation: &str) -> Error {
    Error::Io(std::io::Error::other(format!("injected {operation} failure")))
}

impl MockGitHub {
    pub fn new() -> Self {
        let mock = Self::default();
        mock.set_scopes(&["repo", "delete_repo"]);
        mock
    }

    fn with<T>(&self, f: impl FnOnce(&mut MockGitHubInner) -> T) -> T {
        let mut inner = self.inner.lock().unwrap();
        f(&mut inner)
    }

    pub fn set_scopes(&self, scopes: &[&str]) {
        self.with(|i| i.scopes = scopes.iter().map(|s| s.to_string()).collect());
    }

    pub fn add_organization(&self, login: &str) {
        self.with(|i| i.organizations.push(login.to_string()));
    }

    pub fn add_user(&self, login: &str) {
        self.with(|i| i.users.push(login.to_string()));
    }

    pub fn set_current_user(&self, login: &str) {
        self.with(|i| i.current_user = login.to_string());
    }

    pub fn set_role(&self, user: &str, org: &str, role: MembershipRole) {
        self.with(|i| {
            i.roles.insert((user.to_string(), org.to_string()), role);
        });
    }

    /// Add a repository with its current labels
    pub fn add_repository(&self, owner: &str, name: &str, archived: bool, labels: Vec<Label>) {
        self.with(|i| {
            i.next_id += 1;
            i.repositories.push(Repository {
                id: i.next_id,
                owner: owner.to_string(),
                name: name.to_string(),
                archived,
            });
            i.labels.insert(name.to_string(), labels);
        });
    }

    /// Successive label reads returned for newly created probe repositories
    ///
    /// The last read repeats once the queue is down to one entry.
    pub fn set_probe_reads(&self, reads: Vec<Vec<Label>>) {
        self.with(|i| i.probe_reads = reads.into());
    }

    pub fn fail_on(&self, failure: FailOn) {
        self.with(|i| {
            i.fail_on.insert(failure);
        });
    }

    pub fn operations(&self) -> Vec<MockOperation> {
        self.with(|i| i.operations.clone())
    }

    pub fn labels(&self, repository: &str) -> Vec<Label> {
        self.with(|i| i.labels.get(repository).cloned().unwrap_or_default())
    }

    /// Number of recorded label mutations
    pub fn label_mutations(&self) -> usize {
        self.operations()
            .iter()
            .filter(|op| {
                matches!(
                    op,
                    MockOperation::CreateLabel { .. }
                        | MockOperation::UpdateLabel { .. }
                        | MockOperation::DeleteLabel { .. }
                )
            })
            .count()
    }

    fn check(&self, failure: FailOn, operation: &str) -> Result<()> {
        if self.with(|i| i.fail_on.contains(&failure)) {
            Err(injected(operation))
        } else {
            Ok(())
        }
    }

    fn record(&self, operation: MockOperation) {
        self.with(|i| i.operations.push(operation));
    }
}

#[async_trait]
impl GitHub for MockGitHub {
    async fn get_access(&self) -> Result<Vec<String>> {
        Ok(self.with(|i| i.scopes.clone()))
    }

    async fn get_organization(&self, name: &str) -> Result<Lookup<Account>> {
        self.check(FailOn::GetOrganization, "get_organization")?;
        Ok(self.with(|i| {
            i.organizations
                .iter()
                .find(|o| o.eq_ignore_ascii_case(name))
                .map_or(Lookup::NotFound, |o| Lookup::Found(Account::organization(o)))
        }))
    }

    async fn get_user(&self, name: &str) -> Result<Lookup<Account>> {
        self.check(FailOn::GetUser, "get_user")?;
        Ok(self.with(|i| {
            i.users
                .iter()
                .find(|u| u.eq_ignore_ascii_case(name))
                .map_or(Lookup::NotFound, |u| Lookup::Found(Account::user(u)))
        }))
    }

    async fn get_current_user(&self) -> Result<Account> {
        Ok(Account::user(self.with(|i| i.current_user.clone())))
    }

    async fn get_membership_role(&self, user: &str, org: &str) -> Result<Option<MembershipRole>> {
        Ok(self.with(|i| i.roles.get(&(user.to_string(), org.to_string())).copied()))
    }

    async fn list_repositories_for_organization(
        &self,
        account: &Account,
    ) -> Result<Vec<Repository>> {
        Ok(self.with(|i| {
            i.repositories
                .iter()
                .filter(|r| r.owner.eq_ignore_ascii_case(&account.login))
                .cloned()
                .collect()
        }))
    }

    async fn list_repositories_for_user(&self, account: &Account) -> Result<Vec<Repository>> {
        self.list_repositories_for_organization(account).await
    }

    async fn create_temp_repository(&self, account: &Account, name: &str) -> Result<Repository> {
        self.record(MockOperation::CreateRepository {
            name: name.to_string(),
        });
        Ok(self.with(|i| {
            i.next_id += 1;
            i.temp_repositories.insert(name.to_string());
            Repository {
                id: i.next_id,
                owner: account.login.clone(),
                name: name.to_string(),
                archived: false,
            }
        }))
    }

    async fn delete_repository(&self, _account: &Account, name: &str) -> Result<()> {
        self.record(MockOperation::DeleteRepository {
            name: name.to_string(),
        });
        self.check(FailOn::DeleteRepository, "delete_repository")?;
        self.with(|i| {
            i.temp_repositories.remove(name);
            i.repositories.retain(|r| r.name != name);
            i.labels.remove(name);
        });
        Ok(())
    }

    async fn list_labels(&self, repository: &Repository) -> Result<Vec<Label>> {
        self.record(MockOperation::ListLabels {
            repository: repository.name.clone(),
        });
        self.check(FailOn::ListLabels(repository.name.clone()), "list_labels")?;
        Ok(self.with(|i| {
            if i.temp_repositories.contains(&repository.name) {
                if i.probe_reads.len() > 1 {
                    i.probe_reads.pop_front().unwrap_or_default()
                } else {
                    i.probe_reads.front().cloned().unwrap_or_default()
                }
            } else {
                i.labels.get(&repository.name).cloned().unwrap_or_default()
            }
        }))
    }

    async fn create_label(&self, repository: &Repository, label: &Label) -> Result<()> {
        self.record(MockOperation::CreateLabel {
            repository: repository.name.clone(),
            name: label.name.clone(),
        });
        self.check(FailOn::CreateLabel(label.name.clone()), "create_label")?;
        self.with(|i| {
            i.labels
                .entry(repository.name.clone())
                .or_default()
                .push(label.clone())
        });
        Ok(())
    }

    async fn update_label(&self, repository: &Repository, label: &Label) -> Result<()> {
        self.record(MockOperation::UpdateLabel {
            repository: repository.name.clone(),
            name: label.name.clone(),
        });
        self.check(FailOn::UpdateLabel(label.name.clone()), "update_label")?;
        self.with(|i| {
            if let Some(existing) = i
                .labels
                .entry(repository.name.clone())
                .or_default()
                .iter_mut()
                .find(|l| l.name.to_lowercase() == label.name.to_lowercase())
            {
                *existing = label.clone();
            }
        });
        Ok(())
    }

    async fn delete_label(&self, repository: &Repository, name: &str) -> Result<()> {
        self.record(MockOperation::DeleteLabel {
            repository: repository.name.clone(),
            name: name.to_string(),
        });
        self.check(FailOn::DeleteLabel(name.to_string()), "delete_label")?;
        self.with(|i| {
            if let Some(labels) = i.labels.get_mut(&repository.name) {
                labels.retain(|l| l.name != name);
            }
        });
        Ok(())
    }
}

/// Reporter capturing everything for assertions
#[derive(Debug, Clone, Default)]
pub struct RecordingReporter {
    statuses: Arc<Mutex<Vec<String>>>,
    lines: Arc<Mutex<Vec<String>>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn statuses(&self) -> Vec<String> {
        self.statuses.lock().unwrap().clone()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    pub fn contains_line(&self, needle: &str) -> bool {
        self.lines().iter().any(|line| line.contains(needle))
    }
}

impl Reporter for RecordingReporter {
    fn set_status(&self, status: &str) {
        self.statuses.lock().unwrap().push(status.to_string());
    }

    fn log(&self, line: &str) {
        self.lines.lock().unwrap().push(line.to_string());
    }
}
