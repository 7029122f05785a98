//! GitHub API Client
//!
//! The [`GitHub`] trait is the boundary between the synchronization engine and
//! the remote API. [`GitHubClient`] implements it on top of octocrab.

use async_trait::async_trait;
use octocrab::Octocrab;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// Base URL of the GitHub REST API
pub const GITHUB_API_URL: &str = "https://api.github.com";

/// Scope granting full access to public and private repositories
pub const REPO_SCOPE: &str = "repo";

/// Scope granting permission to delete repositories
pub const DELETE_REPO_SCOPE: &str = "delete_repo";

const USER_AGENT: &str = concat!("gh-label-sync/", env!("CARGO_PKG_VERSION"));

/// Encode a string for use in URL path segments (RFC 3986 with UTF-8 support)
///
/// Only unreserved characters (A-Z, a-z, 0-9, -, ., _, ~) are left unencoded.
fn encode_path_segment(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '-' | '.' | '_' | '~' => c.to_string(),
            _ => c
                .to_string()
                .bytes()
                .map(|b| format!("%{:02X}", b))
                .collect::<String>(),
        })
        .collect()
}

/// Split an `X-OAuth-Scopes` header value into scope names
fn parse_scopes(header: &str) -> Vec<String> {
    header
        .split(',')
        .map(str::trim)
        .filter(|scope| !scope.is_empty())
        .map(str::to_string)
        .collect()
}

/// Check if an octocrab error is a 404 Not Found
fn is_not_found_error(err: &octocrab::Error) -> bool {
    err.to_string().contains("Not Found")
}

/// Kind of GitHub account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountKind {
    Organization,
    User,
}

impl std::fmt::Display for AccountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccountKind::Organization => write!(f, "organization"),
            AccountKind::User => write!(f, "user"),
        }
    }
}

/// An organization or user whose repositories are synchronized
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account login
    pub login: String,

    /// Organization or user
    pub kind: AccountKind,
}

impl Account {
    /// Create an organization account
    pub fn organization<S: Into<String>>(login: S) -> Self {
        Self {
            login: login.into(),
            kind: AccountKind::Organization,
        }
    }

    /// Create a user account
    pub fn user<S: Into<String>>(login: S) -> Self {
        Self {
            login: login.into(),
            kind: AccountKind::User,
        }
    }
}

/// GitHub Repository Information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// Repository ID
    pub id: u64,

    /// Owner login
    pub owner: String,

    /// Repository name
    pub name: String,

    /// Whether the repository is archived (read-only)
    #[serde(default)]
    pub archived: bool,
}

/// GitHub Label Information
///
/// Matching between labels is case-insensitive on every field; see [`crate::diff`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    /// Label name
    pub name: String,

    /// Label description
    pub description: Option<String>,

    /// Label color (6-digit hexadecimal, without #)
    pub color: String,
}

impl Label {
    /// Create a new label
    pub fn new<N, D, C>(name: N, description: D, color: C) -> Self
    where
        N: Into<String>,
        D: Into<String>,
        C: Into<String>,
    {
        let description = description.into();
        Self {
            name: name.into(),
            description: (!description.is_empty()).then_some(description),
            color: color.into(),
        }
    }

    /// Description, with a missing description read as empty
    pub fn description_or_empty(&self) -> &str {
        self.description.as_deref().unwrap_or("")
    }
}

impl From<octocrab::models::Label> for Label {
    fn from(label: octocrab::models::Label) -> Self {
        Label {
            name: label.name,
            description: label.description,
            color: label.color,
        }
    }
}

/// Role of a user within an organization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipRole {
    Admin,
    Member,
}

/// Result of looking up an account that may not exist
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
}

/// Operations the synchronization engine needs from GitHub
///
/// Implementations must be `Send + Sync`.
#[async_trait]
pub trait GitHub: Send + Sync {
    /// Scopes granted to the credential in use
    async fn get_access(&self) -> Result<Vec<String>>;

    /// Look up an organization by name
    async fn get_organization(&self, name: &str) -> Result<Lookup<Account>>;

    /// Look up a user by name
    async fn get_user(&self, name: &str) -> Result<Lookup<Account>>;

    /// The user owning the credential
    async fn get_current_user(&self) -> Result<Account>;

    /// Role of `user` within `org`, `None` when the user is not a member
    async fn get_membership_role(&self, user: &str, org: &str) -> Result<Option<MembershipRole>>;

    async fn list_repositories_for_organization(&self, account: &Account)
        -> Result<Vec<Repository>>;

    async fn list_repositories_for_user(&self, account: &Account) -> Result<Vec<Repository>>;

    /// Create a private repository under the account
    async fn create_temp_repository(&self, account: &Account, name: &str) -> Result<Repository>;

    async fn delete_repository(&self, account: &Account, name: &str) -> Result<()>;

    async fn list_labels(&self, repository: &Repository) -> Result<Vec<Label>>;

    async fn create_label(&self, repository: &Repository, label: &Label) -> Result<()>;

    /// Update the label whose name matches `label.name` case-insensitively
    async fn update_label(&self, repository: &Repository, label: &Label) -> Result<()>;

    async fn delete_label(&self, repository: &Repository, name: &str) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct UserPayload {
    login: String,
}

#[derive(Debug, Deserialize)]
struct MembershipPayload {
    role: String,
    state: String,
}

#[derive(Debug, Deserialize)]
struct OwnerPayload {
    login: String,
}

#[derive(Debug, Deserialize)]
struct RepositoryPayload {
    id: u64,
    name: String,
    owner: OwnerPayload,
    #[serde(default)]
    archived: bool,
}

impl From<RepositoryPayload> for Repository {
    fn from(payload: RepositoryPayload) -> Self {
        Repository {
            id: payload.id,
            owner: payload.owner.login,
            name: payload.name,
            archived: payload.archived,
        }
    }
}

#[derive(Debug, Serialize)]
struct ListParams<'a> {
    per_page: u8,
    page: u32,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    kind: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    affiliation: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct NewRepository<'a> {
    name: &'a str,
    private: bool,
    description: &'a str,
}

#[derive(Debug, Serialize)]
struct LabelUpdate<'a> {
    new_name: &'a str,
    color: &'a str,
    description: &'a str,
}

/// Route of a single label; GitHub matches the name case-insensitively
fn label_route(repository: &Repository, name: &str) -> String {
    format!(
        "/repos/{}/{}/labels/{}",
        encode_path_segment(&repository.owner),
        encode_path_segment(&repository.name),
        encode_path_segment(name)
    )
}

/// GitHub API Client
///
/// octocrab-backed implementation of [`GitHub`]
pub struct GitHubClient {
    octocrab: Octocrab,
    http: reqwest::Client,
    access_token: String,
}

impl GitHubClient {
    /// Create a new GitHub client
    ///
    /// # Arguments
    /// - `access_token`: GitHub access token
    ///
    /// # Errors
    /// Returns an error if client initialization fails
    pub fn new(access_token: &str) -> Result<Self> {
        let octocrab = Octocrab::builder()
            .personal_token(access_token.to_string())
            .build()
            .map_err(Error::GitHubApi)?;

        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;

        Ok(Self {
            octocrab,
            http,
            access_token: access_token.to_string(),
        })
    }

    /// Fetch every page of a repository listing
    async fn get_all_repositories(
        &self,
        route: &str,
        kind: Option<&str>,
        affiliation: Option<&str>,
    ) -> Result<Vec<Repository>> {
        let mut repositories = Vec::new();
        let mut page = 1u32;

        loop {
            let params = ListParams {
                per_page: 100,
                page,
                kind,
                affiliation,
            };
            let items: Vec<RepositoryPayload> = self.octocrab.get(route, Some(&params)).await?;

            if items.is_empty() {
                break;
            }

            repositories.extend(items.into_iter().map(Repository::from));
            page += 1;
        }

        debug!(route, count = repositories.len(), "listed repositories");
        Ok(repositories)
    }
}

#[async_trait]
impl GitHub for GitHubClient {
    async fn get_access(&self) -> Result<Vec<String>> {
        // octocrab does not surface response headers, so read X-OAuth-Scopes directly
        let response = self
            .http
            .get(format!("{GITHUB_API_URL}/user"))
            .bearer_auth(&self.access_token)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::auth("API key is invalid or expired"));
        }
        let response = response.error_for_status()?;

        let scopes = parse_scopes(
            response
                .headers()
                .get("x-oauth-scopes")
                .and_then(|value| value.to_str().ok())
                .unwrap_or(""),
        );

        debug!(?scopes, "credential scopes");
        Ok(scopes)
    }

    async fn get_organization(&self, name: &str) -> Result<Lookup<Account>> {
        match self.octocrab.orgs(name).get().await {
            Ok(org) => Ok(Lookup::Found(Account::organization(org.login))),
            Err(e) if is_not_found_error(&e) => Ok(Lookup::NotFound),
            Err(e) => Err(Error::GitHubApi(e)),
        }
    }

    async fn get_user(&self, name: &str) -> Result<Lookup<Account>> {
        let route = format!("/users/{}", encode_path_segment(name));
        match self.octocrab.get::<UserPayload, _, ()>(route, None).await {
            Ok(user) => Ok(Lookup::Found(Account::user(user.login))),
            Err(e) if is_not_found_error(&e) => Ok(Lookup::NotFound),
            Err(e) => Err(Error::GitHubApi(e)),
        }
    }

    async fn get_current_user(&self) -> Result<Account> {
        let user = self.octocrab.current().user().await?;
        Ok(Account::user(user.login))
    }

    async fn get_membership_role(&self, user: &str, org: &str) -> Result<Option<MembershipRole>> {
        let route = format!(
            "/orgs/{}/memberships/{}",
            encode_path_segment(org),
            encode_path_segment(user)
        );

        let membership = match self.octocrab.get::<MembershipPayload, _, ()>(route, None).await {
            Ok(membership) => membership,
            Err(e) if is_not_found_error(&e) => return Ok(None),
            Err(e) => return Err(Error::GitHubApi(e)),
        };

        // Pending invitations grant nothing yet
        if membership.state != "active" {
            return Ok(None);
        }

        Ok(Some(match membership.role.as_str() {
            "admin" => MembershipRole::Admin,
            _ => MembershipRole::Member,
        }))
    }

    async fn list_repositories_for_organization(
        &self,
        account: &Account,
    ) -> Result<Vec<Repository>> {
        let route = format!("/orgs/{}/repos", encode_path_segment(&account.login));
        self.get_all_repositories(&route, Some("all"), None).await
    }

    async fn list_repositories_for_user(&self, _account: &Account) -> Result<Vec<Repository>> {
        // The target user is always the authenticated user, so private repositories are included
        self.get_all_repositories("/user/repos", None, Some("owner"))
            .await
    }

    async fn create_temp_repository(&self, account: &Account, name: &str) -> Result<Repository> {
        let route = match account.kind {
            AccountKind::Organization => {
                format!("/orgs/{}/repos", encode_path_segment(&account.login))
            }
            AccountKind::User => "/user/repos".to_string(),
        };
        let body = NewRepository {
            name,
            private: true,
            description: "Temporary repository created by gh-label-sync",
        };

        let payload: RepositoryPayload = self.octocrab.post(route, Some(&body)).await?;
        debug!(repository = name, "created temporary repository");
        Ok(payload.into())
    }

    async fn delete_repository(&self, account: &Account, name: &str) -> Result<()> {
        self.octocrab.repos(&account.login, name).delete().await?;
        debug!(repository = name, "deleted repository");
        Ok(())
    }

    async fn list_labels(&self, repository: &Repository) -> Result<Vec<Label>> {
        let mut labels = Vec::new();
        let mut page = 1u32;

        loop {
            let response = self
                .octocrab
                .issues(&repository.owner, &repository.name)
                .list_labels_for_repo()
                .page(page)
                .per_page(100)
                .send()
                .await?;

            if response.items.is_empty() {
                break;
            }

            labels.extend(response.items.into_iter().map(Label::from));
            page += 1;
        }

        Ok(labels)
    }

    async fn create_label(&self, repository: &Repository, label: &Label) -> Result<()> {
        self.octocrab
            .issues(&repository.owner, &repository.name)
            .create_label(&label.name, &label.color, label.description_or_empty())
            .await?;

        Ok(())
    }

    async fn update_label(&self, repository: &Repository, label: &Label) -> Result<()> {
        let route = label_route(repository, &label.name);
        let body = LabelUpdate {
            new_name: &label.name,
            color: &label.color,
            description: label.description_or_empty(),
        };

        let _: serde_json::Value = self.octocrab.patch(route, Some(&body)).await?;
        Ok(())
    }

    async fn delete_label(&self, repository: &Repository, name: &str) -> Result<()> {
        // URL encode the label name to handle spaces, special characters, and UTF-8
        let encoded_name = encode_path_segment(name);
        self.octocrab
            .issues(&repository.owner, &repository.name)
            .delete_label(&encoded_name)
            .await?;

        Ok(())
    }
}
