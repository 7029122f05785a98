//! Account Resolution
//!
//! Organizations and users share a namespace. A name is looked up as an
//! organization first and as a user only when that fails.

use tracing::debug;

use crate::error::{Error, Result};
use crate::github::{Account, AccountKind, GitHub, Lookup, Repository};
use crate::report::Reporter;

/// Resolve a name to an organization or user
///
/// # Errors
/// - [`Error::AccountNotFound`] if neither lookup finds the account
/// - Any error from the user lookup
pub async fn resolve(github: &dyn GitHub, reporter: &dyn Reporter, name: &str) -> Result<Account> {
    reporter.set_status(&format!("Finding information for {name}..."));

    match github.get_organization(name).await {
        Ok(Lookup::Found(account)) => {
            reporter.log(&format!("Found {} {}", account.kind, account.login));
            return Ok(account);
        }
        Ok(Lookup::NotFound) => debug!(name, "no organization found, trying user"),
        Err(e) => debug!(name, error = %e, "organization lookup failed, trying user"),
    }

    match github.get_user(name).await? {
        Lookup::Found(account) => {
            reporter.log(&format!("Found {} {}", account.kind, account.login));
            Ok(account)
        }
        Lookup::NotFound => Err(Error::AccountNotFound(name.to_string())),
    }
}

/// List every repository owned by the account
pub async fn list_repositories(
    github: &dyn GitHub,
    reporter: &dyn Reporter,
    account: &Account,
) -> Result<Vec<Repository>> {
    reporter.set_status(&format!("Finding repositories for {}...", account.login));

    let repositories = match account.kind {
        AccountKind::Organization => github.list_repositories_for_organization(account).await?,
        AccountKind::User => github.list_repositories_for_user(account).await?,
    };

    let names = repositories
        .iter()
        .map(|r| r.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    reporter.log(&format!(
        "{} repositories for {}: {}",
        repositories.len(),
        account.login,
        names
    ));

    Ok(repositories)
}
