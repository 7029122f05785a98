//! Access Validation
//!
//! Both checks must pass before anything is changed. Failures are fatal.

use tracing::debug;

use crate::error::{Error, Result};
use crate::github::{Account, AccountKind, GitHub, MembershipRole, DELETE_REPO_SCOPE, REPO_SCOPE};

/// Check that the credential can write to and delete repositories
///
/// # Errors
/// Returns [`Error::Auth`] naming the missing scope; `repo` is reported first
/// when both are missing.
pub async fn validate_access(github: &dyn GitHub) -> Result<()> {
    let scopes = github.get_access().await?;
    let has = |scope: &str| scopes.iter().any(|s| s == scope);

    if !has(REPO_SCOPE) {
        return Err(Error::auth(format!(
            "API key does not have `{REPO_SCOPE}` access"
        )));
    }

    if !has(DELETE_REPO_SCOPE) {
        return Err(Error::auth(format!(
            "API key does not have `{DELETE_REPO_SCOPE}` access"
        )));
    }

    Ok(())
}

/// Check that the credential's owner may modify the target account
///
/// A user may only sync their own account; an organization requires the
/// caller to be one of its administrators.
///
/// # Errors
/// Returns [`Error::Auth`] on identity mismatch or a missing admin role
pub async fn validate_user(github: &dyn GitHub, account: &Account) -> Result<()> {
    let current = github.get_current_user().await?;

    match account.kind {
        AccountKind::User => {
            if current.login == account.login {
                Ok(())
            } else {
                Err(Error::auth(format!(
                    "API key for {} does not match target user {}",
                    current.login, account.login
                )))
            }
        }
        AccountKind::Organization => {
            let role = github
                .get_membership_role(&current.login, &account.login)
                .await?;
            debug!(user = %current.login, org = %account.login, ?role, "membership role");

            if role == Some(MembershipRole::Admin) {
                Ok(())
            } else {
                Err(Error::auth(format!(
                    "{} is not an administrator of {}",
                    current.login, account.login
                )))
            }
        }
    }
}
