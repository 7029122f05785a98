//! Configuration Management
//!
//! Per-run synchronization settings, resolved once before any network call

use std::path::{Path, PathBuf};
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::github::Repository;

/// Convention-based settings file names searched in order
pub const CONVENTION_CONFIG_FILES: &[&str] = &[
    ".gh-label-sync.json",
    ".gh-label-sync.yaml",
    ".gh-label-sync.yml",
    ".github/label-sync.json",
    ".github/label-sync.yaml",
    ".github/label-sync.yml",
];

/// Which label actions may be applied to repositories
///
/// Dry-run is not a separate mode: it disables all three actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectivePermissions {
    pub add: bool,
    pub edit: bool,
    pub delete: bool,
}

impl EffectivePermissions {
    /// Resolve permissions from the user-facing flags
    pub fn resolve(flags: &SyncFlags) -> Self {
        Self {
            add: !(flags.no_add || flags.dry_run),
            edit: !(flags.no_edit || flags.dry_run),
            delete: !(flags.no_delete || flags.dry_run),
        }
    }

    /// Every action enabled
    pub fn all() -> Self {
        Self {
            add: true,
            edit: true,
            delete: true,
        }
    }

    /// No action enabled; nothing will be changed
    pub fn is_dry_run(&self) -> bool {
        !(self.add || self.edit || self.delete)
    }
}

/// User-facing action flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncFlags {
    #[serde(default)]
    pub no_add: bool,
    #[serde(default)]
    pub no_edit: bool,
    #[serde(default)]
    pub no_delete: bool,
    #[serde(default)]
    pub dry_run: bool,
}

impl SyncFlags {
    /// Combine two flag sets; a flag set in either is set in the result
    pub fn union(self, other: SyncFlags) -> Self {
        Self {
            no_add: self.no_add || other.no_add,
            no_edit: self.no_edit || other.no_edit,
            no_delete: self.no_delete || other.no_delete,
            dry_run: self.dry_run || other.dry_run,
        }
    }
}

/// Repository name filters
///
/// A repository is selected when its name matches any pattern. With no
/// patterns every repository is selected.
#[derive(Debug, Clone, Default)]
pub struct RepositoryFilter {
    patterns: Vec<Regex>,
}

impl RepositoryFilter {
    /// Compile filter patterns
    ///
    /// # Errors
    /// Returns an error naming the first pattern that is not a valid regular expression
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|pattern| {
                let pattern = pattern.as_ref();
                Regex::new(pattern).map_err(|source| Error::InvalidFilter {
                    pattern: pattern.to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { patterns })
    }

    /// Whether no patterns are configured
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Whether a repository name is selected
    pub fn matches(&self, name: &str) -> bool {
        self.is_empty() || self.patterns.iter().any(|p| p.is_match(name))
    }

    /// Select repositories, preserving their order
    pub fn select<'r>(&self, repositories: &'r [Repository]) -> Vec<&'r Repository> {
        repositories
            .iter()
            .filter(|repo| self.matches(&repo.name))
            .collect()
    }
}

/// Bounds on polling the probe repository for its default labels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeSettings {
    /// Maximum number of label reads, including the first two
    pub max_attempts: u32,

    /// Delay before the first re-read
    pub initial_delay: Duration,

    /// Upper bound for the doubling delay
    pub max_delay: Duration,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl ProbeSettings {
    /// Delay before the re-read following `retry` earlier re-reads
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        self.initial_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

/// Sync Configuration
///
/// Resolved settings for a single run
#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Organization or user to sync
    pub account_name: String,

    /// GitHub access token
    pub access_token: String,

    /// Repository name filters
    pub filter: RepositoryFilter,

    /// Enabled label actions
    pub permissions: EffectivePermissions,

    /// Probe repository polling bounds
    pub probe: ProbeSettings,
}

impl SyncSettings {
    /// Build and validate settings
    ///
    /// # Errors
    /// - If the account name or access token is empty
    /// - If a filter is not a valid regular expression
    pub fn new<S: AsRef<str>>(
        account_name: &str,
        access_token: &str,
        filters: &[S],
        flags: SyncFlags,
    ) -> Result<Self> {
        let settings = Self {
            account_name: account_name.trim().to_string(),
            access_token: access_token.trim().to_string(),
            filter: RepositoryFilter::new(filters)?,
            permissions: EffectivePermissions::resolve(&flags),
            probe: ProbeSettings::default(),
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Validate configuration
    ///
    /// # Errors
    /// - If the access token is empty
    /// - If the account name is empty
    pub fn validate(&self) -> Result<()> {
        if self.access_token.trim().is_empty() {
            return Err(Error::config_validation(
                "GitHub API Key (Personal Access Token) is required",
            ));
        }

        if self.account_name.trim().is_empty() {
            return Err(Error::config_validation(
                "An organization or username to sync is required",
            ));
        }

        Ok(())
    }
}

/// Settings file contents
///
/// Every field is optional; command-line values take precedence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsFile {
    /// Organization or user to sync
    #[serde(default)]
    pub account: Option<String>,

    /// Repository name filters
    #[serde(default)]
    pub filters: Vec<String>,

    /// Action flags
    #[serde(flatten)]
    pub flags: SyncFlags,
}

impl SettingsFile {
    /// Merge command-line values over the file and resolve [`SyncSettings`]
    ///
    /// The account from the command line wins, filters are concatenated
    /// (file first) and flags are combined.
    ///
    /// # Errors
    /// If the merged settings are invalid
    pub fn into_settings(
        self,
        account: Option<String>,
        access_token: &str,
        filters: &[String],
        flags: SyncFlags,
    ) -> Result<SyncSettings> {
        let account = account.or(self.account).unwrap_or_default();
        let mut all_filters = self.filters;
        all_filters.extend(filters.iter().cloned());

        SyncSettings::new(
            &account,
            access_token,
            all_filters.as_slice(),
            self.flags.union(flags),
        )
    }
}

/// Load a settings file, detecting format by extension
///
/// # Errors
/// If file reading or parsing fails, or if the extension is unsupported
pub fn load_settings_file<P: AsRef<Path>>(path: P) -> Result<SettingsFile> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Configuration file not found: {}", path.display()),
        )
        .into());
    }

    let content = std::fs::read_to_string(path)?;
    parse_settings_from_content(&content, &path.to_string_lossy())
}

/// Parse settings from a content string, detecting format by file path extension
///
/// # Errors
/// If parsing fails, or if the extension is unsupported
pub fn parse_settings_from_content(content: &str, path: &str) -> Result<SettingsFile> {
    let ext = path.rsplit('.').next().unwrap_or("");

    match ext {
        "json" => Ok(serde_json::from_str(content)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(content)?),
        _ => Err(Error::config_validation(format!(
            "Configuration file must be .json, .yaml, or .yml: {path}"
        ))),
    }
}

/// Search for a convention-based settings file in the current directory
pub fn find_convention_config() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    find_convention_config_in(&cwd)
}

/// Search for a convention-based settings file in the given directory
///
/// Searches [`CONVENTION_CONFIG_FILES`] in order and returns the first found.
pub fn find_convention_config_in(dir: &Path) -> Option<PathBuf> {
    CONVENTION_CONFIG_FILES
        .iter()
        .map(|filename| dir.join(filename))
        .find(|path| path.exists())
}
