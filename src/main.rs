//! gh-label-sync CLI
//!
//! Command line tool for synchronizing labels across an account's repositories

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use gh_label_sync::{
    config::{find_convention_config, load_settings_file, SettingsFile},
    ConsoleReporter, Error, GitHubClient, LabelSyncer, SyncFlags, SyncSettings, SyncSummary,
};

/// gh-label-sync CLI
///
/// Synchronize GitHub labels across every repository of an organization or user
#[derive(Parser)]
#[command(
    name = "gh-label-sync",
    version,
    about = "Synchronize GitHub labels across every repository of an organization or user",
    long_about = "Reads the default labels of a GitHub organization or user by creating a \
    temporary private repository, then adds, edits and deletes labels in every repository \
    so they match."
)]
struct Cli {
    /// The name of the GitHub organization or username to sync
    #[arg(value_name = "ORG/USERNAME")]
    account: Option<String>,

    /// Only sync repositories whose name matches one of these regular expressions
    #[arg(value_name = "FILTERS")]
    filters: Vec<String>,

    /// GitHub API Key (Personal Access Token)
    #[arg(short = 'k', long)]
    api_key: Option<String>,

    /// Do not add new labels
    #[arg(short = 'a', long)]
    no_add: bool,

    /// Do not edit existing labels
    #[arg(short = 'e', long)]
    no_edit: bool,

    /// Do not delete existing labels
    #[arg(short = 'd', long)]
    no_delete: bool,

    /// Do not perform any actions (equivalent to `-a -e -d`)
    #[arg(short = 'r', long)]
    dry_run: bool,

    /// Settings file path (JSON/YAML)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn flags(&self) -> SyncFlags {
        SyncFlags {
            no_add: self.no_add,
            no_edit: self.no_edit,
            no_delete: self.no_delete,
            dry_run: self.dry_run,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            display_error(&e);
            ExitCode::FAILURE
        }
    }
}

/// Print a failed run, one line per failed repository operation
fn display_error(e: &anyhow::Error) {
    match e.downcast_ref::<Error>() {
        Some(Error::SyncFailed { failures }) => {
            let header = format!("{} repository operation(s) failed:", failures.len());
            eprintln!("{} {}", "✗".red(), header.red());
            for failure in failures {
                eprintln!(
                    "  {} {}",
                    format!("{}:", failure.repository).bold(),
                    failure.message.red()
                );
            }
        }
        Some(err) if err.is_retryable() => {
            eprintln!("{} {}", "✗".red(), format!("{e:#}").red());
            eprintln!("{}", "This is usually temporary; run the command again.".yellow());
        }
        _ => eprintln!("{} {}", "✗".red(), format!("{e:#}").red()),
    }
}

/// Install the tracing subscriber; `RUST_LOG` overrides the default level
fn init_tracing(verbose: bool) {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_default();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_filter(verbose, &directives))
        .init();
}

/// Log filter from `RUST_LOG`-style directives, falling back to the verbosity level
fn tracing_filter(verbose: bool, directives: &str) -> EnvFilter {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };

    EnvFilter::builder()
        .with_default_directive(level.into())
        .parse_lossy(directives)
}

/// Execute synchronization
async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = build_settings(&cli)?;

    if settings.permissions.is_dry_run() {
        println!(
            "{} Running in dry-run mode (no changes will be made)",
            "!".yellow()
        );
    }

    let client = GitHubClient::new(&settings.access_token)?;
    let syncer = LabelSyncer::new(Box::new(client), Box::new(ConsoleReporter::new(cli.verbose)));
    let summary = syncer.run(&settings).await?;

    display_summary(&summary);
    Ok(())
}

/// Resolve settings from the settings file, command line and environment
fn build_settings(cli: &Cli) -> anyhow::Result<SyncSettings> {
    let file = match cli.config.clone().or_else(find_convention_config) {
        Some(path) => load_settings_file(&path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => SettingsFile::default(),
    };

    let token = get_access_token(cli.api_key.clone())?;
    let settings = file.into_settings(cli.account.clone(), &token, &cli.filters, cli.flags())?;
    Ok(settings)
}

/// Get access token
fn get_access_token(arg_token: Option<String>) -> gh_label_sync::Result<String> {
    arg_token
        .or_else(|| std::env::var("GITHUB_TOKEN").ok())
        .ok_or_else(|| {
            Error::config_validation(
                "GitHub API Key (Personal Access Token) is required. Set via --api-key or GITHUB_TOKEN env var",
            )
        })
}

/// Display synchronization results
fn display_summary(summary: &SyncSummary) {
    let changed = summary.added() + summary.edited() + summary.deleted() > 0;
    if changed {
        println!("\n{} Sync completed:", "✓".green());
    } else {
        println!("\n{} No changes made", "✓".green());
    }

    println!("  Repositories: {}", summary.repositories.len().to_string().cyan());
    println!("  Added:        {}", summary.added().to_string().green());
    println!("  Edited:       {}", summary.edited().to_string().yellow());
    println!("  Deleted:      {}", summary.deleted().to_string().red());
    if summary.skipped() > 0 {
        println!("  Archived:     {}", summary.skipped().to_string().dimmed());
    }
}
