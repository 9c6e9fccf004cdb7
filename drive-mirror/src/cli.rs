/// CLI glue for drive-mirror: command parsing, client construction and the
/// run-once / run-on-schedule loop for each agent.
///
/// All mirroring logic lives in `drive-mirror-core`; this module only wires
/// concrete clients into it and reports progress on the console.
///
/// ## Subcommands
/// - `select-folders`: interactive Drive folder picker, writes a mapping file
/// - `sync-drive`: Drive folder tree → local directory
/// - `mirror-repo`: GitHub repository root → Drive folder
use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use drive_mirror_core::config::SyncConfig;
use drive_mirror_core::download::{materialize_tree, MaterializeReport};
use drive_mirror_core::mirror::{mirror_repository, MirrorReport};
use drive_mirror_core::schedule::{run_scheduled, CronSchedule};
use drive_mirror_core::selector::{
    fetch_all_folders, prompt_selection, save_mapping, FolderMapping, MAPPING_FILE_NAME,
};
use drive_mirror_core::SyncError;

use crate::credentials::{DRIVE_READONLY_SCOPE, DRIVE_SCOPE};
use crate::github::GitHubClient;
use crate::google_drive::GoogleDriveClient;
use crate::load_config::load_config;

/// Default schedule for the repository mirror: top of every hour.
pub const DEFAULT_MIRROR_CRON: &str = "0 * * * *";

#[derive(Parser)]
#[clap(
    name = "drive-mirror",
    version,
    about = "Mirror files between a Google Drive folder, a local directory and a GitHub repository"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Pick Drive folders interactively and save them to a mapping file
    SelectFolders {
        /// Where to write the mapping JSON
        #[clap(long, default_value = MAPPING_FILE_NAME)]
        output: PathBuf,
    },
    /// Download a Drive folder tree into a local directory
    SyncDrive {
        /// Path to the JSON sync config file
        #[clap(long)]
        config: PathBuf,
        /// Run a single sync and exit instead of staying resident
        #[clap(long)]
        once: bool,
    },
    /// Copy the top-level files of a GitHub repository into a Drive folder
    MirrorRepo {
        #[clap(long, env = "GITHUB_OWNER")]
        owner: String,
        #[clap(long, env = "GITHUB_REPO")]
        repo: String,
        /// Target Drive folder id
        #[clap(long, env = "DRIVE_FOLDER_ID")]
        folder_id: String,
        #[clap(long, default_value = DEFAULT_MIRROR_CRON)]
        cron: String,
        /// IANA timezone for the cron schedule (UTC when empty)
        #[clap(long, default_value = "")]
        timezone: String,
        /// Run a single mirror pass and exit instead of staying resident
        #[clap(long)]
        once: bool,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::SelectFolders { output } => select_folders(&output).await,
        Commands::SyncDrive { config, once } => sync_drive(&config, once).await,
        Commands::MirrorRepo {
            owner,
            repo,
            folder_id,
            cron,
            timezone,
            once,
        } => mirror_repo(&owner, &repo, &folder_id, &cron, &timezone, once).await,
    }
}

/// True when the `CI` environment variable marks a non-interactive run.
pub fn running_in_ci() -> bool {
    std::env::var("CI")
        .map(|v| !matches!(v.trim(), "" | "0" | "false"))
        .unwrap_or(false)
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

async fn select_folders(output: &Path) -> Result<()> {
    tracing::info!(command = "select-folders", output = %output.display(), "Starting folder selection");
    println!("Drive folder selection");
    println!("======================\n");

    let drive = GoogleDriveClient::connect(DRIVE_READONLY_SCOPE)
        .await
        .context("Google Drive authentication failed")?;
    println!("Google Drive authentication completed\n");

    println!("Loading folders...");
    let folders = fetch_all_folders(&drive).await?;
    println!("{} folders found", folders.len());

    let mut input = tokio::io::BufReader::new(tokio::io::stdin());
    let mut out = std::io::stdout();
    let selected = prompt_selection(&folders, &mut input, &mut out).await?;

    let mapping = FolderMapping::new(selected);
    save_mapping(&mapping, output).await?;
    println!("\nMapping file saved: {}", output.display());
    Ok(())
}

async fn sync_drive(config_path: &Path, once: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let schedule = CronSchedule::parse(&config.schedule.cron, &config.schedule.timezone)?;
    tracing::info!(command = "sync-drive", sync_name = %config.sync_name, "Starting Drive sync agent");

    let drive = GoogleDriveClient::connect(DRIVE_READONLY_SCOPE)
        .await
        .context("Google Drive authentication failed")?;

    let destination = config.destination_under(&std::env::current_dir()?);
    println!("Drive sync agent");
    println!("================");
    println!("Configuration: {}", config.sync_name);
    println!("Interval: {}", config.schedule.interval);
    println!("Cron: {}", schedule.expression());

    let first = perform_sync(&drive, &config, &destination).await;
    if once || running_in_ci() {
        first?;
        return Ok(());
    }

    println!("Next sync scheduled ({})", config.schedule.interval);
    let (drive, config, destination) = (&drive, &config, destination.as_path());
    run_scheduled(&schedule, move || async move {
        let _ = perform_sync(drive, config, destination).await;
    })
    .await?;
    Ok(())
}

async fn perform_sync(
    drive: &GoogleDriveClient,
    config: &SyncConfig,
    destination: &Path,
) -> Result<MaterializeReport, SyncError> {
    println!("\n[{}] Starting Drive folder sync...", timestamp());
    println!("Folder: {}", config.source.folder_name);
    println!("ID: {}", config.source.folder_id);

    match materialize_tree(drive, &config.source.folder_id, destination).await {
        Ok(report) => {
            println!(
                "Sync complete: {} ({} files, {} folders)",
                destination.display(),
                report.files_written.len(),
                report.folders_synced
            );
            if !report.failed_files.is_empty() || !report.failed_folders.is_empty() {
                println!(
                    "  {} files and {} folders could not be synced, see log",
                    report.failed_files.len(),
                    report.failed_folders.len()
                );
            }
            tracing::info!(command = "sync-drive", ?report, "Sync complete");
            Ok(report)
        }
        Err(e) => {
            tracing::error!(command = "sync-drive", error = %e, "Sync failed");
            eprintln!("[ERROR] Sync failed: {e}");
            Err(e)
        }
    }
}

async fn mirror_repo(
    owner: &str,
    repo: &str,
    folder_id: &str,
    cron: &str,
    timezone: &str,
    once: bool,
) -> Result<()> {
    let schedule = CronSchedule::parse(cron, timezone)?;
    tracing::info!(command = "mirror-repo", owner, repo, folder_id, "Starting repository mirror agent");

    let drive = GoogleDriveClient::connect(DRIVE_SCOPE)
        .await
        .context("Google Drive authentication failed")?;
    let github = GitHubClient::from_env(owner, repo);

    println!("Repository mirror agent started: {owner}/{repo}");
    let first = perform_mirror(&github, &drive, folder_id).await;
    if once || running_in_ci() {
        first?;
        return Ok(());
    }

    println!("Next mirror scheduled ({})", schedule.expression());
    let (github, drive) = (&github, &drive);
    run_scheduled(&schedule, move || async move {
        let _ = perform_mirror(github, drive, folder_id).await;
    })
    .await?;
    Ok(())
}

async fn perform_mirror(
    github: &GitHubClient,
    drive: &GoogleDriveClient,
    folder_id: &str,
) -> Result<MirrorReport, SyncError> {
    println!("[{}] Starting repository mirror...", timestamp());
    match mirror_repository(github, drive, folder_id).await {
        Ok(report) => {
            for name in &report.created {
                println!("Created: {name}");
            }
            for name in &report.updated {
                println!("Updated: {name}");
            }
            for name in &report.failed {
                println!("Failed: {name}");
            }
            println!("Mirror complete");
            tracing::info!(command = "mirror-repo", ?report, "Mirror complete");
            Ok(report)
        }
        Err(e) => {
            tracing::error!(command = "mirror-repo", error = %e, "Mirror failed");
            eprintln!("[ERROR] Mirror failed: {e}");
            Err(e)
        }
    }
}
