//! # Scrapbox Backup CLI (`sbx`)
//!
//! Commands for downloading project backups, re-exporting them from Git
//! history, and checking the corpus's external links.
//!
//! ```bash
//! sbx --config ./scrapbox.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `sbx download` | Fetch new backups and commit each into the repository |
//! | `sbx list` | List downloaded backups |
//! | `sbx export <dir>` | Re-export every snapshot in Git history |
//! | `sbx links` | Probe every external link and write `links.json` |

use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use scrapbox_backup::config;
use scrapbox_backup::download;
use scrapbox_backup::export;
use scrapbox_backup::git::Git;
use scrapbox_backup::probe;
use scrapbox_backup::progress::ProgressMode;
use scrapbox_backup::storage::BackupStorage;

/// Scrapbox Backup — back up a Scrapbox project into Git and analyze its
/// links.
#[derive(Parser)]
#[command(
    name = "sbx",
    about = "Back up a Scrapbox project into Git, with link analysis and liveness probing",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./scrapbox.toml")]
    config: PathBuf,

    /// Progress reporting on stderr. Defaults to `human` when stderr is a
    /// TTY, `off` otherwise.
    #[arg(long, global = true, value_enum)]
    progress: Option<ProgressMode>,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Download new backups and commit each into the repository.
    ///
    /// Fetches the remote backup list, downloads every backup not yet in
    /// the storage directory, and records each snapshot as one commit in
    /// the backup repository, dated at the snapshot's creation time.
    Download,

    /// List downloaded backups.
    List,

    /// Re-export every snapshot in the repository's history.
    ///
    /// Walks `git log` oldest-first and writes `<timestamp>.json` (plus
    /// `<timestamp>.info.json` when the commit carried metadata) into the
    /// destination directory.
    Export {
        /// Destination directory.
        destination: PathBuf,
    },

    /// Probe every external link in the latest backup.
    ///
    /// Extracts absolute URLs from page text (code blocks, prompt lines,
    /// and inline code excluded), issues one GET per URL with bounded
    /// concurrency, and writes the outcome log.
    Links {
        /// Output file for the probe log.
        #[arg(long, default_value = "links.json")]
        output: PathBuf,

        /// Print URLs and their locations without probing anything.
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    let mode = cli.progress.unwrap_or_else(ProgressMode::default_for_tty);
    let reporter = mode.reporter();

    match cli.command {
        Commands::Download => {
            download::run_download(&cfg, reporter.as_ref()).await?;
        }
        Commands::List => {
            let storage = BackupStorage::new(&cfg.backup.storage_directory);
            for backup in storage.backups()? {
                let date = Utc
                    .timestamp_opt(backup.timestamp, 0)
                    .single()
                    .map(|time| time.to_rfc3339())
                    .unwrap_or_else(|| "invalid timestamp".to_string());
                println!("{}  {}", backup.timestamp, date);
            }
        }
        Commands::Export { destination } => {
            let git = Git::new(&cfg.backup.repository);
            export::run_export(&cfg.scrapbox.project, &git, &destination)?;
        }
        Commands::Links { output, dry_run } => {
            let storage = BackupStorage::new(&cfg.backup.storage_directory);
            let latest = storage
                .backups()?
                .into_iter()
                .last()
                .context("No downloaded backups; run `sbx download` first")?;
            let backup = latest
                .load(&cfg.scrapbox.project, &cfg.backup.storage_directory)?
                .context("Latest backup file disappeared")?;
            let links = backup.external_links();
            if dry_run {
                for link in &links {
                    println!("{}", link.url);
                    for location in &link.locations {
                        println!("    {} (line {})", location.title, location.line);
                    }
                }
                return Ok(());
            }
            let logs = probe::probe_external_links(
                links,
                cfg.probe.parallel_limit,
                Duration::from_secs_f64(cfg.probe.timeout_secs),
                Arc::from(mode.reporter()),
            )
            .await?;
            probe::save_probe_log(&output, &logs)?;
            let errors = logs.iter().filter(|log| log.response.is_error()).count();
            println!(
                "probed {} links ({} errors), log written to {}",
                logs.len(),
                errors,
                output.display()
            );
        }
    }

    Ok(())
}
