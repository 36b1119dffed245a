//! Download new backups from the Scrapbox API and commit them into the
//! backup repository.
//!
//! The remote side is a thin collaborator: list available backups, fetch
//! each one as JSON. Everything fetched is typed-validated on parse before
//! any file is written. A non-success HTTP status skips that request (with
//! a message on stderr) rather than aborting the run; no retries.

use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::config::Config;
use crate::export::commit_body;
use crate::git::Git;
use crate::json::save_json;
use crate::models::{BackupData, BackupListResponse};
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::storage::{BackupStorage, DownloadedBackup};

/// Client for the project-backup endpoints, authenticated with the
/// `connect.sid` session cookie.
pub struct ScrapboxClient {
    client: reqwest::Client,
    project: String,
    session_id: String,
}

impl ScrapboxClient {
    pub fn new(project: impl Into<String>, session_id: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            project: project.into(),
            session_id: session_id.into(),
        })
    }

    fn base_url(&self) -> String {
        format!(
            "https://scrapbox.io/api/project-backup/{}",
            self.project
        )
    }

    /// List the backups the remote currently holds.
    pub async fn list(&self) -> Result<Option<BackupListResponse>> {
        self.request_json(&format!("{}/list", self.base_url())).await
    }

    /// Fetch one backup by its remote record id.
    pub async fn backup(&self, id: &str) -> Result<Option<BackupData>> {
        self.request_json(&format!("{}/{}.json", self.base_url(), id))
            .await
    }

    async fn request_json<T: DeserializeOwned>(&self, url: &str) -> Result<Option<T>> {
        let response = self
            .client
            .get(url)
            .header("Cookie", format!("connect.sid={}", self.session_id))
            .send()
            .await
            .with_context(|| format!("Request failed: {}", url))?;
        let status = response.status();
        if !status.is_success() {
            eprintln!("warning: GET {} returned {}", url, status);
            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                eprintln!("warning: is the session id still valid?");
            }
            return Ok(None);
        }
        let value = response
            .json()
            .await
            .with_context(|| format!("Invalid JSON from {}", url))?;
        Ok(Some(value))
    }
}

/// Download every backup the remote holds that is not yet stored locally,
/// then commit each new snapshot into the backup repository.
pub async fn run_download(config: &Config, reporter: &dyn ProgressReporter) -> Result<()> {
    let client = ScrapboxClient::new(&config.scrapbox.project, &config.scrapbox.session_id)?;
    let storage = BackupStorage::new(&config.backup.storage_directory);
    let interval = Duration::from_secs_f64(config.backup.request_interval_secs);

    let Some(list) = client.list().await? else {
        return Ok(());
    };
    tokio::time::sleep(interval).await;

    let mut backups = list.backups;
    backups.sort_by_key(|info| info.backuped);

    let mut new_timestamps = Vec::new();
    for info in backups {
        let timestamp = info.backuped;
        if storage.exists(timestamp) && storage.info_path(timestamp).is_file() {
            continue;
        }
        reporter.report(ProgressEvent::Download { timestamp });
        let data = client.backup(&info.id).await?;
        tokio::time::sleep(interval).await;
        let Some(data) = data else {
            continue;
        };
        save_json(&storage.backup_path(timestamp), &data)?;
        save_json(&storage.info_path(timestamp), &info)?;
        new_timestamps.push(timestamp);
    }

    if new_timestamps.is_empty() {
        return Ok(());
    }

    let git = Git::new(&config.backup.repository);
    git.init_if_needed()?;
    for backup in storage.backups()? {
        if !new_timestamps.contains(&backup.timestamp) {
            continue;
        }
        commit_backup(config, &git, &backup, reporter)?;
    }
    Ok(())
}

/// Write one stored snapshot into the repository working tree and commit
/// it, dated at the snapshot's creation time.
fn commit_backup(
    config: &Config,
    git: &Git,
    downloaded: &DownloadedBackup,
    reporter: &dyn ProgressReporter,
) -> Result<()> {
    let Some(mut backup) = downloaded.load(&config.scrapbox.project, git.directory())? else {
        return Ok(());
    };
    backup.sort_pages(config.backup.page_order);
    backup.save(reporter)?;
    git.add_all()?;
    if !git.has_staged_changes()? {
        return Ok(());
    }
    let subject = Utc
        .timestamp_opt(downloaded.timestamp, 0)
        .single()
        .map(|time| time.to_rfc3339())
        .unwrap_or_else(|| downloaded.timestamp.to_string());
    let message = match backup.info() {
        Some(info) => format!("{}\n\n{}", subject, commit_body(info)),
        None => subject,
    };
    git.commit(&message, downloaded.timestamp)?;
    Ok(())
}
