//! Store of downloaded backups, one pair of files per snapshot:
//! `<timestamp>.json` and, when the remote listed metadata,
//! `<timestamp>.info.json`.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::backup::Backup;
use crate::json::load_json;
use crate::models::{BackupData, BackupInfo};

/// Directory holding downloaded backups keyed by creation timestamp.
#[derive(Debug, Clone)]
pub struct BackupStorage {
    directory: PathBuf,
}

impl BackupStorage {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn backup_path(&self, timestamp: i64) -> PathBuf {
        self.directory.join(format!("{}.json", timestamp))
    }

    pub fn info_path(&self, timestamp: i64) -> PathBuf {
        self.directory.join(format!("{}.info.json", timestamp))
    }

    pub fn exists(&self, timestamp: i64) -> bool {
        self.backup_path(timestamp).is_file()
    }

    /// All stored backups, oldest first. Files that do not match the
    /// `<timestamp>.json` naming are ignored.
    pub fn backups(&self) -> Result<Vec<DownloadedBackup>> {
        let mut backups = Vec::new();
        if !self.directory.is_dir() {
            return Ok(backups);
        }
        let entries = std::fs::read_dir(&self.directory)
            .with_context(|| format!("Failed to read {}", self.directory.display()))?;
        for entry in entries {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let Some(timestamp) = timestamp_from_path(&path) else {
                continue;
            };
            let info_path = self.info_path(timestamp);
            backups.push(DownloadedBackup {
                timestamp,
                backup_path: path,
                info_path: info_path.is_file().then_some(info_path),
            });
        }
        backups.sort_by_key(|backup| backup.timestamp);
        Ok(backups)
    }
}

/// Parse `<timestamp>.json`; the stem must be all digits, which keeps
/// `<timestamp>.info.json` (stem `<timestamp>.info`) out.
fn timestamp_from_path(path: &Path) -> Option<i64> {
    if path.extension()? != "json" {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    stem.parse().ok()
}

/// One stored backup: its timestamp-keyed files, not yet parsed.
#[derive(Debug, Clone)]
pub struct DownloadedBackup {
    pub timestamp: i64,
    pub backup_path: PathBuf,
    pub info_path: Option<PathBuf>,
}

impl DownloadedBackup {
    pub fn load_data(&self) -> Result<Option<BackupData>> {
        load_json(&self.backup_path)
    }

    pub fn load_info(&self) -> Result<Option<BackupInfo>> {
        match &self.info_path {
            Some(path) => load_json(path),
            None => Ok(None),
        }
    }

    /// Parse this stored backup into a [`Backup`] rooted at `directory`.
    pub fn load(&self, project: &str, directory: &Path) -> Result<Option<Backup>> {
        let Some(data) = self.load_data()? else {
            return Ok(None);
        };
        let info = self.load_info()?;
        Ok(Some(Backup::new(project, directory, data, info)))
    }
}
