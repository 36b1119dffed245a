//! Re-export historical snapshots from the backup repository.
//!
//! Each commit in the repository holds one snapshot: `<project>.json` at the
//! repo root plus per-page files, with the backup metadata encoded in the
//! commit body. This module owns both directions of that convention —
//! [`commit_body`] when committing, [`Commit::backup_info`] when reading
//! history back.

use anyhow::Result;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

use crate::backup::escape_filename;
use crate::git::Git;
use crate::json::{parse_json, save_json};
use crate::models::{BackupData, BackupInfo};

/// `git log` format matched by [`parse_commit`]. `%ct` is the committer
/// date, which `Git::commit` pins to the snapshot timestamp.
const LOG_FORMAT: &str = "hash: %H\ntimestamp: %ct\nbody:\n%b";

static COMMIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^hash: (?P<hash>[0-9a-f]{40})\ntimestamp: (?P<timestamp>\d+)\nbody:\n(?P<body>.*?)\n?$")
        .unwrap()
});

/// One commit in the backup repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub hash: String,
    pub timestamp: i64,
    pub body: String,
}

impl Commit {
    /// Best-effort parse of the commit body as backup metadata.
    ///
    /// The body holds one `'key': value` pair per line; joining the lines
    /// with commas, wrapping in braces, and swapping single quotes for
    /// double quotes yields the metadata JSON. A body that does not parse
    /// is treated as "no metadata", never as an error.
    pub fn backup_info(&self) -> Option<BackupInfo> {
        if self.body.is_empty() {
            return None;
        }
        let json = format!(
            "{{{}}}",
            self.body.split('\n').collect::<Vec<_>>().join(",")
        )
        .replace('\'', "\"");
        parse_json(&json).ok()
    }
}

/// Render backup metadata as a commit body that [`Commit::backup_info`]
/// parses back.
pub fn commit_body(info: &BackupInfo) -> String {
    let mut lines = vec![
        format!("'id': '{}'", info.id),
        format!("'backuped': {}", info.backuped),
    ];
    if let Some(total_pages) = info.total_pages {
        lines.push(format!("'totalPages': {}", total_pages));
    }
    if let Some(total_links) = info.total_links {
        lines.push(format!("'totalLinks': {}", total_links));
    }
    lines.join("\n")
}

fn parse_commit(log: &str) -> Option<Commit> {
    let captures = COMMIT.captures(log)?;
    Some(Commit {
        hash: captures["hash"].to_string(),
        timestamp: captures["timestamp"].parse().ok()?,
        body: captures["body"].to_string(),
    })
}

/// All commits in the repository, oldest first. Unparseable log records are
/// skipped with a warning.
pub fn commits(git: &Git) -> Result<Vec<Commit>> {
    let log = git.log_z(LOG_FORMAT)?;
    let mut commits: Vec<Commit> = Vec::new();
    for record in log.split('\0') {
        if record.is_empty() {
            continue;
        }
        match parse_commit(record) {
            Some(commit) => commits.push(commit),
            None => eprintln!("warning: failed to parse commit record {:?}", record),
        }
    }
    commits.sort_by_key(|commit| commit.timestamp);
    Ok(commits)
}

/// Export every snapshot in the repository's history to `destination` as
/// `<timestamp>.json` (+ `.info.json` when the commit body carried
/// metadata). A commit whose snapshot fails validation is skipped with a
/// warning; the rest of the export continues.
pub fn run_export(project: &str, git: &Git, destination: &Path) -> Result<()> {
    let filename = format!("{}.json", escape_filename(project));
    for commit in commits(git)? {
        let raw = match git.show(&format!("{}:{}", commit.hash, filename)) {
            Ok(raw) => raw,
            Err(error) => {
                eprintln!(
                    "warning: skip commit {}: no snapshot file ({})",
                    commit.hash, error
                );
                continue;
            }
        };
        let data: BackupData = match parse_json(&raw) {
            Ok(data) => data,
            Err(error) => {
                eprintln!(
                    "warning: skip commit {}: invalid snapshot ({})",
                    commit.hash, error
                );
                continue;
            }
        };
        save_json(&destination.join(format!("{}.json", commit.timestamp)), &data)?;
        if let Some(info) = commit.backup_info() {
            save_json(
                &destination.join(format!("{}.info.json", commit.timestamp)),
                &info,
            )?;
        }
    }
    Ok(())
}
