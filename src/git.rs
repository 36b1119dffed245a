//! Thin wrapper around the `git` binary for the backup repository.
//!
//! One commit per snapshot: the commit date is pinned to the snapshot's
//! creation time, and the commit body carries the backup metadata in a
//! line-per-field form the exporter can parse back (see
//! [`crate::export::Commit::backup_info`]).

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Debug, Clone)]
pub struct Git {
    directory: PathBuf,
}

impl Git {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Create the repository directory and run `git init` unless a `.git`
    /// directory already exists.
    pub fn init_if_needed(&self) -> Result<()> {
        if self.directory.join(".git").exists() {
            return Ok(());
        }
        std::fs::create_dir_all(&self.directory).with_context(|| {
            format!("Failed to create repository: {}", self.directory.display())
        })?;
        self.run(&["init"])?;
        Ok(())
    }

    pub fn add_all(&self) -> Result<()> {
        self.run(&["add", "--all"])?;
        Ok(())
    }

    /// Whether `git add` staged anything to commit.
    pub fn has_staged_changes(&self) -> Result<bool> {
        let output = Command::new("git")
            .args(["status", "--porcelain"])
            .current_dir(&self.directory)
            .output()
            .with_context(|| "Failed to execute 'git status'. Is git installed?")?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("git status failed: {}", stderr.trim());
        }
        Ok(!output.stdout.is_empty())
    }

    /// Commit staged changes with author and committer dates pinned to
    /// `timestamp` (epoch seconds).
    pub fn commit(&self, message: &str, timestamp: i64) -> Result<()> {
        let date = format!("{} +0000", timestamp);
        let output = Command::new("git")
            .args(["commit", "--message", message, "--date", &date])
            .env("GIT_COMMITTER_DATE", &date)
            .current_dir(&self.directory)
            .output()
            .with_context(|| "Failed to execute 'git commit'")?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("git commit failed: {}", stderr.trim());
        }
        Ok(())
    }

    /// `git log -z` over the whole history with the given format string.
    /// Records are NUL-separated.
    pub fn log_z(&self, format: &str) -> Result<String> {
        let output = self.run(&["log", "-z", &format!("--format={}", format)])?;
        Ok(output)
    }

    /// `git show -z <object>`, e.g. `<hash>:<path>` for a file at a commit.
    pub fn show(&self, object: &str) -> Result<String> {
        self.run(&["show", "-z", object])
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.directory)
            .output()
            .with_context(|| format!("Failed to execute 'git {}'. Is git installed?", args[0]))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("git {} failed: {}", args[0], stderr.trim());
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
