//! Download, save, and probe progress reporting.
//!
//! Operations that touch the network or the filesystem take an explicit
//! reporter instead of logging through a process-wide handle. Progress is
//! emitted on **stderr** so stdout remains parseable for scripts.

use std::io::Write;
use std::path::PathBuf;

/// A single progress event.
#[derive(Clone, Debug)]
pub enum ProgressEvent {
    /// A backup with this creation timestamp is being downloaded.
    Download { timestamp: i64 },
    /// A file is being written.
    Save { path: PathBuf },
    /// n of total external links have been probed.
    Probe { n: u64, total: u64 },
}

/// Reports operation progress. Implementations write to stderr (human or JSON).
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// Human-friendly progress on stderr.
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: ProgressEvent) {
        let line = match &event {
            ProgressEvent::Download { timestamp } => {
                format!("download  backup {}\n", timestamp)
            }
            ProgressEvent::Save { path } => format!("save  {}\n", path.display()),
            ProgressEvent::Probe { n, total } => {
                format!("probe  {} / {} links\n", n, total)
            }
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ProgressReporter for JsonProgress {
    fn report(&self, event: ProgressEvent) {
        let obj = match &event {
            ProgressEvent::Download { timestamp } => serde_json::json!({
                "event": "download",
                "timestamp": timestamp
            }),
            ProgressEvent::Save { path } => serde_json::json!({
                "event": "save",
                "path": path.display().to_string()
            }),
            ProgressEvent::Probe { n, total } => serde_json::json!({
                "event": "probe",
                "n": n,
                "total": total
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Build a reporter for this mode.
    pub fn reporter(&self) -> Box<dyn ProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
