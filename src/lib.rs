//! # Scrapbox Backup
//!
//! Back up a Scrapbox project into a local Git repository — one commit per
//! snapshot — and analyze the backed-up corpus.
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌──────────┐
//! │ Scrapbox │──▶│ Storage  │──▶│   Git    │
//! │   API    │   │ <ts>.json│   │ 1 commit │
//! └──────────┘   └──────────┘   │ per snap │
//!                               └────┬─────┘
//!                     ┌──────────────┤
//!                     ▼              ▼
//!               ┌──────────┐   ┌──────────┐
//!               │  export  │   │  links   │
//!               │ history  │   │ analysis │
//!               └──────────┘   └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Snapshot document schema |
//! | [`backup`] | In-memory snapshot: link analysis, ordering, persistence |
//! | [`filter`] | Code-aware line filter for link scanning |
//! | [`storage`] | Downloaded snapshot store |
//! | [`download`] | Scrapbox API client and download/commit pipeline |
//! | [`git`] | Git subprocess wrapper |
//! | [`export`] | Re-export of snapshots from Git history |
//! | [`probe`] | Concurrency-bounded external link liveness probing |
//! | [`progress`] | Progress reporting on stderr |

pub mod backup;
pub mod config;
pub mod download;
pub mod export;
pub mod filter;
pub mod git;
pub mod json;
pub mod models;
pub mod probe;
pub mod progress;
pub mod storage;
