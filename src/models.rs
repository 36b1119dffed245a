//! Core data models for a Scrapbox project backup.
//!
//! A backup is one full export of a project: its name, export timestamp, and
//! every page with its text lines. The remote exporter emits page lines in
//! two shapes (bare strings, or records carrying per-line timestamps), so
//! [`LineContent`] is an untagged union and [`LineContent::text`] is the
//! single normalization point used by all analysis.
//!
//! Schema validation is typed deserialization: required fields are
//! non-optional struct fields, and `deny_unknown_fields` rejects anything
//! outside the declared set. A document that deserializes is a valid
//! document; the `serde_json` error carries the offending path otherwise.

use serde::{Deserialize, Serialize};

/// One full project export as served by the Scrapbox backup API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackupData {
    pub name: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    /// Export time, epoch seconds.
    pub exported: i64,
    pub pages: Vec<Page>,
}

/// A single wiki page within a backup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Page {
    pub title: String,
    /// Creation time, epoch seconds.
    pub created: i64,
    /// Last update time, epoch seconds.
    pub updated: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub lines: Vec<LineContent>,
    /// Wiki-link targets referenced by this page, lowercased by the exporter.
    #[serde(rename = "linksLc", default)]
    pub links_lc: Vec<String>,
}

impl Page {
    /// Plain-text view of the page's lines, in order.
    pub fn line_texts(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(LineContent::text)
    }
}

/// A page line: either a bare string or a record with per-line timestamps.
/// Both shapes occur in the wild depending on exporter version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LineContent {
    Text(String),
    Annotated(AnnotatedLine),
}

/// Record form of a page line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnnotatedLine {
    pub text: String,
    pub created: i64,
    pub updated: i64,
}

impl LineContent {
    /// The line's text regardless of shape.
    pub fn text(&self) -> &str {
        match self {
            LineContent::Text(text) => text,
            LineContent::Annotated(line) => &line.text,
        }
    }
}

/// Metadata sidecar for one backup, as listed by the remote API and as
/// reconstructed from a commit body on export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackupInfo {
    pub id: String,
    /// Backup creation time, epoch seconds.
    pub backuped: i64,
    #[serde(rename = "totalPages", skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<i64>,
    #[serde(rename = "totalLinks", skip_serializing_if = "Option::is_none")]
    pub total_links: Option<i64>,
}

/// Response of the remote `/list` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackupListResponse {
    pub backups: Vec<BackupInfo>,
}

/// A pointer into a page's line list. Never owns the line content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Location {
    pub title: String,
    /// 0-based index into the page's original, unfiltered line sequence.
    pub line: usize,
}

/// How an internal link target resolved against the backup's page set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    /// The target matches an existing page title.
    Page,
    /// Free-text reference with no matching page.
    Word,
}

/// One node in the internal link graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalLinkNode {
    pub name: String,
    pub kind: LinkKind,
}

/// All link targets referenced by one page, sorted by target name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalLink {
    pub source: InternalLinkNode,
    pub targets: Vec<InternalLinkNode>,
}

/// An absolute URL found in page text, with every location it occurs at.
/// Locations are in scan order (pages in document order, lines ascending).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalLink {
    pub url: String,
    pub locations: Vec<Location>,
}

/// Page ordering applied before a backup is committed, so diffs between
/// snapshots stay stable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageOrder {
    /// Keep the exporter's order.
    #[default]
    AsIs,
    /// Oldest created page first.
    CreatedAsc,
    /// Newest created page first.
    CreatedDesc,
}
