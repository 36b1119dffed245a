//! In-memory representation of one downloaded backup.
//!
//! [`Backup`] owns the validated document plus its optional metadata sidecar
//! and provides page-title indexing, internal/external link analysis, page
//! ordering, and persistence to the on-disk layout:
//!
//! ```text
//! <dir>/<escaped-project>.json          full document
//! <dir>/<escaped-project>.info.json     metadata sidecar (optional)
//! <dir>/pages/<escaped-title>.json      one file per page
//! ```
//!
//! Filenames are escaped with [`escape_filename`]; `save_files` and `save`
//! go through the same function so a dry-run enumeration matches exactly
//! what `save` writes.

use anyhow::{Context, Result};
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::filter::filter_code;
use crate::json::{load_json, save_json};
use crate::models::{
    BackupData, BackupInfo, ExternalLink, InternalLink, InternalLinkNode, LinkKind, PageOrder,
};
use crate::progress::{ProgressEvent, ProgressReporter};

static URL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"https?://[^\s\]]+").unwrap());

/// One backup of a project, bound to the directory it persists under.
#[derive(Debug, Clone)]
pub struct Backup {
    project: String,
    directory: PathBuf,
    data: BackupData,
    info: Option<BackupInfo>,
}

impl Backup {
    pub fn new(
        project: impl Into<String>,
        directory: impl Into<PathBuf>,
        data: BackupData,
        info: Option<BackupInfo>,
    ) -> Self {
        Self {
            project: project.into(),
            directory: directory.into(),
            data,
            info,
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Export time of this backup, epoch seconds.
    pub fn timestamp(&self) -> i64 {
        self.data.exported
    }

    pub fn data(&self) -> &BackupData {
        &self.data
    }

    pub fn info(&self) -> Option<&BackupInfo> {
        self.info.as_ref()
    }

    /// All page titles, lexicographically ascending.
    pub fn page_titles(&self) -> Vec<String> {
        let mut titles: Vec<String> = self
            .data
            .pages
            .iter()
            .map(|page| page.title.clone())
            .collect();
        titles.sort();
        titles
    }

    /// Resolve every wiki-link reference on every page.
    ///
    /// Matching against page titles is case-insensitive and treats spaces
    /// and underscores alike; a hit resolves to the page's canonical stored
    /// title, a miss stays a free-text word. One entry per page, sorted by
    /// source page name; targets sorted by resolved name.
    pub fn internal_links(&self) -> Vec<InternalLink> {
        let titles: HashMap<String, String> = self
            .page_titles()
            .into_iter()
            .map(|title| (normalize_page_title(&title), title))
            .collect();
        let mut links: Vec<InternalLink> = self
            .data
            .pages
            .iter()
            .map(|page| {
                let mut targets: Vec<InternalLinkNode> = page
                    .links_lc
                    .iter()
                    .map(|link| match titles.get(&normalize_page_title(link)) {
                        Some(canonical) => InternalLinkNode {
                            name: canonical.clone(),
                            kind: LinkKind::Page,
                        },
                        None => InternalLinkNode {
                            name: link.clone(),
                            kind: LinkKind::Word,
                        },
                    })
                    .collect();
                targets.sort_by(|a, b| a.name.cmp(&b.name));
                InternalLink {
                    source: InternalLinkNode {
                        name: page.title.clone(),
                        kind: LinkKind::Page,
                    },
                    targets,
                }
            })
            .collect();
        links.sort_by(|a, b| a.source.name.cmp(&b.source.name));
        links
    }

    /// Every absolute URL found in page text outside of code regions.
    ///
    /// Duplicate URLs merge into one entry whose locations keep scan order
    /// (pages in document order, lines ascending); the result is sorted by
    /// URL.
    pub fn external_links(&self) -> Vec<ExternalLink> {
        let mut links: Vec<ExternalLink> = Vec::new();
        let mut by_url: HashMap<String, usize> = HashMap::new();
        for page in &self.data.pages {
            for (line, location) in filter_code(page) {
                for found in URL.find_iter(&line) {
                    let url = found.as_str();
                    match by_url.get(url) {
                        Some(&index) => links[index].locations.push(location.clone()),
                        None => {
                            by_url.insert(url.to_string(), links.len());
                            links.push(ExternalLink {
                                url: url.to_string(),
                                locations: vec![location.clone()],
                            });
                        }
                    }
                }
            }
        }
        links.sort_by(|a, b| a.url.cmp(&b.url));
        links
    }

    /// Stable in-place reorder of the page list by creation time.
    pub fn sort_pages(&mut self, order: PageOrder) {
        match order {
            PageOrder::AsIs => {}
            PageOrder::CreatedAsc => self.data.pages.sort_by_key(|page| page.created),
            PageOrder::CreatedDesc => {
                self.data.pages.sort_by_key(|page| std::cmp::Reverse(page.created))
            }
        }
    }

    /// Every path `save` would write, without writing anything.
    pub fn save_files(&self) -> Vec<PathBuf> {
        let mut files = vec![self.backup_path()];
        if self.info.is_some() {
            files.push(self.info_path());
        }
        let page_directory = self.directory.join("pages");
        for page in &self.data.pages {
            files.push(page_directory.join(format!("{}.json", escape_filename(&page.title))));
        }
        files
    }

    /// Write the backup under its directory: the full document, the metadata
    /// sidecar if present, and one file per page.
    pub fn save(&self, reporter: &dyn ProgressReporter) -> Result<()> {
        let backup_path = self.backup_path();
        reporter.report(ProgressEvent::Save {
            path: backup_path.clone(),
        });
        save_json(&backup_path, &self.data)?;
        if let Some(info) = &self.info {
            let info_path = self.info_path();
            reporter.report(ProgressEvent::Save {
                path: info_path.clone(),
            });
            save_json(&info_path, info)?;
        }
        let page_directory = self.directory.join("pages");
        for page in &self.data.pages {
            let page_path =
                page_directory.join(format!("{}.json", escape_filename(&page.title)));
            reporter.report(ProgressEvent::Save {
                path: page_path.clone(),
            });
            save_json(&page_path, page)?;
        }
        Ok(())
    }

    /// Load a previously saved backup from `directory`.
    ///
    /// Returns `Ok(None)` when the primary file does not exist. A primary
    /// file that exists but fails validation is a hard error; the sidecar
    /// is optional.
    pub fn load(project: &str, directory: &Path) -> Result<Option<Backup>> {
        let backup_path = directory.join(format!("{}.json", escape_filename(project)));
        let data: Option<BackupData> = load_json(&backup_path)
            .with_context(|| format!("Failed to load backup for project '{}'", project))?;
        let Some(data) = data else {
            return Ok(None);
        };
        let info: Option<BackupInfo> =
            load_json(&backup_path.with_extension("info.json"))?;
        Ok(Some(Backup::new(project, directory, data, info)))
    }

    fn backup_path(&self) -> PathBuf {
        self.directory
            .join(format!("{}.json", escape_filename(&self.project)))
    }

    fn info_path(&self) -> PathBuf {
        self.backup_path().with_extension("info.json")
    }
}

/// Escape a project or page title for use as a filename.
///
/// Single left-to-right translation: space to `_`, `#` to `%23`, `%` to
/// `%25`, `/` to `%2F`. This is a de facto on-disk format; the exporter
/// relies on it when resolving `<project>.json` inside historical commits.
pub fn escape_filename(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            ' ' => escaped.push('_'),
            '#' => escaped.push_str("%23"),
            '%' => escaped.push_str("%25"),
            '/' => escaped.push_str("%2F"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Normalization used for internal link matching: lowercase with spaces as
/// underscores. Nothing else — punctuation is left as stored.
fn normalize_page_title(title: &str) -> String {
    title.to_lowercase().replace(' ', "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LineContent, Location, Page};

    fn page(title: &str, created: i64, lines: &[&str], links_lc: &[&str]) -> Page {
        Page {
            title: title.to_string(),
            created,
            updated: created,
            id: None,
            lines: lines
                .iter()
                .map(|line| LineContent::Text(line.to_string()))
                .collect(),
            links_lc: links_lc.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn backup(pages: Vec<Page>) -> Backup {
        Backup::new(
            "proj",
            PathBuf::from("/tmp/unused"),
            BackupData {
                name: "proj".to_string(),
                display_name: "Proj".to_string(),
                exported: 1600000000,
                pages,
            },
            None,
        )
    }

    #[test]
    fn test_page_titles_sorted() {
        let backup = backup(vec![
            page("zebra", 0, &[], &[]),
            page("Alpha", 0, &[], &[]),
            page("beta", 0, &[], &[]),
        ]);
        // Byte order: uppercase sorts before lowercase.
        assert_eq!(backup.page_titles(), vec!["Alpha", "beta", "zebra"]);
    }

    #[test]
    fn test_internal_links_resolve_to_canonical_title() {
        let backup = backup(vec![
            page("Rust Lang", 0, &[], &[]),
            page("notes", 0, &[], &["rust lang", "rust_lang", "missing page"]),
        ]);
        let links = backup.internal_links();
        // Sorted by source name: "Rust Lang" before "notes".
        assert_eq!(links[0].source.name, "Rust Lang");
        assert!(links[0].targets.is_empty());
        assert_eq!(links[1].source.name, "notes");
        let targets = &links[1].targets;
        assert_eq!(targets.len(), 3);
        // Both spellings resolve to the canonical stored title.
        assert_eq!(targets[0].name, "Rust Lang");
        assert_eq!(targets[0].kind, LinkKind::Page);
        assert_eq!(targets[1].name, "Rust Lang");
        assert_eq!(targets[1].kind, LinkKind::Page);
        assert_eq!(targets[2].name, "missing page");
        assert_eq!(targets[2].kind, LinkKind::Word);
    }

    #[test]
    fn test_internal_links_source_order_matches_sorted_titles() {
        let backup = backup(vec![
            page("c", 0, &[], &[]),
            page("a", 0, &[], &[]),
            page("b", 0, &[], &[]),
        ]);
        let sources: Vec<String> = backup
            .internal_links()
            .into_iter()
            .map(|link| link.source.name)
            .collect();
        assert_eq!(sources, backup.page_titles());
    }

    #[test]
    fn test_external_links_merge_duplicates_in_scan_order() {
        let backup = backup(vec![
            page("one", 0, &["see https://example.com/x now"], &[]),
            page("two", 0, &["intro", "again https://example.com/x"], &[]),
        ]);
        let links = backup.external_links();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://example.com/x");
        assert_eq!(
            links[0].locations,
            vec![
                Location {
                    title: "one".to_string(),
                    line: 0
                },
                Location {
                    title: "two".to_string(),
                    line: 1
                },
            ]
        );
    }

    #[test]
    fn test_external_links_sorted_by_url() {
        let backup = backup(vec![page(
            "p",
            0,
            &["https://z.example.com then https://a.example.com"],
            &[],
        )]);
        let urls: Vec<String> = backup
            .external_links()
            .into_iter()
            .map(|link| link.url)
            .collect();
        assert_eq!(urls, vec!["https://a.example.com", "https://z.example.com"]);
    }

    #[test]
    fn test_external_links_skip_code_block() {
        let backup = backup(vec![page(
            "p",
            0,
            &[
                "code:js",
                "\tfetch('http://hidden.example.com')",
                "done",
                "see http://example.com",
            ],
            &[],
        )]);
        let links = backup.external_links();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "http://example.com");
        assert_eq!(links[0].locations[0].line, 3);
    }

    #[test]
    fn test_external_link_stops_at_bracket() {
        let backup = backup(vec![page("p", 0, &["[https://example.com title]"], &[])]);
        let links = backup.external_links();
        assert_eq!(links[0].url, "https://example.com");
    }

    #[test]
    fn test_sort_pages_created_desc() {
        let mut backup = backup(vec![
            page("a", 10, &[], &[]),
            page("b", 30, &[], &[]),
            page("c", 20, &[], &[]),
        ]);
        backup.sort_pages(PageOrder::CreatedDesc);
        let created: Vec<i64> = backup.data().pages.iter().map(|p| p.created).collect();
        assert_eq!(created, vec![30, 20, 10]);
    }

    #[test]
    fn test_sort_pages_as_is_keeps_order() {
        let mut backup = backup(vec![
            page("a", 10, &[], &[]),
            page("b", 30, &[], &[]),
            page("c", 20, &[], &[]),
        ]);
        backup.sort_pages(PageOrder::AsIs);
        let titles: Vec<&str> = backup.data().pages.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_sort_pages_stable_on_ties() {
        let mut backup = backup(vec![
            page("first", 10, &[], &[]),
            page("second", 10, &[], &[]),
            page("third", 5, &[], &[]),
        ]);
        backup.sort_pages(PageOrder::CreatedAsc);
        let titles: Vec<&str> = backup.data().pages.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["third", "first", "second"]);
    }

    #[test]
    fn test_escape_filename() {
        assert_eq!(escape_filename("A/B #1"), "A%2FB_%231");
        assert_eq!(escape_filename("50%"), "50%25");
        assert_eq!(escape_filename("plain"), "plain");
    }

    #[test]
    fn test_escape_filename_is_single_pass() {
        // '%' introduced by an escape must not be re-escaped.
        assert_eq!(escape_filename("#"), "%23");
        assert_eq!(escape_filename("%23"), "%2523");
    }

    #[test]
    fn test_save_files_lists_every_target() {
        let mut backup = backup(vec![page("A/B #1", 0, &[], &[])]);
        backup.info = Some(BackupInfo {
            id: "x".to_string(),
            backuped: 1,
            total_pages: None,
            total_links: None,
        });
        let files = backup.save_files();
        assert_eq!(
            files,
            vec![
                PathBuf::from("/tmp/unused/proj.json"),
                PathBuf::from("/tmp/unused/proj.info.json"),
                PathBuf::from("/tmp/unused/pages/A%2FB_%231.json"),
            ]
        );
    }
}
