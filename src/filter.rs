//! Code-aware line filter for link scanning.
//!
//! Scrapbox pages mix prose with code: fenced blocks opened by a
//! `code:<name>` line and spanning every following line indented deeper,
//! shell-prompt lines (`$ ...` / `% ...`), and inline back-quoted spans.
//! URLs inside any of these must not be treated as links, so this filter
//! yields only the scannable text, paired with each line's position in the
//! original, unfiltered line sequence.

use regex::Regex;
use std::sync::LazyLock;

use crate::models::{Location, Page};

static CODE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<indent>[\t ]*)code:.+").unwrap());
static CLI_NOTATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\t ]*[$%] .+").unwrap());
static CODE_SPAN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`[^`]*`").unwrap());

/// Yield the lines of `page` usable for link scanning.
///
/// Single pass over the page, carrying one piece of state: the indent level
/// of the currently open code block, if any. A line whose indent is less
/// than or equal to the block's opening indent ends the block and is then
/// classified like any other line. Inline code spans are replaced by a
/// single space so adjacent text does not fuse into one token.
pub fn filter_code(page: &Page) -> Vec<(String, Location)> {
    let mut filtered = Vec::new();
    let mut code_block_indent_level: Option<usize> = None;

    for (index, line) in page.line_texts().enumerate() {
        if let Some(level) = code_block_indent_level {
            if indent_level(line) <= level {
                // Block ended; this line is still a candidate.
                code_block_indent_level = None;
            } else {
                continue;
            }
        }
        if let Some(captures) = CODE_BLOCK.captures(line) {
            code_block_indent_level = Some(captures["indent"].chars().count());
            continue;
        }
        if CLI_NOTATION.is_match(line) {
            continue;
        }
        let text = CODE_SPAN.replace_all(line, " ").into_owned();
        filtered.push((
            text,
            Location {
                title: page.title.clone(),
                line: index,
            },
        ));
    }
    filtered
}

fn indent_level(line: &str) -> usize {
    line.chars().take_while(|c| *c == '\t' || *c == ' ').count()
}
