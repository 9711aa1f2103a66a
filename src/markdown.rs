//! Line-oriented Markdown parsing.
//!
//! Only the subset used by verification reports is recognised: headings, bullet and
//! numbered lists, pipe tables, image embeds, horizontal rules and paragraphs. Each
//! source line becomes at most one [`Block`]; table separator rows produce none.
//! Inline emphasis, code spans and links are reduced to their plain text.

use regex::Regex;
use std::sync::LazyLock;

static IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^!\[([^\]]*)\]\(([^)]+)\)").expect("valid image regex"));
static ORDERED_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)[.)]\s+(.*)$").expect("valid list regex"));
static LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\([^)]*\)").expect("valid link regex"));
static STRONG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*|__(.+?)__").expect("valid strong regex"));
static EMPHASIS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\*([^*\s](?:[^*]*[^*\s])?)\*").expect("valid emphasis regex")
});
static CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`]+)`").expect("valid code regex"));

/// An `![alt](path)` embed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub alt: String,
    pub path: String,
}

impl ImageRef {
    /// Text shown in place of the image when it cannot be drawn.
    pub fn label(&self) -> &str {
        if self.alt.is_empty() {
            &self.path
        } else {
            &self.alt
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListMarker {
    Bullet,
    Number(u32),
}

/// One classified unit of the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading {
        level: u8,
        text: String,
    },
    ListItem {
        marker: ListMarker,
        /// Nesting level from indentation, 0 for top-level items
        depth: usize,
        text: String,
    },
    TableRow(Vec<String>),
    Paragraph(String),
    Image(ImageRef),
    Rule,
    Blank,
}

/// Classify every line of `source`, in order.
pub fn parse(source: &str) -> Vec<Block> {
    source.lines().filter_map(classify).collect()
}

/// Classify a single line. Returns `None` for lines that render nothing.
pub fn classify(line: &str) -> Option<Block> {
    let trimmed = line.trim();

    if trimmed.is_empty() {
        return Some(Block::Blank);
    }
    if let Some(heading) = heading(trimmed) {
        return Some(heading);
    }
    if trimmed.starts_with("![") {
        return Some(match image(trimmed) {
            Some(image) => Block::Image(image),
            None => Block::Paragraph(strip_inline(trimmed)),
        });
    }
    if trimmed.starts_with('|') && trimmed[1..].contains('|') {
        let cells = table_cells(trimmed);
        if is_separator_row(&cells) {
            return None;
        }
        return Some(Block::TableRow(
            cells.iter().map(|cell| strip_inline(cell)).collect(),
        ));
    }
    if is_rule(trimmed) {
        return Some(Block::Rule);
    }
    if let Some(item) = list_item(line, trimmed) {
        return Some(item);
    }
    Some(Block::Paragraph(strip_inline(trimmed)))
}

fn heading(trimmed: &str) -> Option<Block> {
    let level = trimmed.chars().take_while(|c| *c == '#').count();
    if !(1..=6).contains(&level) {
        return None;
    }
    let rest = &trimmed[level..];
    if !rest.starts_with(' ') {
        return None;
    }
    Some(Block::Heading {
        level: level as u8,
        text: strip_inline(rest.trim()),
    })
}

fn image(trimmed: &str) -> Option<ImageRef> {
    let captures = IMAGE.captures(trimmed)?;
    // `![alt](path "title")`: keep only the path
    let target = captures[2].trim();
    let path = target
        .split_whitespace()
        .next()
        .unwrap_or(target)
        .trim_start_matches('<')
        .trim_end_matches('>');
    if path.is_empty() {
        return None;
    }
    Some(ImageRef {
        alt: captures[1].trim().to_string(),
        path: path.to_string(),
    })
}

fn table_cells(trimmed: &str) -> Vec<String> {
    trimmed
        .trim_matches('|')
        .split('|')
        .map(|cell| cell.trim().to_string())
        .collect()
}

fn is_separator_row(cells: &[String]) -> bool {
    cells
        .iter()
        .all(|cell| !cell.is_empty() && cell.chars().all(|c| c == '-' || c == ':'))
}

fn is_rule(trimmed: &str) -> bool {
    let compact: String = trimmed.chars().filter(|c| !c.is_whitespace()).collect();
    compact.len() >= 3
        && ['-', '*', '_']
            .iter()
            .any(|marker| compact.chars().all(|c| c == *marker))
}

fn list_item(line: &str, trimmed: &str) -> Option<Block> {
    let indent: usize = line
        .chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum();
    let depth = indent / 2;

    for bullet in ["- ", "* ", "+ "] {
        if let Some(text) = trimmed.strip_prefix(bullet) {
            return Some(Block::ListItem {
                marker: ListMarker::Bullet,
                depth,
                text: strip_inline(text.trim()),
            });
        }
    }

    let captures = ORDERED_ITEM.captures(trimmed)?;
    let number = captures[1].parse().ok()?;
    Some(Block::ListItem {
        marker: ListMarker::Number(number),
        depth,
        text: strip_inline(captures[2].trim()),
    })
}

/// Reduce inline markup to plain text.
pub fn strip_inline(text: &str) -> String {
    let text = LINK.replace_all(text, "$1");
    let text = CODE.replace_all(&text, "$1");
    let text = STRONG.replace_all(&text, "$1$2");
    let text = EMPHASIS.replace_all(&text, "$1");
    text.into_owned()
}
