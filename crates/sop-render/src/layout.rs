//! Single-pass layout of structured text into document blocks.

use std::sync::OnceLock;

use regex::Regex;

use crate::heading::HeadingCounters;
use crate::metadata::Labels;

/// Heading levels that get a distinct visual style.
pub const HEADING_STYLES_MAX: usize = 3;

/// One block of document content, independent of the container format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Numbered, centred, bold heading. `level` is the style level (1 to 3).
    Heading { level: usize, text: String },
    /// Unnumbered section heading used in front matter.
    SectionTitle(String),
    /// Centred run at a given point size.
    Centered { text: String, size_pt: u32, bold: bool },
    /// Centred italic caption.
    Caption(String),
    /// Rows of cells, header first.
    Table(Vec<Vec<String>>),
    /// Image reference; resolved when the container is written.
    Image { path: String },
    ListItem { ordered: bool, text: String },
    /// Plain paragraph; empty text is a blank line.
    Paragraph(String),
    PageBreak,
}

/// Per-render counters.
#[derive(Debug, Clone, Default)]
pub struct RenderModel {
    pub headings: HeadingCounters,
    pub tables: u32,
    pub figures: u32,
}

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("layout pattern is valid"))
}

fn heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"^(#{1,6})\s+(.*)$")
}

fn number_prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"^\d+(?:\.\d+)*\.?\s+")
}

fn separator_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // A single column needs its leading pipe so a bare `---` rule never matches.
    regex(
        &RE,
        r"^\s*(?:\|\s*:?-+:?\s*(?:\|\s*:?-+:?\s*)*\|?|:?-+:?\s*(?:\|\s*:?-+:?\s*)+\|?)\s*$",
    )
}

fn figure_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"^!\[(.*?)\]\((.*?)\)$")
}

fn bullet_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"^\s*[-*]\s+")
}

fn ordered_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"^\s*\d+[.)]\s+")
}

fn footnote_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"^\[\^\d+\]:")
}

/// True for a table separator row such as `|---|:--:|` or `|---|`.
pub fn is_table_separator(line: &str) -> bool {
    separator_re().is_match(line)
}

fn table_cells(line: &str) -> Vec<String> {
    line.trim()
        .trim_matches('|')
        .split('|')
        .map(|c| c.trim().to_string())
        .collect()
}

/// Lay out `text` into blocks.
pub fn layout(text: &str, labels: &Labels) -> Vec<Block> {
    let lines: Vec<&str> = text.lines().collect();
    let mut model = RenderModel::default();
    let mut blocks = Vec::with_capacity(lines.len());

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];

        if let Some(caps) = heading_re().captures(line) {
            let depth = caps[1].len();
            model.headings = model.headings.next(depth);
            let title = number_prefix_re().replace(caps[2].trim(), "");
            blocks.push(Block::Heading {
                level: depth.min(HEADING_STYLES_MAX),
                text: format!("{}. {}", model.headings.number(), title),
            });
            i += 1;
            continue;
        }

        if line.trim_start().starts_with('|')
            && lines.get(i + 1).is_some_and(|next| is_table_separator(next))
        {
            let mut rows = vec![table_cells(line)];
            i += 2;
            while let Some(row) = lines.get(i).filter(|l| l.trim_start().starts_with('|')) {
                rows.push(table_cells(row));
                i += 1;
            }
            model.tables += 1;
            let first_header = rows[0].first().cloned().unwrap_or_default();
            blocks.push(Block::Table(rows));
            blocks.push(Block::Caption(format!(
                "{} {}: {}",
                labels.table, model.tables, first_header
            )));
            continue;
        }

        if let Some(caps) = figure_re().captures(line) {
            model.figures += 1;
            blocks.push(Block::Image {
                path: caps[2].to_string(),
            });
            blocks.push(Block::Caption(format!(
                "{} {}: {}",
                labels.figure, model.figures, &caps[1]
            )));
            i += 1;
            continue;
        }

        if let Some(m) = bullet_re().find(line) {
            blocks.push(Block::ListItem {
                ordered: false,
                text: line[m.end()..].trim().to_string(),
            });
        } else if let Some(m) = ordered_re().find(line) {
            blocks.push(Block::ListItem {
                ordered: true,
                text: line[m.end()..].to_string(),
            });
        } else if footnote_re().is_match(line) {
            blocks.push(Block::Paragraph(line.to_string()));
        } else if line.trim().is_empty() {
            blocks.push(Block::Paragraph(String::new()));
        } else {
            blocks.push(Block::Paragraph(line.to_string()));
        }
        i += 1;
    }

    blocks
}
