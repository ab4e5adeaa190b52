//! Clean generator output before it is stored or rendered.
//!
//! Writers tend to echo the prompt metadata and sprinkle HTML layout tags
//! into Markdown. Both are removed here; content lines are left untouched.

use std::sync::OnceLock;

use regex::{Regex, RegexSet};

struct Cleaners {
    empty_div: Regex,
    line_break: Regex,
    any_tag: Regex,
    setext_underline: Regex,
    blank_runs: Regex,
    meta_lines: RegexSet,
}

fn cleaners() -> &'static Cleaners {
    static CLEANERS: OnceLock<Cleaners> = OnceLock::new();
    CLEANERS.get_or_init(|| Cleaners {
        empty_div: Regex::new(r"(?i)<div[^>]*>\s*</div>").expect("valid pattern"),
        line_break: Regex::new(r"(?i)<br\s*/?>").expect("valid pattern"),
        any_tag: Regex::new(r"<[^>]+>").expect("valid pattern"),
        setext_underline: Regex::new(r"^[=-]{3,}\s*$").expect("valid pattern"),
        blank_runs: Regex::new(r"\n{3,}").expect("valid pattern"),
        meta_lines: RegexSet::new([
            r"(?i)^\s*\*\*?СТАНДАРТНАЯ ОПЕРАЦИОННАЯ ПРОЦЕДУРА\*\*?\s*$",
            r"(?i)^\s*\*\*?Номер:\*\*?.*$",
            r"(?i)^\s*\*\*?Тип оборудования:\*\*?.*$",
            r"(?i)^\s*\*\*?Тип содержимого:\*\*?.*$",
            r"(?i)^\s*\*\*?Страница:\*\*?.*$",
            r"(?i)^\s*\*\*?Шрифт:\*\*?.*$",
            r"(?i)^\s*Номер:\s*.*$",
            r"(?i)^\s*Тип оборудования:\s*.*$",
            r"(?i)^\s*Тип содержимого:\s*.*$",
            r"(?i)^\s*Страница:\s*.*$",
            r"(?i)^\s*Шрифт:\s*.*$",
        ])
        .expect("valid patterns"),
    })
}

/// Strip HTML noise and echoed metadata lines from generated Markdown.
#[must_use]
pub fn sanitize_markdown(markdown: &str) -> String {
    if markdown.is_empty() {
        return String::new();
    }
    let c = cleaners();

    let cleaned = c.empty_div.replace_all(markdown, "");
    let cleaned = c.line_break.replace_all(&cleaned, "\n");
    let cleaned = c.any_tag.replace_all(&cleaned, "");

    let mut kept: Vec<&str> = Vec::new();
    let mut prev_was_meta = false;
    for line in cleaned.lines() {
        if c.meta_lines.is_match(line) {
            prev_was_meta = true;
            continue;
        }
        // A setext underline directly under a dropped meta line goes with it.
        if prev_was_meta && c.setext_underline.is_match(line) {
            prev_was_meta = false;
            continue;
        }
        prev_was_meta = false;
        kept.push(line);
    }

    c.blank_runs.replace_all(&kept.join("\n"), "\n\n").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removes_html_layout_tags() {
        let md = "Intro<br>Next<div style=\"page-break-after: always\"></div>\n<b>bold</b>";
        assert_eq!(sanitize_markdown(md), "Intro\nNext\nbold");
    }

    #[test]
    fn test_drops_meta_lines_and_their_underline() {
        let md = "**СТАНДАРТНАЯ ОПЕРАЦИОННАЯ ПРОЦЕДУРА**\n===\n# 1. Scope\nНомер: 42\nText";
        assert_eq!(sanitize_markdown(md), "# 1. Scope\nText");
    }

    #[test]
    fn test_underline_without_meta_is_kept() {
        let md = "Heading\n---\nbody";
        assert_eq!(sanitize_markdown(md), md);
    }

    #[test]
    fn test_collapses_blank_runs() {
        assert_eq!(sanitize_markdown("a\n\n\n\nb"), "a\n\nb");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(sanitize_markdown(""), "");
    }
}
