//! Numbered heading extraction from a generated outline.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

/// Default cap on recovered headings. Each heading costs one remote call.
pub const HEADINGS_MAX: usize = 8;

fn heading_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\d+)(?:\.\d+)*\.?\s+(.+)$").expect("heading pattern is valid")
    })
}

/// Recover numbered headings from outline text.
///
/// A line counts when it starts with an integer, optionally followed by
/// dotted sub-numbers, then whitespace and a label. Leading Markdown `#`
/// markers are ignored. Each hit is reported as `"<leading number>. <label>"`,
/// duplicates keep their first position, and at most `max` are returned.
#[must_use]
pub fn extract_headings(outline: &str, max: usize) -> Vec<String> {
    let re = heading_pattern();
    let mut seen = HashSet::new();
    let mut headings = Vec::new();

    for line in outline.lines() {
        let line = line.trim().trim_start_matches('#').trim_start();
        let Some(caps) = re.captures(line) else {
            continue;
        };
        let heading = format!("{}. {}", &caps[1], caps[2].trim());
        if seen.insert(heading.clone()) {
            headings.push(heading);
        }
        if headings.len() == max {
            break;
        }
    }

    headings
}
