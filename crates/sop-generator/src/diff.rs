//! Unified diff between two versions' text.

use similar::TextDiff;

/// Line-based unified diff with `---`/`+++` headers.
///
/// Identical inputs produce an empty string.
pub fn unified_diff(old: &str, new: &str, old_label: &str, new_label: &str) -> String {
    TextDiff::from_lines(old, new)
        .unified_diff()
        .context_radius(3)
        .header(old_label, new_label)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_texts_have_no_diff() {
        assert_eq!(unified_diff("a\nb\n", "a\nb\n", "v1", "v2"), "");
    }

    #[test]
    fn test_changed_line_is_reported() {
        let diff = unified_diff("# Scope\nold\n", "# Scope\nnew\n", "v1", "v2");
        assert!(diff.starts_with("--- v1\n+++ v2\n"));
        assert!(diff.contains("-old\n"));
        assert!(diff.contains("+new\n"));
        assert!(diff.contains(" # Scope\n"));
    }
}
