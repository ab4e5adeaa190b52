//! Critic feedback parsing.
//!
//! The critic is asked to answer either with the sentinel `STATUS: OK` or
//! with ISSUE/WHY/FIX/BLOCKER blocks. Model output drifts from that grammar,
//! so parsing is lossy: fragments that match no label are dropped instead of
//! failing the run.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Reviewer verdict meaning "no blocking issues".
pub const SENTINEL: &str = "STATUS: OK";

const ISSUE_MARKER: &str = "ISSUE:";

/// One structured remark from the critic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackItem {
    pub issue: String,
    pub why: String,
    pub fix: String,
    /// Serialized as lowercase `"yes"` / `"no"`.
    #[serde(serialize_with = "blocker_to_str", deserialize_with = "blocker_from_str")]
    pub blocker: bool,
}

impl FeedbackItem {
    /// Normalized blocker label.
    #[must_use]
    pub fn blocker_label(&self) -> &'static str {
        if self.blocker {
            "yes"
        } else {
            "no"
        }
    }
}

fn blocker_to_str<S: Serializer>(blocker: &bool, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(if *blocker { "yes" } else { "no" })
}

fn blocker_from_str<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    let raw = String::deserialize(d)?;
    Ok(normalize_blocker(&raw))
}

/// Map a free-text BLOCKER value onto one of the two normalized values.
fn normalize_blocker(raw: &str) -> bool {
    let value = raw.trim().to_lowercase();
    matches!(value.as_str(), "yes" | "y" | "true" | "да")
        || value.starts_with("yes")
        || value.starts_with("да")
}

/// True when the critique is exactly the sentinel, ignoring surrounding
/// whitespace.
#[must_use]
pub fn is_sentinel(critique: &str) -> bool {
    critique.trim() == SENTINEL
}

struct LabelPatterns {
    issue: Regex,
    why: Regex,
    fix: Regex,
    blocker: Regex,
}

fn patterns() -> &'static LabelPatterns {
    static PATTERNS: OnceLock<LabelPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let label =
            |name: &str| Regex::new(&format!(r"{name}:[ \t]*(.*)")).expect("label pattern is valid");
        LabelPatterns {
            issue: label("ISSUE"),
            why: label("WHY"),
            fix: label("FIX"),
            blocker: label("BLOCKER"),
        }
    })
}

fn first_capture(re: &Regex, block: &str) -> Option<String> {
    re.captures(block)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// Split cleaned critique lines into blocks, one per `ISSUE:` line.
///
/// Lines before the first `ISSUE:` form their own leading block.
fn split_blocks(text: &str) -> Vec<String> {
    let mut blocks: Vec<Vec<&str>> = Vec::new();
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if line.starts_with(ISSUE_MARKER) || blocks.is_empty() {
            blocks.push(Vec::new());
        }
        if let Some(current) = blocks.last_mut() {
            current.push(line);
        }
    }
    blocks.into_iter().map(|b| b.join("\n")).collect()
}

/// Parse critic output into feedback items.
///
/// Returns an empty list for empty input or the sentinel.
#[must_use]
pub fn parse_feedback(critique: &str) -> Vec<FeedbackItem> {
    if critique.trim().is_empty() || is_sentinel(critique) {
        return Vec::new();
    }

    let p = patterns();
    split_blocks(critique)
        .iter()
        .filter_map(|block| {
            let issue = first_capture(&p.issue, block);
            let why = first_capture(&p.why, block);
            let fix = first_capture(&p.fix, block);
            let blocker = first_capture(&p.blocker, block);

            if issue.is_none() && why.is_none() && fix.is_none() && blocker.is_none() {
                return None;
            }

            Some(FeedbackItem {
                issue: issue.unwrap_or_default(),
                why: why.unwrap_or_default(),
                fix: fix.unwrap_or_default(),
                blocker: blocker.as_deref().map(normalize_blocker).unwrap_or(false),
            })
        })
        .collect()
}
