//! Terminal result of one pipeline run.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::feedback::FeedbackItem;
use crate::message::ConversationLog;

/// Final verdict of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewStatus {
    /// The critic's last verdict was the sentinel, or the template fallback ran
    Approved,
    /// The critic still reported issues after the revision round
    NeedsReview,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Approved => "APPROVED",
            ReviewStatus::NeedsReview => "NEEDS_REVIEW",
        }
    }

    /// Short label used for version file names.
    pub fn version_label(&self) -> &'static str {
        match self {
            ReviewStatus::Approved => "approved",
            ReviewStatus::NeedsReview => "draft",
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewOutcome {
    pub status: ReviewStatus,
    pub final_text: String,
    pub conversation: ConversationLog,
    pub feedback_items: Vec<FeedbackItem>,
    /// The remote path failed and the template generator produced the text
    pub used_fallback: bool,
}

impl ReviewOutcome {
    #[must_use]
    pub fn is_approved(&self) -> bool {
        self.status == ReviewStatus::Approved
    }

    /// Format as a summary string.
    #[must_use]
    pub fn format_summary(&self) -> String {
        let mut summary = format!("[{}] Review completed\n", self.status);
        summary.push_str(&format!("  Conversation turns: {}\n", self.conversation.len()));
        summary.push_str(&format!("  Feedback items: {}\n", self.feedback_items.len()));

        let blockers = self.feedback_items.iter().filter(|i| i.blocker).count();
        if blockers > 0 {
            summary.push_str(&format!("  Blockers raised: {}\n", blockers));
        }
        if self.used_fallback {
            summary.push_str("  Remote generation unavailable, local template draft used\n");
        }
        summary.push_str(&format!(
            "  Final text: {} lines\n",
            self.final_text.lines().count()
        ));
        summary
    }
}
