//! Author/critic orchestration.
//!
//! Implements the outline → sections → critique → revision → re-critique
//! flow. Every remote call goes through the tiered transport; if the
//! transport gives up, the run switches to the template generator and
//! still returns a usable document.

use std::time::Duration;

use sop_core::{
    extract_headings, is_sentinel, parse_feedback, template, ChatMessage, ConversationLog,
    FeedbackItem, GenerationRequest, ReviewOutcome, ReviewStatus, Speaker, HEADINGS_MAX, SENTINEL,
};
use sop_transport::{
    ChatBackend, ClientConfig, GenerationUnavailable, HttpBackend, SecretStore, TransportClient,
};

use crate::prompt::PromptBuilder;

/// Writer turn recorded when the template generator replaces the remote draft.
pub const FALLBACK_WRITER_NOTE: &str = "Локальный генератор сформировал черновик SOP (без LLM).";

/// Output budget and read timeout for one kind of call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallBudget {
    pub max_tokens: u32,
    pub read_timeout: Duration,
}

impl CallBudget {
    pub const fn new(max_tokens: u32, read_timeout_secs: u64) -> Self {
        Self {
            max_tokens,
            read_timeout: Duration::from_secs(read_timeout_secs),
        }
    }
}

/// Generator configuration.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Headings-only outline request
    pub outline: CallBudget,
    /// Single-shot draft when the outline yields no headings
    pub full_draft: CallBudget,
    /// One isolated section
    pub section: CallBudget,
    /// First critique
    pub critique: CallBudget,
    /// Full revision after a critique with issues
    pub revision: CallBudget,
    /// Short critique of the revision
    pub final_critique: CallBudget,
    /// Most sections drafted individually
    pub headings_max: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            outline: CallBudget::new(400, 120),
            full_draft: CallBudget::new(1500, 180),
            section: CallBudget::new(700, 150),
            critique: CallBudget::new(500, 120),
            revision: CallBudget::new(1500, 180),
            final_critique: CallBudget::new(200, 90),
            headings_max: HEADINGS_MAX,
        }
    }
}

impl GeneratorConfig {
    /// Quick config for fast iteration.
    ///
    /// Besides smaller budgets it drafts at most 5 sections instead of the
    /// default [`HEADINGS_MAX`] (8); later outline headings are dropped.
    pub fn quick() -> Self {
        Self {
            outline: CallBudget::new(300, 60),
            full_draft: CallBudget::new(1000, 90),
            section: CallBudget::new(400, 60),
            critique: CallBudget::new(300, 60),
            revision: CallBudget::new(1000, 90),
            final_critique: CallBudget::new(150, 45),
            headings_max: 5,
        }
    }

    /// Thorough config for production documents.
    pub fn thorough() -> Self {
        Self {
            full_draft: CallBudget::new(3000, 300),
            section: CallBudget::new(1200, 240),
            critique: CallBudget::new(800, 180),
            revision: CallBudget::new(3000, 300),
            ..Default::default()
        }
    }
}

/// Result of the remote path when every call succeeded.
struct RemoteDraft {
    status: ReviewStatus,
    text: String,
    feedback_items: Vec<FeedbackItem>,
}

/// Author/critic SOP generator.
pub struct SopGenerator<B = HttpBackend> {
    client: TransportClient<B>,
    config: GeneratorConfig,
}

impl SopGenerator<HttpBackend> {
    /// Generator over the HTTP transport, configured from secrets and environment.
    pub fn from_env(secrets: &SecretStore, config: GeneratorConfig) -> Self {
        let client = TransportClient::http(ClientConfig::from_env(secrets));
        Self::new(client, config)
    }
}

impl<B: ChatBackend> SopGenerator<B> {
    pub fn new(client: TransportClient<B>, config: GeneratorConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn client(&self) -> &TransportClient<B> {
        &self.client
    }

    /// Run the pipeline for `request`. Never fails.
    ///
    /// Remote calls are made one at a time, in order. If the transport gives
    /// up at any point, the text comes from the template generator and the
    /// outcome is marked `used_fallback`.
    pub async fn run(&self, request: &GenerationRequest) -> ReviewOutcome {
        let prompt = PromptBuilder::generation_prompt(request);
        let mut conversation = ConversationLog::new();
        conversation.push(Speaker::User, prompt.as_str());

        match self.remote(&prompt, &mut conversation).await {
            Ok(draft) => {
                tracing::info!(status = %draft.status, feedback = draft.feedback_items.len(), "review finished");
                ReviewOutcome {
                    status: draft.status,
                    final_text: draft.text,
                    conversation,
                    feedback_items: draft.feedback_items,
                    used_fallback: false,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "remote generation unavailable, using template draft");
                conversation.push(Speaker::System, format!("LLM error: {e}"));
                conversation.push(Speaker::Writer, FALLBACK_WRITER_NOTE);
                conversation.push(Speaker::Critic, SENTINEL);
                ReviewOutcome {
                    status: ReviewStatus::Approved,
                    final_text: template::generate(request.fields()),
                    conversation,
                    feedback_items: Vec::new(),
                    used_fallback: true,
                }
            }
        }
    }

    async fn remote(
        &self,
        prompt: &str,
        conversation: &mut ConversationLog,
    ) -> Result<RemoteDraft, GenerationUnavailable> {
        let writer = PromptBuilder::writer_system();
        let critic = PromptBuilder::critic_system();

        let outline = self
            .ask(writer, PromptBuilder::outline_prompt(prompt), self.config.outline)
            .await?;
        conversation.push(Speaker::Writer, outline.as_str());
        let headings = extract_headings(&outline, self.config.headings_max);
        tracing::debug!(headings = headings.len(), "outline parsed");

        let draft = if headings.is_empty() {
            let draft = self
                .ask(writer, prompt.to_string(), self.config.full_draft)
                .await?;
            conversation.push(Speaker::Writer, draft.as_str());
            draft
        } else {
            let mut parts = Vec::with_capacity(headings.len());
            for heading in &headings {
                let part = self
                    .ask(writer, PromptBuilder::section_prompt(heading), self.config.section)
                    .await?;
                conversation.push(Speaker::Writer, part.as_str());
                parts.push(part);
            }
            parts.join("\n\n")
        };

        let critique = self
            .ask(critic, PromptBuilder::critique_prompt(&draft), self.config.critique)
            .await?;
        conversation.push(Speaker::Critic, critique.as_str());

        if is_sentinel(&critique) {
            return Ok(RemoteDraft {
                status: ReviewStatus::Approved,
                text: draft,
                feedback_items: Vec::new(),
            });
        }

        let feedback_items = parse_feedback(&critique);
        let revision = self
            .ask(
                writer,
                PromptBuilder::revision_prompt(prompt, &critique),
                self.config.revision,
            )
            .await?;
        conversation.push(Speaker::Writer, revision.as_str());

        let verdict = self
            .ask(
                critic,
                PromptBuilder::final_critique_prompt(&revision),
                self.config.final_critique,
            )
            .await?;
        conversation.push(Speaker::Critic, verdict.as_str());

        let status = if is_sentinel(&verdict) {
            ReviewStatus::Approved
        } else {
            ReviewStatus::NeedsReview
        };
        let text = if revision.trim().is_empty() { draft } else { revision };

        Ok(RemoteDraft {
            status,
            text,
            feedback_items,
        })
    }

    /// One two-message call: system role plus a single user instruction.
    async fn ask(
        &self,
        system: &str,
        user: String,
        budget: CallBudget,
    ) -> Result<String, GenerationUnavailable> {
        let conversation = [ChatMessage::system(system), ChatMessage::user(user)];
        self.client
            .call(&conversation, budget.max_tokens, budget.read_timeout)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_budgets() {
        let config = GeneratorConfig::default();
        assert_eq!(config.outline, CallBudget::new(400, 120));
        assert_eq!(config.full_draft, CallBudget::new(1500, 180));
        assert_eq!(config.section, CallBudget::new(700, 150));
        assert_eq!(config.critique, CallBudget::new(500, 120));
        assert_eq!(config.revision, CallBudget::new(1500, 180));
        assert_eq!(config.final_critique, CallBudget::new(200, 90));
        assert_eq!(config.headings_max, 8);
    }

    #[test]
    fn test_presets_scale_budgets() {
        let quick = GeneratorConfig::quick();
        let thorough = GeneratorConfig::thorough();
        assert!(quick.revision.max_tokens < thorough.revision.max_tokens);
        assert_eq!(quick.headings_max, 5);
        assert!(quick.headings_max < HEADINGS_MAX);
        assert_eq!(thorough.final_critique, GeneratorConfig::default().final_critique);
    }
}
