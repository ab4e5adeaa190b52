//! Tiered transport client.

use std::time::Duration;

use sop_core::ChatMessage;

use crate::backend::{ChatBackend, HttpBackend};
use crate::config::ClientConfig;
use crate::error::{GenerationUnavailable, TransportError};
use crate::payload::TIERS;
use crate::response::accept_reply;

/// Chat client that walks every endpoint × tier before giving up.
pub struct TransportClient<B = HttpBackend> {
    backend: B,
    config: ClientConfig,
}

impl TransportClient<HttpBackend> {
    /// Client backed by reqwest.
    pub fn http(config: ClientConfig) -> Self {
        let backend = HttpBackend::new(&config);
        Self::new(backend, config)
    }
}

impl<B: ChatBackend> TransportClient<B> {
    pub fn new(backend: B, config: ClientConfig) -> Self {
        debug_assert!(!config.endpoints.is_empty(), "At least one endpoint required");
        debug_assert!(config.outer_attempts > 0, "At least one outer attempt required");
        Self { backend, config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Send `conversation` and return the generated text.
    ///
    /// The first accepted reply wins. Fails only after every tier on every
    /// endpoint has failed on every outer attempt.
    pub async fn call(
        &self,
        conversation: &[ChatMessage],
        max_tokens: u32,
        read_timeout: Duration,
    ) -> Result<String, GenerationUnavailable> {
        let mut last: Option<TransportError> = None;
        let mut attempts = 0u32;

        for outer in 0..self.config.outer_attempts {
            for url in &self.config.endpoints {
                for tier in TIERS.iter() {
                    attempts += 1;
                    let payload = tier.payload(
                        &self.config.model,
                        conversation,
                        max_tokens,
                        self.config.minimized_tokens_max,
                    );

                    let result = match self.backend.send(url, &payload, read_timeout).await {
                        Ok(reply) => accept_reply(url, &reply),
                        Err(e) => Err(e),
                    };

                    match result {
                        Ok(text) => {
                            tracing::debug!(url = %url, tier = tier.name(), attempts, "generation call succeeded");
                            return Ok(text);
                        }
                        Err(e) => {
                            tracing::warn!(url = %url, tier = tier.name(), error = %e, "generation tier failed");
                            last = Some(e);
                        }
                    }
                }
            }

            let delay = self.config.outer_backoff.saturating_mul(2u32.saturating_pow(outer));
            if outer + 1 < self.config.outer_attempts && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        Err(GenerationUnavailable {
            attempts,
            last: last.unwrap_or_else(|| TransportError::Request("no endpoints configured".into())),
        })
    }
}
