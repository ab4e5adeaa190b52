//! # sop-transport
//!
//! Chat-completions transport with tiered fallback.
//!
//! Deployments of OpenAI-compatible servers disagree on routes and message
//! shapes, and long idle periods leave stale connections behind. The
//! [`TransportClient`] papers over that by walking an ordered list of
//! [`Tier`]s for each endpoint until one produces text:
//!
//! ```text
//! for attempt in 0..2:
//!     for url in [chat/completions, completions]:
//!         full conversation, plain content     ─┐
//!         full conversation, typed content      │ first non-empty
//!         minimized, ≤800 tokens, plain         │ 200 reply wins
//!         minimized, ≤800 tokens, typed        ─┘
//!     sleep 0.8 × 2^attempt s
//! fail: GenerationUnavailable(last error)
//! ```
//!
//! Underneath, the [`HttpBackend`] adds its own short connection-level retry
//! on connect errors, timeouts and 429/5xx replies.
//!
//! # Usage
//!
//! ```no_run
//! use sop_core::ChatMessage;
//! use sop_transport::{ClientConfig, SecretStore, TransportClient};
//! use std::time::Duration;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::from_env(&SecretStore::empty());
//! let client = TransportClient::http(config);
//! let text = client
//!     .call(&[ChatMessage::user("ping")], 200, Duration::from_secs(60))
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod client;
pub mod config;
pub mod error;
pub mod payload;
pub mod response;

pub use backend::{ChatBackend, HttpBackend, HttpReply};
pub use client::TransportClient;
pub use config::{ClientConfig, ConfigError, RetryPolicy, SecretStore, API_KEY_ENV_VARS};
pub use error::{GenerationUnavailable, TransportError};
pub use payload::{ChatPayload, ContentSegment, PayloadShape, Tier, WireContent, WireMessage, TIERS};
pub use response::{accept_reply, extract_content};
