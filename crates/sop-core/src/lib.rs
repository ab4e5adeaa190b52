//! # sop-core
//!
//! Core types for the SOP author/critic pipeline.
//!
//! Everything here is pure: no I/O, no network. The crate holds the data
//! model shared by the transport, the orchestrator and the renderer, plus
//! the text-level pieces of the pipeline that must never fail:
//!
//! - [`parse_feedback`] turns critic output into [`FeedbackItem`]s
//! - [`extract_headings`] recovers numbered headings from an outline
//! - [`template::generate`] builds a compliant SOP with no remote calls
//! - [`sanitize_markdown`] strips generator noise before storage
//!
//! ## Critique grammar
//!
//! ```text
//! STATUS: OK
//! ```
//!
//! or one or more blocks of
//!
//! ```text
//! ISSUE: <short title>
//! WHY: <reason>
//! FIX: <action>
//! BLOCKER: <yes|no>
//! ```

pub mod feedback;
pub mod message;
pub mod outcome;
pub mod outline;
pub mod request;
pub mod sanitize;
pub mod template;

pub use feedback::{is_sentinel, parse_feedback, FeedbackItem, SENTINEL};
pub use message::{ChatMessage, ChatTurn, ConversationLog, Role, Speaker, UnknownRole};
pub use outcome::{ReviewOutcome, ReviewStatus};
pub use outline::{extract_headings, HEADINGS_MAX};
pub use request::{ContentMode, Fields, GenerationRequest, GenerationRequestBuilder, SourceDocument};
pub use sanitize::sanitize_markdown;
