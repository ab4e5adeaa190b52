//! # sop-generator
//!
//! Author/critic SOP generation with a template fallback.
//!
//! A writer role drafts the procedure section by section, a critic role
//! reviews it, and the writer revises once if the critic found issues.
//! When the remote model is unreachable the run still completes with a
//! template document built from the input fields.
//!
//! # Usage
//!
//! ```bash
//! # Generate and render to DOCX
//! cargo run -p sop-generator --bin sop-generate -- generate \
//!     --title "Calibration of Scale X" --field procedure="Step A; Step B" \
//!     --output scale-x.docx
//!
//! # Keep numbered versions and compare them
//! cargo run -p sop-generator --bin sop-generate -- generate --title X --versions out/
//! cargo run -p sop-generator --bin sop-generate -- diff --dir out/ 1 2
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Fields +  │ ──> │  Generation │ ──> │   Outline   │
//! │   Sources   │     │   Prompt    │     │  (writer)   │
//! └─────────────┘     └─────────────┘     └──────┬──────┘
//!                                                │
//!                     ┌──────────────────────────┘
//!                     ▼
//!              ┌─────────────┐
//!              │  Sections   │
//!              │  (writer)   │
//!              └──────┬──────┘
//!                     ▼
//!              ┌─────────────┐   STATUS: OK   ┌─────────────┐
//!              │  Critique   │ ─────────────> │  APPROVED   │
//!              │  (critic)   │                └─────────────┘
//!              └──────┬──────┘                       ▲
//!                     │ issues                       │ STATUS: OK
//!                     ▼                              │
//!              ┌─────────────┐               ┌───────┴─────┐
//!              │  Revision   │ ────────────> │   Verdict   │ ──> NEEDS_REVIEW
//!              │  (writer)   │               │  (critic)   │
//!              └─────────────┘               └─────────────┘
//!
//! any transport failure ──> template draft, APPROVED, used_fallback
//! ```

pub mod diff;
pub mod generator;
pub mod prompt;
pub mod sources;
pub mod versions;

pub use diff::unified_diff;
pub use generator::{CallBudget, GeneratorConfig, SopGenerator, FALLBACK_WRITER_NOTE};
pub use prompt::PromptBuilder;
pub use sources::{extract, extract_path, source_document, ExtractedText, SourceError, PREVIEW_CHARS};
pub use versions::{VersionEntry, VersionError, VersionStore, DEFAULT_AUTHOR};
