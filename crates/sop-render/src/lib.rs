//! # sop-render
//!
//! Renders finished SOP text into a paginated DOCX document.
//!
//! Rendering runs in two passes:
//!
//! 1. [`layout`] walks the text once, renumbering headings, extracting
//!    pipe tables and `![caption](path)` figures with running captions,
//!    and classifying list items, footnotes and paragraphs into [`Block`]s.
//! 2. The container writer turns front matter plus those blocks into
//!    WordprocessingML parts and zips them.
//!
//! Both entry points share the pipeline; with a fixed
//! [`RenderMetadata::date`] the output bytes are reproducible.
//!
//! ```rust
//! use chrono::NaiveDate;
//! use sop_render::{render_to_bytes, RenderMetadata};
//!
//! let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
//! let meta = RenderMetadata::titled("Balance calibration").with_date(date);
//! let bytes = render_to_bytes("# Scope\nLaboratory balances.", &meta).unwrap();
//! assert_eq!(&bytes[..2], b"PK");
//! ```

mod docx;
pub mod error;
pub mod front;
pub mod heading;
pub mod layout;
pub mod metadata;

use std::path::Path;

pub use docx::IMAGE_WIDTH_EMU;
pub use error::RenderError;
pub use front::front_matter;
pub use heading::{HeadingCounters, DEPTH_MAX};
pub use layout::{is_table_separator, layout, Block, RenderModel, HEADING_STYLES_MAX};
pub use metadata::{ChangeEntry, Labels, Language, RenderMetadata};

/// Render `text` to DOCX bytes.
pub fn render_to_bytes(text: &str, meta: &RenderMetadata) -> Result<Vec<u8>, RenderError> {
    let date = meta.resolved_date();
    let mut blocks = front_matter(meta, date);
    blocks.extend(layout(text, meta.labels()));

    let bytes = docx::write_docx(&blocks, meta, date)?;
    tracing::debug!(blocks = blocks.len(), bytes = bytes.len(), "rendered document");
    Ok(bytes)
}

/// Render `text` to a DOCX file, creating parent directories as needed.
pub fn render_to_path(text: &str, meta: &RenderMetadata, path: &Path) -> Result<(), RenderError> {
    let bytes = render_to_bytes(text, meta)?;
    let write_err = |source| RenderError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }
    std::fs::write(path, bytes).map_err(write_err)
}
