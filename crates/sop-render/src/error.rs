//! Render errors.
//!
//! A missing or unreadable image is not an error: the caption is kept and
//! the image is skipped with a warning.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("cannot write document to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("document container error: {0}")]
    Container(#[from] zip::result::ZipError),

    #[error("I/O error while assembling document: {0}")]
    Io(#[from] std::io::Error),
}
