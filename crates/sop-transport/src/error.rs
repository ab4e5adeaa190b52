//! Transport errors.

/// Maximum characters of a reply body kept in an error.
pub const BODY_SNIPPET_MAX: usize = 400;

/// One failed attempt at one tier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("HTTP {status} from {url}: {body}")]
    Status { url: String, status: u16, body: String },

    #[error("reply is not valid JSON: {0}")]
    InvalidBody(String),

    #[error("reply has empty content: {0}")]
    EmptyContent(String),

    #[error("request could not be sent: {0}")]
    Request(String),
}

impl TransportError {
    /// Build a status error, truncating the body for diagnostics.
    pub fn status(url: &str, status: u16, body: &str) -> Self {
        TransportError::Status {
            url: url.to_string(),
            status,
            body: snippet(body),
        }
    }
}

/// First [`BODY_SNIPPET_MAX`] characters of `body`.
pub(crate) fn snippet(body: &str) -> String {
    body.chars().take(BODY_SNIPPET_MAX).collect()
}

/// Every tier on every endpoint failed, on every outer attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("connection to LLM failed after {attempts} attempts: {last}")]
pub struct GenerationUnavailable {
    /// Individual tier attempts made
    pub attempts: u32,
    /// Error from the final attempt
    pub last: TransportError,
}
