//! Reply validation and content extraction.

use serde_json::Value;

use crate::backend::HttpReply;
use crate::error::{snippet, TransportError};

/// Extract generated text from a reply body.
///
/// Tries the chat shape `choices[0].message.content` first (a string, or an
/// array of `{type, text}` segments), then the legacy completion shape
/// `choices[0].text`. Returns trimmed text, possibly empty.
pub fn extract_content(body: &Value) -> String {
    let choice = &body["choices"][0];

    let chat = match &choice["message"]["content"] {
        Value::String(s) => s.trim().to_string(),
        Value::Array(segments) => segments
            .iter()
            .filter_map(|s| s["text"].as_str())
            .collect::<String>()
            .trim()
            .to_string(),
        _ => String::new(),
    };
    if !chat.is_empty() {
        return chat;
    }

    choice["text"].as_str().unwrap_or("").trim().to_string()
}

/// Accept a reply only if it is a 200 whose JSON body yields non-empty text.
pub fn accept_reply(url: &str, reply: &HttpReply) -> Result<String, TransportError> {
    if reply.status != 200 {
        return Err(TransportError::status(url, reply.status, &reply.body));
    }

    let body: Value = serde_json::from_str(&reply.body)
        .map_err(|_| TransportError::InvalidBody(snippet(&reply.body)))?;

    let content = extract_content(&body);
    if content.is_empty() {
        return Err(TransportError::EmptyContent(snippet(&reply.body)));
    }
    Ok(content)
}
