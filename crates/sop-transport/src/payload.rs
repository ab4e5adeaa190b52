//! Wire payloads and the ordered fallback tiers.
//!
//! Each [`Tier`] is a pure function from (conversation, budget) to a
//! [`ChatPayload`]. The client walks [`TIERS`] in order, so the retry policy
//! can be tested by inspecting payloads alone.

use serde::Serialize;
use sop_core::{ChatMessage, Role};

/// Shape of message content on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    /// `"content": "text"`
    Plain,
    /// `"content": [{"type": "text", "text": "text"}]`
    Typed,
}

/// One typed content segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentSegment {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: String,
}

/// Message content as sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum WireContent {
    Plain(String),
    Typed(Vec<ContentSegment>),
}

impl WireContent {
    /// Text carried by this content, regardless of shape.
    pub fn text(&self) -> String {
        match self {
            WireContent::Plain(s) => s.clone(),
            WireContent::Typed(segments) => segments.iter().map(|s| s.text.as_str()).collect(),
        }
    }
}

/// One message as sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WireMessage {
    pub role: Role,
    pub content: WireContent,
}

/// Request body for a chat-completions style endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatPayload {
    pub model: String,
    pub messages: Vec<WireMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub stream: bool,
}

impl ChatPayload {
    /// Build a payload with deterministic sampling and no streaming.
    pub fn new(model: &str, messages: &[ChatMessage], max_tokens: u32, shape: PayloadShape) -> Self {
        let messages = messages
            .iter()
            .map(|m| WireMessage {
                role: m.role,
                content: match shape {
                    PayloadShape::Plain => WireContent::Plain(m.content.clone()),
                    PayloadShape::Typed => WireContent::Typed(vec![ContentSegment {
                        kind: "text",
                        text: m.content.clone(),
                    }]),
                },
            })
            .collect();

        Self {
            model: model.to_string(),
            messages,
            max_tokens,
            temperature: 0.0,
            stream: false,
        }
    }

    /// Shape of the first message, `None` for an empty payload.
    pub fn shape(&self) -> Option<PayloadShape> {
        self.messages.first().map(|m| match m.content {
            WireContent::Plain(_) => PayloadShape::Plain,
            WireContent::Typed(_) => PayloadShape::Typed,
        })
    }
}

/// One fallback tier: a payload shape and a message set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tier {
    pub shape: PayloadShape,
    /// Send only the leading system message and the final message, with a
    /// reduced token budget
    pub minimized: bool,
}

/// Tiers in the order they are attempted against each endpoint.
pub const TIERS: [Tier; 4] = [
    Tier {
        shape: PayloadShape::Plain,
        minimized: false,
    },
    Tier {
        shape: PayloadShape::Typed,
        minimized: false,
    },
    Tier {
        shape: PayloadShape::Plain,
        minimized: true,
    },
    Tier {
        shape: PayloadShape::Typed,
        minimized: true,
    },
];

impl Tier {
    /// Build this tier's payload.
    ///
    /// `minimized_tokens_max` caps the budget of minimized tiers.
    pub fn payload(
        &self,
        model: &str,
        conversation: &[ChatMessage],
        max_tokens: u32,
        minimized_tokens_max: u32,
    ) -> ChatPayload {
        if self.minimized {
            let messages = minimize(conversation);
            ChatPayload::new(model, &messages, max_tokens.min(minimized_tokens_max), self.shape)
        } else {
            ChatPayload::new(model, conversation, max_tokens, self.shape)
        }
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match (self.minimized, self.shape) {
            (false, PayloadShape::Plain) => "plain",
            (false, PayloadShape::Typed) => "typed",
            (true, PayloadShape::Plain) => "minimized-plain",
            (true, PayloadShape::Typed) => "minimized-typed",
        }
    }
}

/// Leading system message (if any) plus the final message.
fn minimize(conversation: &[ChatMessage]) -> Vec<ChatMessage> {
    let mut out = Vec::with_capacity(2);
    if let Some(first) = conversation.first().filter(|m| m.role == Role::System) {
        out.push(first.clone());
    }
    if let Some(last) = conversation.last() {
        if conversation.len() > 1 || out.is_empty() {
            out.push(last.clone());
        }
    }
    out
}
