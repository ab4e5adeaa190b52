//! Generation request: named input fields plus uploaded source previews.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Named free-text input fields.
///
/// Lookups trim the stored value and treat a missing key as empty, so
/// callers never need to distinguish "absent" from "blank".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fields(BTreeMap<String, String>);

impl Fields {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Trimmed value of `key`, or `""` when absent.
    #[must_use]
    pub fn get(&self, key: &str) -> &str {
        self.0.get(key).map(|v| v.trim()).unwrap_or("")
    }

    /// First non-blank value among `keys`, or `""`.
    #[must_use]
    pub fn first_of(&self, keys: &[&str]) -> &str {
        keys.iter()
            .map(|k| self.get(k))
            .find(|v| !v.is_empty())
            .unwrap_or("")
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Fields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Preview of an uploaded reference document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub name: String,
    pub preview: String,
}

impl SourceDocument {
    pub fn new(name: impl Into<String>, preview: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            preview: preview.into(),
        }
    }
}

/// How the writer should balance generated text against the sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ContentMode {
    /// Lean on sources, fill gaps with generated wording
    #[default]
    AiWithSources,
    /// Generated text only
    AiOnly,
    /// Nothing beyond what the sources say
    SourcesOnly,
}

impl ContentMode {
    /// Recognise an explicit mode. Accepts both the form labels and short
    /// English keys; blank or unknown values are `None`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "только ии" | "ai" | "ai-only" => Some(ContentMode::AiOnly),
            "только документ" | "sources" | "sources-only" => Some(ContentMode::SourcesOnly),
            "ии + источник" | "ai-with-sources" => Some(ContentMode::AiWithSources),
            _ => None,
        }
    }

    /// Parse the `content_type` field; blank or unknown values map to the
    /// default.
    #[must_use]
    pub fn from_field(value: &str) -> Self {
        Self::parse(value).unwrap_or_default()
    }

    /// Label shown in the generation prompt metadata block.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            ContentMode::AiWithSources => "ИИ + источник",
            ContentMode::AiOnly => "Только ИИ",
            ContentMode::SourcesOnly => "Только документ",
        }
    }
}

/// Everything one pipeline run needs. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    fields: Fields,
    sources: Vec<SourceDocument>,
}

impl GenerationRequest {
    #[must_use]
    pub fn builder() -> GenerationRequestBuilder {
        GenerationRequestBuilder::default()
    }

    #[must_use]
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Trimmed field value, `""` when absent.
    #[must_use]
    pub fn field(&self, key: &str) -> &str {
        self.fields.get(key)
    }

    #[must_use]
    pub fn sources(&self) -> &[SourceDocument] {
        &self.sources
    }

    #[must_use]
    pub fn content_mode(&self) -> ContentMode {
        ContentMode::from_field(self.field("content_type"))
    }
}

/// Builder for [`GenerationRequest`].
#[derive(Debug, Clone, Default)]
pub struct GenerationRequestBuilder {
    fields: Fields,
    sources: Vec<SourceDocument>,
}

impl GenerationRequestBuilder {
    #[must_use]
    pub fn field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key, value);
        self
    }

    #[must_use]
    pub fn fields(mut self, fields: Fields) -> Self {
        for (k, v) in fields.iter() {
            self.fields.insert(k, v);
        }
        self
    }

    #[must_use]
    pub fn source(mut self, source: SourceDocument) -> Self {
        self.sources.push(source);
        self
    }

    #[must_use]
    pub fn build(self) -> GenerationRequest {
        GenerationRequest {
            fields: self.fields,
            sources: self.sources,
        }
    }
}
