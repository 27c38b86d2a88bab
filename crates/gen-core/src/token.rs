//! Token configuration and substitution pair types.

use serde::{Deserialize, Serialize};

/// How a token's replacement values are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplacementType {
    Static,
    Random,
    /// Exhaustive fan-out: one cloned event per possible value.
    All,
    Timestamp,
    File,
    Mvfile,
}

impl ReplacementType {
    /// Parse a configured value, falling back to `random` with a warning.
    pub fn parse_lossy(raw: &str, token: &str) -> Self {
        match raw {
            "static" => ReplacementType::Static,
            "random" => ReplacementType::Random,
            "all" => ReplacementType::All,
            "timestamp" => ReplacementType::Timestamp,
            "file" => ReplacementType::File,
            "mvfile" => ReplacementType::Mvfile,
            other => {
                tracing::warn!(
                    "Invalid replacementType: '{other}' for token:'{token}' using 'random' as replacementType"
                );
                ReplacementType::Random
            }
        }
    }
}

/// One token-replacement entry of a stanza.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Regex pattern marking substitution points in the raw sample text.
    pub token: String,
    /// Replacement spec string, e.g. `integer[1:10]` or `static-value`.
    pub replacement: String,
    pub replacement_type: ReplacementType,
    /// Logical field name; defaults to the token stripped of `#` delimiters.
    pub field: Option<String>,
}

impl TokenConfig {
    /// The logical field this token feeds, for key-field tracking.
    pub fn field_name(&self) -> String {
        self.field
            .clone()
            .unwrap_or_else(|| self.token.trim_matches('#').to_string())
    }
}

/// A single substitution produced by a rule.
///
/// `key` is the canonical/searchable form tracked in `key_fields`, `value`
/// is the text actually substituted into the event. Most rules set them
/// equal; timestamp rules track the epoch seconds as the key while
/// substituting the formatted string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenValue {
    pub key: String,
    pub value: String,
}

impl TokenValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        TokenValue {
            key: key.into(),
            value: value.into(),
        }
    }

    /// A pair where the searchable key and the substituted text coincide.
    pub fn same(value: impl Into<String>) -> Self {
        let value = value.into();
        TokenValue {
            key: value.clone(),
            value,
        }
    }
}
