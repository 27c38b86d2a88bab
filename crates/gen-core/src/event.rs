//! The mutable unit of work: one candidate log event and its bookkeeping.

use crate::correlation::CorrelationMap;
use crate::metadata::EventMetadata;
use crate::token::TokenValue;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fields whose substituted values are tracked per-event for index-time
/// verification. Substitutions into any other field are not recorded.
pub const KEY_FIELDS: &[&str] = &[
    "src",
    "src_port",
    "dest",
    "dest_port",
    "dvc",
    "host",
    "user",
    "url",
];

/// CIM requirement annotations parsed from an XML requirement-test sample.
/// The generation core treats this as a pass-through payload for downstream
/// test generators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequirementTestData {
    pub cim_version: Option<String>,
    pub datamodels: Vec<String>,
    pub cim_fields: BTreeMap<String, String>,
    pub missing_recommended_fields: Vec<String>,
    pub exceptions: BTreeMap<String, String>,
    pub other_fields: BTreeMap<String, String>,
}

/// One candidate log event flowing through the rule pipeline.
///
/// Created by a stanza when splitting raw sample text, mutated in place by
/// successive rule applications (or cloned for `all`-type fan-out), and
/// immutable once handed to the generator's output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleEvent {
    /// The (partially tokenized) event text.
    pub event: String,
    pub metadata: EventMetadata,
    pub sample_name: String,
    /// field name -> substituted canonical keys, in substitution order.
    pub key_fields: BTreeMap<String, Vec<String>>,
    /// Substituted `_time` keys (epoch seconds), in substitution order.
    pub time_values: Vec<String>,
    pub requirement_test_data: Option<RequirementTestData>,
    /// Correlated choices made while tokenizing this event. Never shared
    /// across events and not part of the cached corpus.
    #[serde(skip)]
    pub correlation: CorrelationMap,
}

impl SampleEvent {
    pub fn new(event: impl Into<String>, metadata: EventMetadata, sample_name: &str) -> Self {
        SampleEvent {
            event: event.into(),
            metadata,
            sample_name: sample_name.to_string(),
            key_fields: BTreeMap::new(),
            time_values: Vec::new(),
            requirement_test_data: None,
            correlation: CorrelationMap::default(),
        }
    }

    /// Number of places the token pattern matches in the current event text.
    pub fn token_count(&self, pattern: &Regex) -> usize {
        pattern.find_iter(&self.event).count()
    }

    /// Substitute replacement values for the token pattern.
    ///
    /// A single value replaces only the first match. Multiple values are
    /// substituted positionally, one per match, by plain string search on
    /// the matched literal, so regex metacharacters inside matched text are
    /// tolerated. When fewer values than matches are supplied the last value
    /// is reused.
    pub fn replace_token(&mut self, pattern: &Regex, values: &[TokenValue]) {
        match values {
            [] => {}
            [single] => {
                self.event = pattern
                    .replacen(&self.event, 1, regex::NoExpand(&single.value))
                    .into_owned();
            }
            many => {
                let words: Vec<String> = pattern
                    .find_iter(&self.event)
                    .map(|m| m.as_str().to_string())
                    .collect();
                for (i, word) in words.iter().enumerate() {
                    let value = &many[i.min(many.len() - 1)];
                    if let Some(pos) = self.event.find(word.as_str()) {
                        self.event
                            .replace_range(pos..pos + word.len(), &value.value);
                    }
                }
            }
        }
    }

    /// Record substituted keys for later index-time verification.
    ///
    /// `_time` keys go to `time_values`; recognized key fields accumulate in
    /// `key_fields`; anything else is not tracked.
    pub fn register_field_value(&mut self, field: &str, values: &[TokenValue]) {
        if field == "_time" {
            self.time_values.extend(values.iter().map(|v| v.key.clone()));
        } else if KEY_FIELDS.contains(&field) {
            self.key_fields
                .entry(field.to_string())
                .or_default()
                .extend(values.iter().map(|v| v.key.clone()));
        }
    }
}
