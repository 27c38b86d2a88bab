//! One configuration stanza bound to its sample file.
//!
//! A [`SampleStanza`] owns the typed metadata, the parsed rules, and the raw
//! sample text. `tokenize` turns the raw text into the stanza's share of the
//! corpus: split into raw events, run every rule over the batch, repeat
//! until the required event count is reached.

use crate::config::ConfName;
use gen_core::{EventMetadata, SampleEvent, SequenceCounters, TokenConfig};
use gen_core::{ReplacementType, RequirementTestData};
use rand::Rng;
use regex::RegexBuilder;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use token_rules::Rule;

/// Upper bound on events generated per stanza. A missing, zero, or larger
/// configured count clamps here.
pub const BULK_EVENT_COUNT: u64 = 250;

/// Marker beginning a raw block that carries ingestion metadata overrides.
const SYSLOG_HEADER_MARKER: &str = "***SPLUNK***";

pub struct SampleStanza {
    sample_path: PathBuf,
    pub sample_name: String,
    pub metadata: EventMetadata,
    rules: Vec<Rule>,
    conf_name: ConfName,
    raw: OnceLock<String>,
    host_count: AtomicU64,
}

impl SampleStanza {
    pub fn new(
        sample_path: PathBuf,
        settings: &BTreeMap<String, String>,
        tokens: &[TokenConfig],
        conf_name: ConfName,
    ) -> Self {
        let sample_name = sample_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| sample_path.to_string_lossy().into_owned());
        let metadata = EventMetadata::from_raw(settings, &sample_name);
        let rules = Self::parse_rules(tokens, &metadata, &sample_path, &sample_name);
        SampleStanza {
            sample_path,
            sample_name,
            metadata,
            rules,
            conf_name,
            raw: OnceLock::new(),
            host_count: AtomicU64::new(0),
        }
    }

    /// `all`-type tokens first (fan-out multiplies the batch, so they must
    /// run before in-place rules), insertion order otherwise.
    fn parse_rules(
        tokens: &[TokenConfig],
        metadata: &EventMetadata,
        sample_path: &std::path::Path,
        stanza: &str,
    ) -> Vec<Rule> {
        let (all, rest): (Vec<_>, Vec<_>) = tokens
            .iter()
            .partition(|t| t.replacement_type == ReplacementType::All);
        all.into_iter()
            .chain(rest)
            .filter_map(|token| {
                let rule = Rule::parse(token, metadata, sample_path, stanza);
                if rule.is_none() {
                    tracing::warn!(
                        "Unidentified Rule: '{}' for token '{}'",
                        token.replacement,
                        token.token
                    );
                }
                rule
            })
            .collect()
    }

    /// Read the sample file once; later calls reuse the cached text. Safe to
    /// call from the generator's read threads.
    pub fn load_raw(&self) -> &str {
        self.raw.get_or_init(|| {
            match std::fs::read_to_string(&self.sample_path) {
                Ok(text) => text,
                Err(err) => {
                    tracing::warn!(
                        "Failed to read sample file '{}': {err}",
                        self.sample_path.display()
                    );
                    String::new()
                }
            }
        })
    }

    /// Stanza metadata with a per-event unique host suffix.
    fn get_eventmetadata(&self) -> EventMetadata {
        let count = self.host_count.fetch_add(1, Ordering::Relaxed) + 1;
        let mut metadata = self.metadata.clone();
        metadata.host = format!("{}_{count}", self.metadata.host);
        metadata
    }

    /// Generate this stanza's tokenized events.
    ///
    /// The legacy eventgen conf targets the stanza `count`; the psa-data
    /// conf targets a single raw pass. Missing/zero/oversized counts clamp
    /// to [`BULK_EVENT_COUNT`]. Each pass re-splits the raw sample so
    /// fan-out and random draws stay independent between passes.
    pub fn tokenize<R: Rng>(
        &self,
        counters: &SequenceCounters,
        rng: &mut R,
    ) -> Vec<SampleEvent> {
        let required = match self.conf_name {
            ConfName::Eventgen => self.metadata.count,
            ConfName::PsaData => Some(1),
        };
        let target = match required {
            None | Some(0) => BULK_EVENT_COUNT,
            Some(n) if n > BULK_EVENT_COUNT => BULK_EVENT_COUNT,
            Some(n) => n,
        } as usize;

        let mut bulk: Vec<SampleEvent> = Vec::new();
        while bulk.len() < target {
            let mut batch = self.raw_events();
            if batch.is_empty() {
                break;
            }
            for rule in &self.rules {
                batch = rule.apply(batch, counters, rng);
            }
            for event in &mut batch {
                stamp_requirement_host(event);
                apply_syslog_header(event);
            }
            bulk.extend(batch);
        }

        if self.metadata.breaker.is_some() {
            for event in &mut bulk {
                event.metadata.sample_count = Some(1);
            }
        }
        match self.metadata.expected_event_count {
            Some(_) => {
                for event in &mut bulk {
                    event.metadata.sample_count = Some(1);
                }
            }
            None => {
                let expected: u64 = if self.metadata.breaker.is_some() {
                    bulk.iter()
                        .map(|event| {
                            self.break_events(&event.event)
                                .iter()
                                .filter(|chunk| !chunk.is_empty())
                                .count() as u64
                        })
                        .sum()
                } else {
                    bulk.len() as u64
                };
                for event in &mut bulk {
                    event.metadata.expected_event_count = Some(expected);
                }
            }
        }
        bulk
    }

    /// Split the raw sample into events: requirement XML, breaker regex,
    /// per-line, or whole-file, in that order of precedence.
    fn raw_events(&self) -> Vec<SampleEvent> {
        let raw = self.load_raw();
        if self.metadata.requirement_test_sample {
            return self.requirement_events(raw);
        }
        if self.metadata.breaker.is_some() {
            return self
                .break_events(raw)
                .into_iter()
                .filter(|chunk| !chunk.is_empty())
                .map(|chunk| SampleEvent::new(chunk, self.get_eventmetadata(), &self.sample_name))
                .collect();
        }
        if self.metadata.input_type.is_per_line() {
            return raw
                .lines()
                .filter(|line| !line.is_empty())
                .map(|line| SampleEvent::new(line, self.get_eventmetadata(), &self.sample_name))
                .collect();
        }
        let event = raw.trim();
        if event.is_empty() {
            tracing::warn!("sample file: '{}' is empty", self.sample_path.display());
            return Vec::new();
        }
        vec![SampleEvent::new(
            event,
            self.metadata.clone(),
            &self.sample_name,
        )]
    }

    /// Split at every match start of the breaker pattern. A match at
    /// position zero produces no leading empty event; a pattern that is
    /// invalid or never matches degrades to the whole text with a warning.
    pub fn break_events(&self, raw: &str) -> Vec<String> {
        let Some(breaker) = &self.metadata.breaker else {
            return vec![raw.to_string()];
        };
        let pattern = match RegexBuilder::new(breaker).multi_line(true).build() {
            Ok(pattern) => pattern,
            Err(_) => {
                tracing::warn!("Invalid breaker for stanza {}", self.sample_name);
                return vec![raw.to_string()];
            }
        };
        let starts: Vec<usize> = pattern.find_iter(raw).map(|m| m.start()).collect();
        if starts.is_empty() {
            tracing::warn!("Invalid breaker for stanza {}", self.sample_name);
            return vec![raw.to_string()];
        }
        let mut events = Vec::with_capacity(starts.len() + 1);
        let mut pos = 0;
        if starts[0] != 0 {
            events.push(raw[..starts[0]].trim().to_string());
            pos = starts[0];
        }
        for &start in &starts[1..] {
            events.push(raw[pos..start].trim().to_string());
            pos = start;
        }
        events.push(raw[pos..].trim().to_string());
        events
    }

    fn requirement_events(&self, raw: &str) -> Vec<SampleEvent> {
        let device: DeviceXml = match quick_xml::de::from_str(raw) {
            Ok(device) => device,
            Err(err) => {
                tracing::warn!(
                    "Invalid requirement sample '{}': {err}",
                    self.sample_path.display()
                );
                return Vec::new();
            }
        };
        device
            .events
            .into_iter()
            .map(|entry| {
                let mut metadata = self.get_eventmetadata();
                if let Some(transport) = &entry.transport {
                    if let Some(host) = transport.host.clone().filter(|h| !h.is_empty()) {
                        metadata.host = host;
                    }
                    if let Some(source) = transport.source.clone().filter(|s| !s.is_empty()) {
                        metadata.source = Some(source);
                    }
                }
                let mut event =
                    SampleEvent::new(entry.raw.trim(), metadata, &self.sample_name);
                event.requirement_test_data = Some(entry.into_test_data());
                event
            })
            .collect()
    }
}

/// Raw blocks starting with `***SPLUNK***` carry `key=value` overrides on
/// the first line; apply them to the event metadata and strip the header.
fn apply_syslog_header(event: &mut SampleEvent) {
    if !event.event.starts_with(SYSLOG_HEADER_MARKER) {
        return;
    }
    let Some((header, body)) = event.event.split_once('\n') else {
        tracing::warn!("Syslog header without event body in {}", event.sample_name);
        return;
    };
    static FIELD: OnceLock<regex::Regex> = OnceLock::new();
    let field = FIELD
        .get_or_init(|| regex::Regex::new(r"\w+=[^\s]+").expect("valid header field pattern"));
    for pair in field.find_iter(header) {
        let Some((key, value)) = pair.as_str().split_once('=') else {
            continue;
        };
        match key {
            "host" => event.metadata.host = value.to_string(),
            "source" => event.metadata.source = Some(value.to_string()),
            "sourcetype" => event.metadata.sourcetype = Some(value.to_string()),
            "index" => event.metadata.index = Some(value.to_string()),
            other => tracing::debug!("Ignoring syslog header field '{other}'"),
        }
    }
    event.event = body.trim_start_matches('\n').to_string();
}

/// Requirement annotations reference the final event host through the
/// `##host##` placeholder; resolve it once the host is settled.
fn stamp_requirement_host(event: &mut SampleEvent) {
    let host = event.metadata.host.clone();
    if let Some(data) = event.requirement_test_data.as_mut() {
        for value in data.cim_fields.values_mut() {
            if value.contains("##host##") {
                *value = value.replace("##host##", &host);
            }
        }
    }
}

#[derive(Debug, serde::Deserialize)]
struct DeviceXml {
    #[serde(rename = "event", default)]
    events: Vec<EventXml>,
}

#[derive(Debug, serde::Deserialize)]
struct EventXml {
    raw: String,
    transport: Option<TransportXml>,
    cim: Option<CimXml>,
    other_mappings: Option<FieldListXml>,
}

impl EventXml {
    fn into_test_data(self) -> RequirementTestData {
        let mut data = RequirementTestData::default();
        if let Some(other) = self.other_mappings {
            data.other_fields = other
                .fields
                .into_iter()
                .map(|f| (f.name, f.value))
                .collect();
        }
        if let Some(cim) = self.cim {
            data.cim_version = Some(cim.version.unwrap_or_else(|| "latest".to_string()));
            data.datamodels = cim.models.map(|m| m.models).unwrap_or_default();
            data.cim_fields = cim
                .cim_fields
                .map(|list| list.fields.into_iter().map(|f| (f.name, f.value)).collect())
                .unwrap_or_default();
            data.missing_recommended_fields = cim
                .missing_recommended_fields
                .map(|list| list.fields)
                .unwrap_or_default();
            data.exceptions = cim
                .exceptions
                .map(|list| list.fields.into_iter().map(|f| (f.name, f.value)).collect())
                .unwrap_or_default();
        }
        data
    }
}

#[derive(Debug, serde::Deserialize)]
struct TransportXml {
    #[serde(rename = "@host")]
    host: Option<String>,
    #[serde(rename = "@source")]
    source: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct CimXml {
    #[serde(rename = "@version")]
    version: Option<String>,
    models: Option<ModelsXml>,
    cim_fields: Option<FieldListXml>,
    missing_recommended_fields: Option<NameListXml>,
    exceptions: Option<FieldListXml>,
}

#[derive(Debug, serde::Deserialize)]
struct ModelsXml {
    #[serde(rename = "model", default)]
    models: Vec<String>,
}

#[derive(Debug, serde::Deserialize)]
struct FieldListXml {
    #[serde(rename = "field", default)]
    fields: Vec<FieldXml>,
}

#[derive(Debug, serde::Deserialize)]
struct FieldXml {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@value")]
    value: String,
}

#[derive(Debug, serde::Deserialize)]
struct NameListXml {
    #[serde(rename = "field", default)]
    fields: Vec<String>,
}
