//! Typed stanza/event metadata with coerce-and-warn parsing.
//!
//! Malformed configuration must never abort generation: every invalid value
//! is replaced by its documented default and reported through a
//! `tracing::warn!` naming the stanza.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Timezone offsets accepted by the `timezone` setting, e.g. `+0530`, `-0800`.
const TIMEZONE_PATTERN: &str = r"^((\+1[0-2])|(-1[0-4])|[+|-][0][0-9])([0-5][0-9])$";

fn timezone_regex() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(TIMEZONE_PATTERN).expect("valid timezone pattern"))
}

/// How the raw sample file is interpreted when splitting into events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputType {
    Modinput,
    WindowsInput,
    FileMonitor,
    UfFileMonitor,
    ScriptedInput,
    SyslogTcp,
    SyslogUdp,
    Default,
}

impl InputType {
    /// Parse a configured value, falling back to `default` with a warning.
    pub fn parse_lossy(raw: Option<&str>, stanza: &str) -> Self {
        match raw {
            None => InputType::Default,
            Some("modinput") => InputType::Modinput,
            Some("windows_input") => InputType::WindowsInput,
            Some("file_monitor") => InputType::FileMonitor,
            Some("uf_file_monitor") => InputType::UfFileMonitor,
            Some("scripted_input") => InputType::ScriptedInput,
            Some("syslog_tcp") => InputType::SyslogTcp,
            Some("syslog_udp") => InputType::SyslogUdp,
            Some("default") => InputType::Default,
            Some(other) => {
                tracing::warn!(
                    stanza,
                    "Invalid value for input_type found: '{other}' using default input_type"
                );
                InputType::Default
            }
        }
    }

    /// True for input types that ingest one event per line of the sample.
    pub fn is_per_line(&self) -> bool {
        matches!(self, InputType::Modinput | InputType::WindowsInput)
    }

    /// True for input types where the host is supplied by the input itself.
    pub fn host_from_input(&self) -> bool {
        matches!(
            self,
            InputType::Modinput
                | InputType::WindowsInput
                | InputType::SyslogTcp
                | InputType::SyslogUdp
        )
    }
}

impl std::fmt::Display for InputType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            InputType::Modinput => "modinput",
            InputType::WindowsInput => "windows_input",
            InputType::FileMonitor => "file_monitor",
            InputType::UfFileMonitor => "uf_file_monitor",
            InputType::ScriptedInput => "scripted_input",
            InputType::SyslogTcp => "syslog_tcp",
            InputType::SyslogUdp => "syslog_udp",
            InputType::Default => "default",
        };
        write!(f, "{s}")
    }
}

/// Whether the host value is taken from the event text or set by the plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostType {
    Event,
    Plugin,
}

impl HostType {
    pub fn parse_lossy(raw: Option<&str>, stanza: &str) -> Self {
        match raw {
            None | Some("plugin") => HostType::Plugin,
            Some("event") => HostType::Event,
            Some(other) => {
                tracing::warn!(
                    stanza,
                    "Invalid value for host_type: '{other}' using host_type = plugin."
                );
                HostType::Plugin
            }
        }
    }
}

/// Whether the timestamp is taken from the event text or set at ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampType {
    Event,
    Plugin,
}

impl TimestampType {
    pub fn parse_lossy(raw: Option<&str>, stanza: &str) -> Self {
        match raw {
            None | Some("plugin") => TimestampType::Plugin,
            Some("event") => TimestampType::Event,
            Some(other) => {
                tracing::warn!(
                    stanza,
                    "Invalid value for timestamp_type: '{other}' using timestamp_type = plugin."
                );
                TimestampType::Plugin
            }
        }
    }
}

/// Timezone applied to synthesized timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timezone {
    /// The machine-local timezone.
    Local,
    /// UTC, the `0000` default.
    Utc,
    /// A fixed `±HHMM` offset, stored as configured (e.g. `+0530`).
    Offset(String),
}

impl Timezone {
    pub fn parse_lossy(raw: Option<&str>, stanza: &str) -> Self {
        match raw.map(|s| s.trim_matches(['\'', '"'])) {
            None | Some("0000") => Timezone::Utc,
            Some("local") => Timezone::Local,
            Some(other) if timezone_regex().is_match(other) => {
                Timezone::Offset(other.to_string())
            }
            Some(other) => {
                tracing::warn!(
                    stanza,
                    "Invalid value for timezone: '{other}' using timezone = 0000."
                );
                Timezone::Utc
            }
        }
    }
}

/// Parse a numeric setting, warning and substituting a default when invalid.
fn parse_numeric_lossy(
    raw: Option<&str>,
    setting: &str,
    default: Option<u64>,
    stanza: &str,
) -> Option<u64> {
    match raw {
        None => None,
        Some(s) => match s.parse::<u64>() {
            Ok(n) => Some(n),
            Err(_) => {
                tracing::warn!(
                    stanza,
                    "Invalid value for {setting}: '{s}' using {setting} = {}.",
                    default.unwrap_or(1)
                );
                default
            }
        },
    }
}

/// Stanza-level settings, carried (with a per-event host) on every event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMetadata {
    pub input_type: InputType,
    pub host: String,
    pub host_type: HostType,
    pub timestamp_type: TimestampType,
    pub timezone: Timezone,
    /// Regex used to split the raw sample into events, when present.
    pub breaker: Option<String>,
    pub count: Option<u64>,
    pub sample_count: Option<u64>,
    pub expected_event_count: Option<u64>,
    pub index: Option<String>,
    pub source: Option<String>,
    pub sourcetype: Option<String>,
    /// Relative time bound for timestamp rules, e.g. `-60m` or `now`.
    pub earliest: Option<String>,
    pub latest: Option<String>,
    /// Switches the sample to the XML requirement-test format.
    pub requirement_test_sample: bool,
}

impl EventMetadata {
    /// Build typed metadata from raw stanza key/values, coercing invalid
    /// settings to their defaults with warnings. `stanza` is the sample name
    /// used both as warning context and as the default host.
    pub fn from_raw(raw: &BTreeMap<String, String>, stanza: &str) -> Self {
        let get = |key: &str| raw.get(key).map(|s| s.as_str());

        let input_type = InputType::parse_lossy(get("input_type"), stanza);
        let mut host = raw
            .get("host")
            .cloned()
            .unwrap_or_else(|| stanza.to_string());
        if input_type == InputType::UfFileMonitor {
            // Universal forwarder hosts cannot carry underscores or dots.
            host = host.replace(['_', '.'], "-");
        }
        if raw.contains_key("index")
            && matches!(input_type, InputType::SyslogTcp | InputType::SyslogUdp)
        {
            tracing::warn!(
                stanza,
                "For input_type '{input_type}', there should be no index set"
            );
        }

        EventMetadata {
            input_type,
            host,
            host_type: HostType::parse_lossy(get("host_type"), stanza),
            timestamp_type: TimestampType::parse_lossy(get("timestamp_type"), stanza),
            timezone: Timezone::parse_lossy(get("timezone"), stanza),
            breaker: raw.get("breaker").cloned(),
            count: parse_numeric_lossy(get("count"), "count", Some(100), stanza),
            sample_count: parse_numeric_lossy(get("sample_count"), "sample_count", Some(1), stanza),
            expected_event_count: parse_numeric_lossy(
                get("expected_event_count"),
                "expected_event_count",
                Some(1),
                stanza,
            ),
            index: raw.get("index").cloned(),
            source: raw.get("source").cloned(),
            sourcetype: raw.get("sourcetype").cloned(),
            earliest: raw.get("earliest").cloned(),
            latest: raw.get("latest").cloned(),
            requirement_test_sample: raw
                .get("requirement_test_sample")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        }
    }
}

impl Default for EventMetadata {
    fn default() -> Self {
        EventMetadata {
            input_type: InputType::Default,
            host: String::new(),
            host_type: HostType::Plugin,
            timestamp_type: TimestampType::Plugin,
            timezone: Timezone::Utc,
            breaker: None,
            count: None,
            sample_count: None,
            expected_event_count: None,
            index: None,
            source: None,
            sourcetype: None,
            earliest: None,
            latest: None,
            requirement_test_sample: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_invalid_input_type_falls_back_to_default() {
        let meta = EventMetadata::from_raw(&raw(&[("input_type", "not_a_real_type")]), "sample.log");
        assert_eq!(meta.input_type, InputType::Default);
    }

    #[test]
    fn test_missing_host_defaults_to_stanza_name() {
        let meta = EventMetadata::from_raw(&raw(&[]), "sample.log");
        assert_eq!(meta.host, "sample.log");
    }

    #[test]
    fn test_uf_file_monitor_host_rewrite() {
        let meta = EventMetadata::from_raw(
            &raw(&[("input_type", "uf_file_monitor"), ("host", "my_host.example")]),
            "sample.log",
        );
        assert_eq!(meta.host, "my-host-example");
    }

    #[test]
    fn test_invalid_count_coerced() {
        let meta = EventMetadata::from_raw(&raw(&[("count", "abc")]), "sample.log");
        assert_eq!(meta.count, Some(100));
        let meta = EventMetadata::from_raw(&raw(&[("count", "42")]), "sample.log");
        assert_eq!(meta.count, Some(42));
    }

    #[test]
    fn test_timezone_offsets() {
        assert_eq!(
            Timezone::parse_lossy(Some("+0530"), "s"),
            Timezone::Offset("+0530".to_string())
        );
        assert_eq!(Timezone::parse_lossy(Some("local"), "s"), Timezone::Local);
        assert_eq!(Timezone::parse_lossy(Some("9999"), "s"), Timezone::Utc);
        assert_eq!(Timezone::parse_lossy(None, "s"), Timezone::Utc);
    }

    #[test]
    fn test_host_type_coercion() {
        assert_eq!(HostType::parse_lossy(Some("event"), "s"), HostType::Event);
        assert_eq!(HostType::parse_lossy(Some("bogus"), "s"), HostType::Plugin);
    }
}
