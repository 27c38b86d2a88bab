//! Token replacement rules for the sample-gen framework.
//!
//! A [`Rule`] is built once per token of a stanza and reused across every
//! event of that stanza. Rule selection happens at construction time: the
//! `(replacementType, replacement prefix)` pair is resolved into a concrete
//! [`RuleKind`], so per-event work is a plain `match` with no re-parsing.
//!
//! Replacement modes:
//!
//! - `all` - fan-out: the event is cloned once per produced value, each
//!   clone receiving exactly one substitution (N events in, N×M out).
//! - everything else - in-place: the produced values are substituted
//!   positionally into the same event (N in, N out).
//!
//! Malformed rule specs never abort generation. An unparseable spec is
//! reported with a warning naming the stanza and the rule is skipped,
//! leaving the raw token visible in the output - an easy signal to spot in
//! failing tests.

pub mod fake;
pub mod file_rule;
pub mod lookup_rule;
pub mod spec;
pub mod time_rule;

use gen_core::{
    ReplacementType, SampleEvent, SequenceCounters, TimestampType, TokenConfig, TokenValue,
};
use rand::seq::SliceRandom;
use rand::Rng;
use regex::Regex;
use std::path::PathBuf;

pub use lookup_rule::HostFamily;
pub use time_rule::TimeBounds;

/// Concrete behavior a rule was resolved to at construction time.
#[derive(Debug, Clone)]
pub enum RuleKind {
    Static {
        value: String,
    },
    Timestamp {
        format: String,
        bounds: TimeBounds,
    },
    Integer {
        lo: i64,
        hi: i64,
    },
    Float {
        lo: f64,
        hi: f64,
        precision: usize,
    },
    List {
        values: Vec<String>,
    },
    File {
        path: PathBuf,
        index: Option<spec::FileIndex>,
    },
    Ipv4,
    Ipv6,
    Mac,
    Guid,
    Hex {
        digits: usize,
    },
    Url {
        parts: Vec<spec::UrlPart>,
    },
    User {
        fields: Vec<String>,
    },
    Email,
    HostFamily {
        family: HostFamily,
        fields: Vec<String>,
    },
    SrcPort,
    DestPort,
}

/// One token-replacement rule of a stanza.
///
/// Stateless beyond its construction parameters; correlated choices live in
/// the per-event [`gen_core::CorrelationMap`] and uniqueness counters in the
/// generator-owned [`SequenceCounters`].
#[derive(Debug, Clone)]
pub struct Rule {
    pattern: Regex,
    pub token: String,
    pub field: String,
    pub replacement_type: ReplacementType,
    pub kind: RuleKind,
}

impl Rule {
    /// Resolve a token entry into a concrete rule.
    ///
    /// Returns `None` when no variant matches or the spec inside a matched
    /// variant is malformed; the caller warns and skips the token.
    pub fn parse(
        token: &TokenConfig,
        meta: &gen_core::EventMetadata,
        sample_path: &std::path::Path,
        stanza: &str,
    ) -> Option<Rule> {
        let pattern = match regex::RegexBuilder::new(&token.token)
            .multi_line(true)
            .build()
        {
            Ok(p) => p,
            Err(err) => {
                tracing::warn!(stanza, "Invalid token pattern '{}': {err}", token.token);
                return None;
            }
        };

        let mut replacement_type = token.replacement_type;
        let replacement = token.replacement.as_str();

        let kind = match replacement_type {
            ReplacementType::Static => RuleKind::Static {
                value: replacement.to_string(),
            },
            ReplacementType::Timestamp => RuleKind::Timestamp {
                format: time_rule::normalize_format(replacement, stanza),
                bounds: TimeBounds {
                    earliest: meta.earliest.clone(),
                    latest: meta.latest.clone(),
                    timezone: meta.timezone.clone(),
                },
            },
            ReplacementType::File | ReplacementType::Mvfile => {
                let (path, index) = spec::parse_file_spec(replacement, sample_path);
                RuleKind::File { path, index }
            }
            ReplacementType::Random | ReplacementType::All => {
                let name = Self::dispatch_name(replacement)?;
                if replacement_type == ReplacementType::All
                    && !matches!(name, "integer" | "list" | "file")
                {
                    tracing::warn!(
                        "replacement_type=all is not supported for {name} rule applied to {} token.",
                        token.token
                    );
                    replacement_type = ReplacementType::Random;
                }
                Self::parse_named(name, replacement, sample_path, stanza)?
            }
        };

        Some(Rule {
            pattern,
            token: token.token.clone(),
            field: token.field_name(),
            replacement_type,
            kind,
        })
    }

    /// The dispatch table for `random`/`all` replacements. Longest names
    /// come before their prefixes (`src_port` before `src`).
    fn dispatch_name(replacement: &str) -> Option<&'static str> {
        const NAMES: &[&str] = &[
            "integer", "list", "ipv4", "float", "ipv6", "mac", "file", "url", "user", "email",
            "host", "hex", "src_port", "dest_port", "src", "dest", "dvc", "guid",
        ];
        let lower = replacement.to_lowercase();
        NAMES.iter().find(|name| lower.starts_with(*name)).copied()
    }

    fn parse_named(
        name: &str,
        replacement: &str,
        sample_path: &std::path::Path,
        stanza: &str,
    ) -> Option<RuleKind> {
        match name {
            "integer" => {
                let (lo, hi) = spec::parse_int_range(replacement).or_else(|| {
                    tracing::warn!(
                        stanza,
                        "Non-supported format: '{replacement}'. Try integer[0:10]"
                    );
                    None
                })?;
                Some(RuleKind::Integer { lo, hi })
            }
            "float" => {
                let (lo, hi, precision) = spec::parse_float_range(replacement).or_else(|| {
                    tracing::warn!(
                        stanza,
                        "Non-supported format: '{replacement}'. i.e float[0.00:70.00]"
                    );
                    None
                })?;
                Some(RuleKind::Float { lo, hi, precision })
            }
            "list" => {
                let values = spec::parse_bracket_list(replacement, "list").or_else(|| {
                    tracing::warn!(
                        stanza,
                        "Non-supported format: '{replacement}'. Try list['value1','value2']"
                    );
                    None
                })?;
                Some(RuleKind::List { values })
            }
            "file" => {
                let (path, index) = spec::parse_file_spec(replacement, sample_path);
                Some(RuleKind::File { path, index })
            }
            "ipv4" => Some(RuleKind::Ipv4),
            "ipv6" => Some(RuleKind::Ipv6),
            "mac" => Some(RuleKind::Mac),
            "guid" => Some(RuleKind::Guid),
            "hex" => {
                let digits = spec::parse_hex_digits(replacement).or_else(|| {
                    tracing::warn!(
                        stanza,
                        "Invalid Hex value: '{replacement}'. Try hex(<i>) where i is an integer"
                    );
                    None
                })?;
                Some(RuleKind::Hex { digits })
            }
            "url" => {
                let parts = spec::parse_url_parts(replacement, stanza)?;
                Some(RuleKind::Url { parts })
            }
            "user" => {
                let fields = spec::parse_user_fields(replacement, stanza)?;
                Some(RuleKind::User { fields })
            }
            "email" => Some(RuleKind::Email),
            "host" | "src" | "dest" | "dvc" => {
                let family = match name {
                    "host" => HostFamily::Host,
                    "src" => HostFamily::Src,
                    "dest" => HostFamily::Dest,
                    _ => HostFamily::Dvc,
                };
                let fields = spec::parse_host_fields(name, replacement, stanza)?;
                Some(RuleKind::HostFamily { family, fields })
            }
            "src_port" => Some(RuleKind::SrcPort),
            "dest_port" => Some(RuleKind::DestPort),
            _ => None,
        }
    }

    /// Apply the rule to a batch of events.
    ///
    /// `all`-type rules fan out (clone per value, unique host suffix per
    /// clone); every other type substitutes in place. Events in which the
    /// token does not occur, or for which the rule produced no values, pass
    /// through untouched.
    pub fn apply<R: Rng>(
        &self,
        events: Vec<SampleEvent>,
        counters: &SequenceCounters,
        rng: &mut R,
    ) -> Vec<SampleEvent> {
        let mut out = Vec::with_capacity(events.len());
        for mut event in events {
            let token_count = event.token_count(&self.pattern);
            if token_count == 0 {
                out.push(event);
                continue;
            }
            let values = self.replace(&mut event, token_count, counters, rng);
            if values.is_empty() {
                out.push(event);
                continue;
            }
            if self.replacement_type == ReplacementType::All {
                for value in values {
                    let mut clone = event.clone();
                    clone.metadata.host =
                        format!("{}_{}", event.sample_name, counters.next_event_host());
                    clone.replace_token(&self.pattern, std::slice::from_ref(&value));
                    clone.register_field_value(&self.field, &[value]);
                    out.push(clone);
                }
            } else {
                event.replace_token(&self.pattern, &values);
                let skip_registration = self.field == "_time"
                    && event.metadata.timestamp_type != TimestampType::Event;
                if !skip_registration {
                    event.register_field_value(&self.field, &values);
                }
                out.push(event);
            }
        }
        out
    }

    /// Produce the replacement values for one event.
    ///
    /// In-place rules produce `token_count` values (one per occurrence);
    /// fan-out rules produce every possible value.
    fn replace<R: Rng>(
        &self,
        event: &mut SampleEvent,
        token_count: usize,
        counters: &SequenceCounters,
        rng: &mut R,
    ) -> Vec<TokenValue> {
        let exhaustive = self.replacement_type == ReplacementType::All;
        match &self.kind {
            RuleKind::Static { value } => {
                vec![TokenValue::same(value.clone()); token_count]
            }
            RuleKind::Integer { lo, hi } => {
                if exhaustive {
                    (*lo..*hi).map(|n| TokenValue::same(n.to_string())).collect()
                } else {
                    (0..token_count)
                        .map(|_| TokenValue::same(rng.gen_range(*lo..=*hi).to_string()))
                        .collect()
                }
            }
            RuleKind::Float { lo, hi, precision } => (0..token_count)
                .map(|_| {
                    let v: f64 = rng.gen_range(*lo..=*hi);
                    TokenValue::same(format!("{v:.precision$}"))
                })
                .collect(),
            RuleKind::List { values } => {
                if exhaustive {
                    values.iter().map(TokenValue::same).collect()
                } else {
                    (0..token_count)
                        .map(|_| {
                            TokenValue::same(values.choose(rng).cloned().unwrap_or_default())
                        })
                        .collect()
                }
            }
            RuleKind::File { path, index } => file_rule::replace(
                path,
                index.as_ref(),
                self.replacement_type,
                event,
                token_count,
                rng,
            ),
            RuleKind::Timestamp { format, bounds } => {
                time_rule::replace(format, bounds, token_count, rng)
            }
            RuleKind::Ipv4 => (0..token_count)
                .map(|_| TokenValue::same(fake::ipv4(rng)))
                .collect(),
            RuleKind::Ipv6 => (0..token_count)
                .map(|_| TokenValue::same(fake::ipv6(rng)))
                .collect(),
            RuleKind::Mac => (0..token_count)
                .map(|_| TokenValue::same(fake::mac(rng)))
                .collect(),
            RuleKind::Guid => (0..token_count)
                .map(|_| TokenValue::same(uuid::Uuid::new_v4().to_string()))
                .collect(),
            RuleKind::Hex { digits } => (0..token_count)
                .map(|_| TokenValue::same(fake::hex_digits(rng, *digits)))
                .collect(),
            RuleKind::Url { parts } => (0..token_count)
                .map(|_| TokenValue::same(fake::url(rng, parts, &mut event.correlation)))
                .collect(),
            RuleKind::User { fields } => {
                lookup_rule::replace_user(fields, event, token_count, counters, rng)
            }
            RuleKind::Email => lookup_rule::replace_email(event, token_count, counters),
            RuleKind::HostFamily { family, fields } => lookup_rule::replace_host_family(
                *family,
                fields,
                event,
                token_count,
                counters,
                rng,
            ),
            RuleKind::SrcPort => (0..token_count)
                .map(|_| TokenValue::same(rng.gen_range(4000..=5000).to_string()))
                .collect(),
            RuleKind::DestPort => {
                const DEST_PORTS: &[u16] = &[80, 443, 25, 22, 21];
                (0..token_count)
                    .map(|_| {
                        TokenValue::same(DEST_PORTS.choose(rng).copied().unwrap().to_string())
                    })
                    .collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gen_core::EventMetadata;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::path::Path;

    fn token(token: &str, replacement: &str, rtype: ReplacementType) -> TokenConfig {
        TokenConfig {
            token: token.to_string(),
            replacement: replacement.to_string(),
            replacement_type: rtype,
            field: None,
        }
    }

    fn parse(config: &TokenConfig) -> Option<Rule> {
        Rule::parse(
            config,
            &EventMetadata::default(),
            Path::new("samples/sample.log"),
            "sample.log",
        )
    }

    fn event(text: &str) -> SampleEvent {
        SampleEvent::new(text, EventMetadata::default(), "sample.log")
    }

    #[test]
    fn test_static_dispatch() {
        let rule = parse(&token("##x##", "fixed", ReplacementType::Static)).unwrap();
        assert!(matches!(rule.kind, RuleKind::Static { .. }));
    }

    #[test]
    fn test_prefix_dispatch_prefers_longer_names() {
        let rule = parse(&token(
            "##p##",
            "src_port",
            ReplacementType::Random,
        ))
        .unwrap();
        assert!(matches!(rule.kind, RuleKind::SrcPort));
        let rule = parse(&token(
            "##s##",
            "src['ipv4']",
            ReplacementType::Random,
        ))
        .unwrap();
        assert!(matches!(
            rule.kind,
            RuleKind::HostFamily {
                family: HostFamily::Src,
                ..
            }
        ));
    }

    #[test]
    fn test_unknown_replacement_returns_none() {
        assert!(parse(&token("##x##", "nonsense[1]", ReplacementType::Random)).is_none());
    }

    #[test]
    fn test_malformed_integer_range_returns_none() {
        assert!(parse(&token("##x##", "integer[1:", ReplacementType::Random)).is_none());
    }

    #[test]
    fn test_all_demoted_to_random_for_unsupported_variant() {
        let rule = parse(&token("##x##", "ipv4", ReplacementType::All)).unwrap();
        assert_eq!(rule.replacement_type, ReplacementType::Random);
    }

    #[test]
    fn test_integer_random_in_range() {
        let rule = parse(&token("##n##", "integer[5:9]", ReplacementType::Random)).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let counters = SequenceCounters::new();
        let out = rule.apply(vec![event("n=##n##")], &counters, &mut rng);
        assert_eq!(out.len(), 1);
        let n: i64 = out[0].event.trim_start_matches("n=").parse().unwrap();
        assert!((5..=9).contains(&n));
    }

    #[test]
    fn test_integer_fan_out_multiplies_events() {
        let rule = parse(&token("##n##", "integer[1:4]", ReplacementType::All)).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let counters = SequenceCounters::new();
        let events = vec![event("n=##n##"), event("m=##n##")];
        let out = rule.apply(events, &counters, &mut rng);
        // 2 events x [1,4) = 6 clones, each with a distinct substitution.
        assert_eq!(out.len(), 6);
        assert_eq!(out[0].event, "n=1");
        assert_eq!(out[2].event, "n=3");
        assert_eq!(out[3].event, "m=1");
    }

    #[test]
    fn test_fan_out_clones_get_unique_hosts() {
        let rule = parse(&token("##n##", "integer[1:3]", ReplacementType::All)).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let counters = SequenceCounters::new();
        let out = rule.apply(vec![event("n=##n##")], &counters, &mut rng);
        assert_eq!(out.len(), 2);
        assert_ne!(out[0].metadata.host, out[1].metadata.host);
        assert!(out[0].metadata.host.starts_with("sample.log_"));
    }

    #[test]
    fn test_event_without_token_passes_through() {
        let rule = parse(&token("##n##", "integer[1:3]", ReplacementType::All)).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let counters = SequenceCounters::new();
        let out = rule.apply(vec![event("no tokens here")], &counters, &mut rng);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].event, "no tokens here");
    }

    #[test]
    fn test_float_precision_from_lower_bound() {
        let rule = parse(&token("##f##", "float[0.00:70.00]", ReplacementType::Random)).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let counters = SequenceCounters::new();
        let out = rule.apply(vec![event("f=##f##")], &counters, &mut rng);
        let decimals = out[0].event.split('.').nth(1).unwrap();
        assert_eq!(decimals.len(), 2);
    }

    #[test]
    fn test_list_exhaustive_in_order() {
        let rule = parse(&token(
            "##l##",
            "list['a','b','c']",
            ReplacementType::All,
        ))
        .unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let counters = SequenceCounters::new();
        let out = rule.apply(vec![event("v=##l##")], &counters, &mut rng);
        let values: Vec<_> = out.iter().map(|e| e.event.clone()).collect();
        assert_eq!(values, vec!["v=a", "v=b", "v=c"]);
    }

    #[test]
    fn test_time_registration_skipped_when_timestamp_is_plugin() {
        let config = TokenConfig {
            token: "##ts##".to_string(),
            replacement: "%s".to_string(),
            replacement_type: ReplacementType::Timestamp,
            field: Some("_time".to_string()),
        };
        let rule = parse(&config).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let counters = SequenceCounters::new();
        // Default metadata has timestamp_type = plugin.
        let out = rule.apply(vec![event("t=##ts##")], &counters, &mut rng);
        assert!(out[0].time_values.is_empty());
        assert!(!out[0].event.contains("##ts##"));
    }
}
