//! Correlated identity and host-family replacements.
//!
//! User and email tokens share synthetic identity rows: the email drawn for
//! the Nth email token of an event belongs to the same identity as the Nth
//! user token. Host-family tokens (`host`, `src`, `dest`, `dvc`) cache one
//! value per requested field per family, so a `src['ipv4']` and a
//! `src['host']` token in the same event describe the same machine.

use crate::fake;
use gen_core::{SampleEvent, SequenceCounters, TokenValue, UserRow};
use rand::seq::SliceRandom;
use rand::Rng;

/// The four host-like rule families. Each family keeps its own correlated
/// row, so `src` and `dest` tokens never collapse onto one machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostFamily {
    Host,
    Src,
    Dest,
    Dvc,
}

impl HostFamily {
    pub fn rule_name(self) -> &'static str {
        match self {
            HostFamily::Host => "host",
            HostFamily::Src => "src",
            HostFamily::Dest => "dest",
            HostFamily::Dvc => "dvc",
        }
    }
}

/// Replace user tokens, reusing the event's identity rows in occurrence
/// order and synthesizing new ones past the end.
pub fn replace_user<R: Rng>(
    fields: &[String],
    event: &mut SampleEvent,
    token_count: usize,
    counters: &SequenceCounters,
    rng: &mut R,
) -> Vec<TokenValue> {
    (0..token_count)
        .map(|i| {
            let row = identity_row(event, i, counters);
            let field = fields.choose(rng).map(String::as_str).unwrap_or("name");
            let value = row.get(field).unwrap_or(&row.name).to_string();
            TokenValue::same(value)
        })
        .collect()
}

/// Replace email tokens with the email of the identity row at the same
/// occurrence position.
pub fn replace_email(
    event: &mut SampleEvent,
    token_count: usize,
    counters: &SequenceCounters,
) -> Vec<TokenValue> {
    (0..token_count)
        .map(|i| TokenValue::same(identity_row(event, i, counters).email.clone()))
        .collect()
}

fn identity_row<'a>(
    event: &'a mut SampleEvent,
    occurrence: usize,
    counters: &SequenceCounters,
) -> &'a UserRow {
    while event.correlation.user_rows.len() <= occurrence {
        event
            .correlation
            .user_rows
            .push(UserRow::synthesize(counters.next_user()));
    }
    &event.correlation.user_rows[occurrence]
}

/// Replace a host-family token. Each occurrence picks one of the requested
/// fields at random; the value for a field is synthesized once per family
/// per event and cached.
pub fn replace_host_family<R: Rng>(
    family: HostFamily,
    fields: &[String],
    event: &mut SampleEvent,
    token_count: usize,
    counters: &SequenceCounters,
    rng: &mut R,
) -> Vec<TokenValue> {
    let rule = family.rule_name();
    let mut values = Vec::with_capacity(token_count);
    for _ in 0..token_count {
        let Some(field) = fields.choose(rng).cloned() else {
            break;
        };
        let cached = event
            .correlation
            .host_rows
            .get(rule)
            .and_then(|row| row.get(&field))
            .cloned();
        let value = match cached {
            Some(value) => value,
            None => {
                let fresh = match field.as_str() {
                    "host" => host_candidate(family, event, counters),
                    "fqdn" => format!("{rule}-{}.sample.com", counters.next_fqdn()),
                    "ipv4" => fake::ipv4(rng),
                    "ipv6" => fake::ipv6(rng),
                    _ => continue,
                };
                event
                    .correlation
                    .host_rows
                    .entry(rule.to_string())
                    .or_default()
                    .insert(field, fresh.clone());
                fresh
            }
        };
        values.push(TokenValue::same(value));
    }
    values
}

/// The `host` field of the `host` family must agree with the host the event
/// is ingested under when the input supplies it; other families get a
/// synthetic hostname of their own.
fn host_candidate(
    family: HostFamily,
    event: &SampleEvent,
    counters: &SequenceCounters,
) -> String {
    match family {
        HostFamily::Host => {
            if event.metadata.input_type.host_from_input() {
                event.metadata.host.clone()
            } else {
                format!("host_{}_{}", event.sample_name, counters.next_event_host())
            }
        }
        _ => format!(
            "{}-host-{}",
            family.rule_name(),
            counters.next_field_host()
        ),
    }
}
