//! Splunk-style `.conf` grammar.

use std::collections::BTreeMap;

/// One `[stanza]` block with its key/value settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfStanza {
    pub name: String,
    pub settings: BTreeMap<String, String>,
}

/// Parse `.conf` text into stanzas.
///
/// `#` and `;` start comment lines, a trailing `\` continues the value on
/// the next line, keys before the first stanza header are ignored. A key
/// repeated within a stanza keeps the last value.
pub fn parse(text: &str) -> Vec<ConfStanza> {
    let mut stanzas: Vec<ConfStanza> = Vec::new();
    for line in logical_lines(text) {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }
        if let Some(name) = trimmed
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
        {
            stanzas.push(ConfStanza {
                name: name.to_string(),
                settings: BTreeMap::new(),
            });
            continue;
        }
        let Some((key, value)) = trimmed.split_once('=') else {
            tracing::warn!("Ignoring conf line without '=': '{trimmed}'");
            continue;
        };
        match stanzas.last_mut() {
            Some(stanza) => {
                stanza
                    .settings
                    .insert(key.trim().to_string(), value.trim().to_string());
            }
            None => tracing::warn!("Ignoring setting before first stanza: '{trimmed}'"),
        }
    }
    stanzas
}

/// Join backslash-continued lines, keeping the newline in the value so
/// multi-line breaker patterns survive.
fn logical_lines(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    for line in text.lines() {
        match line.strip_suffix('\\') {
            Some(head) => {
                current.push_str(head);
                current.push('\n');
            }
            None => {
                current.push_str(line);
                out.push(std::mem::take(&mut current));
            }
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_stanzas() {
        let stanzas = parse(
            "# header comment\n\
             [sample.log]\n\
             input_type = modinput\n\
             count = 5\n\
             \n\
             [other.log]\n\
             host = fw-01\n",
        );
        assert_eq!(stanzas.len(), 2);
        assert_eq!(stanzas[0].name, "sample.log");
        assert_eq!(stanzas[0].settings["input_type"], "modinput");
        assert_eq!(stanzas[1].settings["host"], "fw-01");
    }

    #[test]
    fn test_values_keep_embedded_equals() {
        let stanzas = parse("[s]\ntoken.0.token = ##key=value##\n");
        assert_eq!(stanzas[0].settings["token.0.token"], "##key=value##");
    }

    #[test]
    fn test_continuation_lines_join_with_newline() {
        let stanzas = parse("[s]\nbreaker = first\\\nsecond\n");
        assert_eq!(stanzas[0].settings["breaker"], "first\nsecond");
    }

    #[test]
    fn test_settings_before_stanza_ignored() {
        let stanzas = parse("orphan = 1\n[s]\nkey = 2\n");
        assert_eq!(stanzas.len(), 1);
        assert!(!stanzas[0].settings.contains_key("orphan"));
    }

    #[test]
    fn test_repeated_key_keeps_last() {
        let stanzas = parse("[s]\ncount = 1\ncount = 2\n");
        assert_eq!(stanzas[0].settings["count"], "2");
    }
}
