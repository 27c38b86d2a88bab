//! Configuration discovery and parsing.
//!
//! Stanza configuration comes from one of two Splunk-style `.conf` files:
//! `pytest-splunk-addon-data.conf` (preferred) or the legacy `eventgen.conf`.
//! Both share the same grammar; they differ in how the required event count
//! is interpreted during tokenization.

pub mod conf;
pub mod eventgen;
pub mod psa_data;

use crate::stanza::SampleStanza;
use gen_core::{ReplacementType, TokenConfig};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub use conf::ConfStanza;
pub use eventgen::{EventgenParser, EVENTGEN_CONFIG_FILE};
pub use psa_data::{PsaDataParser, PSA_DATA_CONFIG_FILE};

/// Which configuration file the stanzas came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfName {
    /// `pytest-splunk-addon-data.conf`; tokenize targets one raw pass.
    PsaData,
    /// Legacy `eventgen.conf`; tokenize honors the stanza `count`.
    Eventgen,
}

/// Resolve the `samples/` directory: the config directory, its parent, then
/// the add-on directory, first hit wins.
fn path_to_samples(config_path: &Path, addon_path: &Path) -> PathBuf {
    let candidates = [
        config_path.join("samples"),
        config_path
            .parent()
            .unwrap_or(config_path)
            .join("samples"),
        addon_path.join("samples"),
    ];
    for candidate in &candidates {
        if candidate.exists() {
            tracing::info!("Samples path is: {}", candidate.display());
            return candidate.clone();
        }
    }
    tracing::info!("Samples path is: {}", candidates[2].display());
    candidates[2].clone()
}

/// Group a stanza's `token.<n>.<param>` settings into token configs, in
/// first-appearance order of `<n>`.
fn group_tokens(settings: &BTreeMap<String, String>, stanza: &str) -> Vec<TokenConfig> {
    let mut order: Vec<String> = Vec::new();
    let mut partial: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
    for (key, value) in settings {
        let mut parts = key.splitn(3, '.');
        if parts.next() != Some("token") {
            continue;
        }
        let (Some(id), Some(param)) = (parts.next(), parts.next()) else {
            tracing::warn!(stanza, "Ignoring malformed token setting '{key}'");
            continue;
        };
        if !partial.contains_key(id) {
            order.push(id.to_string());
        }
        partial
            .entry(id.to_string())
            .or_default()
            .insert(param.to_string(), value.clone());
    }

    let mut tokens = Vec::with_capacity(order.len());
    for id in order {
        let params = &partial[&id];
        let Some(token) = params.get("token") else {
            tracing::warn!(stanza, "token.{id} has no 'token' pattern, skipping");
            continue;
        };
        let replacement = params.get("replacement").cloned().unwrap_or_default();
        let replacement_type = ReplacementType::parse_lossy(
            params.get("replacementType").map(String::as_str).unwrap_or(""),
            token,
        );
        tokens.push(TokenConfig {
            token: token.clone(),
            replacement,
            replacement_type,
            field: params.get("field").cloned(),
        });
    }
    tokens
}

/// Match conf stanzas against the files of the samples directory and build a
/// [`SampleStanza`] per matched sample file. A stanza name is a regex that
/// must match a whole file name. Stanzas matching no file warn.
fn build_sample_stanzas(
    stanzas: &[ConfStanza],
    samples_dir: &Path,
    conf_name: ConfName,
) -> Vec<SampleStanza> {
    let mut sample_files: Vec<String> = match std::fs::read_dir(samples_dir) {
        Ok(entries) => entries
            .filter_map(Result::ok)
            .filter_map(|e| e.file_name().into_string().ok())
            .collect(),
        Err(_) => {
            tracing::warn!("Samples directory not found: {}", samples_dir.display());
            Vec::new()
        }
    };
    sample_files.sort();

    let mut results = Vec::new();
    for stanza in stanzas {
        let pattern = match regex::Regex::new(&stanza.name) {
            Ok(pattern) => pattern,
            Err(err) => {
                tracing::warn!("Invalid stanza pattern '{}': {err}", stanza.name);
                continue;
            }
        };
        let mut matched = false;
        for file_name in &sample_files {
            let whole = pattern
                .find(file_name)
                .map(|m| m.as_str() == file_name)
                .unwrap_or(false);
            if !whole {
                continue;
            }
            matched = true;
            let tokens = group_tokens(&stanza.settings, &stanza.name);
            results.push(SampleStanza::new(
                samples_dir.join(file_name),
                &stanza.settings,
                &tokens,
                conf_name,
            ));
        }
        if !matched {
            tracing::warn!("No sample file found for stanza : {}", stanza.name);
        }
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_group_tokens_in_first_appearance_order() {
        let settings = settings(&[
            ("token.0.token", "##a##"),
            ("token.0.replacementType", "static"),
            ("token.0.replacement", "x"),
            ("token.10.token", "##b##"),
            ("token.10.replacementType", "random"),
            ("token.10.replacement", "integer[1:5]"),
            ("token.2.token", "##c##"),
            ("token.2.replacementType", "timestamp"),
            ("token.2.replacement", "%s"),
            ("token.2.field", "_time"),
            ("count", "5"),
        ]);
        let tokens = group_tokens(&settings, "sample.log");
        // BTreeMap iteration orders keys lexically: 0, 10, 2.
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].token, "##a##");
        assert_eq!(tokens[0].replacement_type, ReplacementType::Static);
        assert_eq!(tokens[1].token, "##b##");
        assert_eq!(tokens[2].field.as_deref(), Some("_time"));
    }

    #[test]
    fn test_group_tokens_skips_patternless_entry() {
        let settings = settings(&[("token.0.replacement", "x")]);
        assert!(group_tokens(&settings, "sample.log").is_empty());
    }

    #[test]
    fn test_stanza_must_match_whole_file_name() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("sample.log"), "event").unwrap();
        std::fs::write(dir.path().join("sample.log.bak"), "event").unwrap();
        let stanzas = vec![ConfStanza {
            name: r"sample\.log".to_string(),
            settings: BTreeMap::new(),
        }];
        let built = build_sample_stanzas(&stanzas, dir.path(), ConfName::PsaData);
        // `.bak` is a partial match and must not produce a stanza.
        assert_eq!(built.len(), 1);
        assert_eq!(built[0].sample_name, "sample.log");
    }

    #[test]
    fn test_wildcard_stanza_matches_many_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.log"), "event").unwrap();
        std::fs::write(dir.path().join("b.log"), "event").unwrap();
        let stanzas = vec![ConfStanza {
            name: r".*\.log".to_string(),
            settings: BTreeMap::new(),
        }];
        let built = build_sample_stanzas(&stanzas, dir.path(), ConfName::PsaData);
        assert_eq!(built.len(), 2);
    }
}
