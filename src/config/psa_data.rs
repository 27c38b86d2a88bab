//! `pytest-splunk-addon-data.conf` parsing.

use super::{build_sample_stanzas, conf, path_to_samples, ConfName};
use crate::stanza::SampleStanza;
use anyhow::Context;
use std::path::PathBuf;

pub const PSA_DATA_CONFIG_FILE: &str = "pytest-splunk-addon-data.conf";

/// Parses `pytest-splunk-addon-data.conf` and resolves its stanzas against
/// the add-on's samples directory.
pub struct PsaDataParser {
    addon_path: PathBuf,
    config_path: PathBuf,
}

impl PsaDataParser {
    /// `config_path` defaults to the add-on path when not given.
    pub fn new(addon_path: impl Into<PathBuf>, config_path: Option<PathBuf>) -> Self {
        let addon_path = addon_path.into();
        let config_path = config_path.unwrap_or_else(|| addon_path.clone());
        PsaDataParser {
            addon_path,
            config_path,
        }
    }

    pub fn conf_file(&self) -> PathBuf {
        self.config_path.join(PSA_DATA_CONFIG_FILE)
    }

    /// One [`SampleStanza`] per (stanza, matching sample file) pair.
    pub fn get_sample_stanzas(&self) -> anyhow::Result<Vec<SampleStanza>> {
        let conf_file = self.conf_file();
        let text = std::fs::read_to_string(&conf_file)
            .with_context(|| format!("failed to read {}", conf_file.display()))?;
        let stanzas = conf::parse(&text);
        let samples_dir = path_to_samples(&self.config_path, &self.addon_path);
        Ok(build_sample_stanzas(
            &stanzas,
            &samples_dir,
            ConfName::PsaData,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stanzas_resolved_against_samples_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("samples")).unwrap();
        std::fs::write(dir.path().join("samples/web.log"), "raw event").unwrap();
        std::fs::write(
            dir.path().join(PSA_DATA_CONFIG_FILE),
            "[web.log]\n\
             input_type = file_monitor\n\
             token.0.token = ##int##\n\
             token.0.replacementType = random\n\
             token.0.replacement = integer[1:5]\n",
        )
        .unwrap();

        let parser = PsaDataParser::new(dir.path(), None);
        let stanzas = parser.get_sample_stanzas().unwrap();
        assert_eq!(stanzas.len(), 1);
        assert_eq!(stanzas[0].sample_name, "web.log");
    }

    #[test]
    fn test_missing_conf_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let parser = PsaDataParser::new(dir.path(), None);
        assert!(parser.get_sample_stanzas().is_err());
    }
}
