//! Legacy `eventgen.conf` parsing.
//!
//! Same grammar and stanza-to-sample matching as the psa-data parser; the
//! legacy conf is only consulted when `pytest-splunk-addon-data.conf` is
//! absent, and its stanzas honor `count` during tokenization.

use super::{build_sample_stanzas, conf, path_to_samples, ConfName};
use crate::stanza::SampleStanza;
use anyhow::Context;
use std::path::PathBuf;

pub const EVENTGEN_CONFIG_FILE: &str = "eventgen.conf";

pub struct EventgenParser {
    addon_path: PathBuf,
    config_path: PathBuf,
}

impl EventgenParser {
    pub fn new(addon_path: impl Into<PathBuf>, config_path: Option<PathBuf>) -> Self {
        let addon_path = addon_path.into();
        let config_path = config_path.unwrap_or_else(|| addon_path.clone());
        EventgenParser {
            addon_path,
            config_path,
        }
    }

    /// The conf may sit next to the samples config or in the add-on's
    /// `default/` directory.
    pub fn conf_file(&self) -> Option<PathBuf> {
        let candidates = [
            self.config_path.join(EVENTGEN_CONFIG_FILE),
            self.addon_path.join("default").join(EVENTGEN_CONFIG_FILE),
            self.addon_path.join(EVENTGEN_CONFIG_FILE),
        ];
        candidates.into_iter().find(|c| c.exists())
    }

    pub fn get_sample_stanzas(&self) -> anyhow::Result<Vec<SampleStanza>> {
        let conf_file = self
            .conf_file()
            .with_context(|| format!("{EVENTGEN_CONFIG_FILE} not found"))?;
        let text = std::fs::read_to_string(&conf_file)
            .with_context(|| format!("failed to read {}", conf_file.display()))?;
        let stanzas = conf::parse(&text);
        let samples_dir = path_to_samples(&self.config_path, &self.addon_path);
        Ok(build_sample_stanzas(
            &stanzas,
            &samples_dir,
            ConfName::Eventgen,
        ))
    }
}
