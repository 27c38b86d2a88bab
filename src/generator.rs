//! Corpus generation across all discovered stanzas.

use crate::config::{ConfName, EventgenParser, PsaDataParser, PSA_DATA_CONFIG_FILE};
use crate::stanza::SampleStanza;
use anyhow::Context;
use gen_core::{SampleEvent, SequenceCounters};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::sync::Mutex;

/// Cap on concurrent sample file reads.
const MAX_READ_THREADS: usize = 20;

/// The corpus is generated once per process; repeated callers get the same
/// events. `clean_samples` resets the memo for independent sessions.
static GENERATED: Mutex<Option<Vec<SampleEvent>>> = Mutex::new(None);

pub struct SampleGenerator {
    addon_path: PathBuf,
    config_path: Option<PathBuf>,
    seed: u64,
}

impl SampleGenerator {
    pub fn new(addon_path: impl Into<PathBuf>, config_path: Option<PathBuf>, seed: u64) -> Self {
        SampleGenerator {
            addon_path: addon_path.into(),
            config_path,
            seed,
        }
    }

    /// Generate (or return the memoized) corpus.
    ///
    /// Raw sample reads fan out over a bounded thread pool; tokenization is
    /// sequential so the seeded RNG gives a reproducible corpus.
    pub fn get_samples(&self) -> anyhow::Result<Vec<SampleEvent>> {
        let mut memo = GENERATED.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(events) = memo.as_ref() {
            return Ok(events.clone());
        }

        let (conf_name, stanzas) = self.discover()?;
        tracing::info!(
            "Discovered {} sample stanza(s) from {conf_name:?} configuration",
            stanzas.len()
        );

        if !stanzas.is_empty() {
            let threads = stanzas.len().min(MAX_READ_THREADS);
            let per_thread = stanzas.len().div_ceil(threads);
            std::thread::scope(|scope| {
                for chunk in stanzas.chunks(per_thread) {
                    scope.spawn(move || {
                        for stanza in chunk {
                            stanza.load_raw();
                        }
                    });
                }
            });
        }

        let counters = SequenceCounters::new();
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut events = Vec::new();
        for stanza in &stanzas {
            events.extend(stanza.tokenize(&counters, &mut rng));
        }
        tracing::info!("Generated {} tokenized event(s)", events.len());

        *memo = Some(events.clone());
        Ok(events)
    }

    /// Forget the memoized corpus.
    pub fn clean_samples() {
        *GENERATED.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// The psa-data conf takes precedence; the legacy eventgen conf is the
    /// fallback.
    fn discover(&self) -> anyhow::Result<(ConfName, Vec<SampleStanza>)> {
        let config_dir = self
            .config_path
            .clone()
            .unwrap_or_else(|| self.addon_path.clone());
        if config_dir.join(PSA_DATA_CONFIG_FILE).exists() {
            let parser = PsaDataParser::new(&self.addon_path, self.config_path.clone());
            return Ok((ConfName::PsaData, parser.get_sample_stanzas()?));
        }
        let parser = EventgenParser::new(&self.addon_path, self.config_path.clone());
        let stanzas = parser.get_sample_stanzas().with_context(|| {
            format!(
                "no {PSA_DATA_CONFIG_FILE} or eventgen.conf found under {}",
                config_dir.display()
            )
        })?;
        Ok((ConfName::Eventgen, stanzas))
    }
}
