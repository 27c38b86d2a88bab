//! At-most-once generation across test worker processes.
//!
//! When a test session is split over workers, every worker constructs the
//! same generator but only one may run it. The worker context carries the
//! session's run id from the environment; when present, generation goes
//! through the cross-process [`corpus_cache::CorpusStore`]. Without a run id
//! this is a plain in-process generation.

use crate::generator::SampleGenerator;
use anyhow::Context;
use corpus_cache::CorpusStore;
use gen_core::SampleEvent;
use std::path::PathBuf;

pub const RUN_ID_ENV: &str = "SAMPLE_GEN_RUN_ID";
pub const CACHE_DIR_ENV: &str = "SAMPLE_GEN_CACHE_DIR";

/// Identity of the current worker's test session, read from the environment.
#[derive(Debug, Clone)]
pub struct WorkerContext {
    /// Shared id of the whole run; absent outside distributed sessions.
    pub run_id: Option<String>,
    pub cache_dir: PathBuf,
}

impl WorkerContext {
    pub fn from_env() -> Self {
        let run_id = std::env::var(RUN_ID_ENV).ok().filter(|id| !id.is_empty());
        let cache_dir = std::env::var_os(CACHE_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir);
        WorkerContext { run_id, cache_dir }
    }
}

pub struct SampleXdistGenerator {
    generator: SampleGenerator,
    context: WorkerContext,
}

impl SampleXdistGenerator {
    pub fn new(generator: SampleGenerator, context: WorkerContext) -> Self {
        SampleXdistGenerator { generator, context }
    }

    pub fn get_samples(&self) -> anyhow::Result<Vec<SampleEvent>> {
        match &self.context.run_id {
            Some(run_id) => {
                tracing::debug!(run_id, "Resolving corpus through cross-process store");
                let store = CorpusStore::new(&self.context.cache_dir, run_id);
                store
                    .get_or_generate(|| self.generator.get_samples())
                    .context("cross-process corpus store failed")
            }
            None => self.generator.get_samples(),
        }
    }
}
