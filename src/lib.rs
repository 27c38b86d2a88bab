//! sample-gen
//!
//! Declarative sample tokenization and synthetic log event generation for
//! Splunk add-on test suites.
//!
//! An add-on ships raw sample files plus a `pytest-splunk-addon-data.conf`
//! (or legacy `eventgen.conf`) describing how to expand them: each stanza
//! binds a sample file to token-replacement rules and ingestion metadata.
//! The generator turns that into a bounded corpus of tokenized events with
//! per-event key-field bookkeeping for index-time verification.
//!
//! # Pipeline
//!
//! ```text
//! .conf discovery ─► SampleStanza (split raw sample into events)
//!                        │
//!                        ▼
//!                  token-rules (Rule::apply per token, seeded RNG)
//!                        │
//!                        ▼
//!            SampleGenerator (memoized corpus)
//!                        │
//!                        ▼
//!        SampleXdistGenerator (at-most-once across worker processes)
//! ```
//!
//! Configuration defects never abort generation: invalid settings coerce to
//! their defaults with a warning, malformed rules are skipped leaving the
//! raw token visible. Only cross-process cache corruption is a hard error.

use clap::Parser;
use std::path::PathBuf;

pub mod config;
pub mod generator;
pub mod stanza;
pub mod xdist;

pub use generator::SampleGenerator;
pub use stanza::{SampleStanza, BULK_EVENT_COUNT};
pub use xdist::{SampleXdistGenerator, WorkerContext};

/// Where the add-on lives and how to seed generation.
#[derive(Parser, Clone, Debug)]
pub struct GeneratorOpts {
    /// Path to the Splunk add-on under test
    #[arg(long, env = "SAMPLE_GEN_ADDON_PATH")]
    pub addon_path: PathBuf,

    /// Directory holding pytest-splunk-addon-data.conf or eventgen.conf
    /// (defaults to the add-on path)
    #[arg(long, env = "SAMPLE_GEN_CONFIG_PATH")]
    pub config_path: Option<PathBuf>,

    /// RNG seed; the same seed over the same samples gives the same corpus
    #[arg(long, default_value_t = 42, env = "SAMPLE_GEN_SEED")]
    pub seed: u64,
}
