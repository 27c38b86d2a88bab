//! Core types for the sample-gen event generation framework.
//!
//! This crate provides the foundational types used across the generation
//! pipeline, including:
//!
//! - [`EventMetadata`] - Typed stanza/event settings with coerce-and-warn parsing
//! - [`TokenConfig`] - One token-replacement entry from a stanza
//! - [`TokenValue`] - A (key, value) substitution pair
//! - [`SampleEvent`] - The mutable unit of work flowing through the rules
//! - [`CorrelationMap`] - Per-event cache keeping correlated field choices consistent
//! - [`SequenceCounters`] - Injectable uniqueness counters owned by the generator
//!
//! # Architecture
//!
//! ```text
//! gen-core (this crate)
//!    │
//!    ├─── token-rules   (rule dispatch and value synthesis)
//!    ├─── corpus-cache  (cross-process corpus store)
//!    └─── sample-gen    (stanza orchestration, config discovery, CLI)
//! ```

pub mod correlation;
pub mod counters;
pub mod event;
pub mod metadata;
pub mod token;

// Re-exports for convenience
pub use correlation::{CorrelationMap, FileSelection, UserRow};
pub use counters::SequenceCounters;
pub use event::{RequirementTestData, SampleEvent, KEY_FIELDS};
pub use metadata::{EventMetadata, HostType, InputType, TimestampType, Timezone};
pub use token::{ReplacementType, TokenConfig, TokenValue};
