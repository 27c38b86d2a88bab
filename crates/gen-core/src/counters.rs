//! Uniqueness counters owned by the generator.
//!
//! The original design relied on process-global mutable counters to keep
//! synthesized hosts and user rows unique. Here they are an explicit object
//! the generator owns and passes down, so tests can inject fresh sequences
//! and independent sessions do not leak state into each other.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic sequences for values that must be unique across a generation run.
#[derive(Debug, Default)]
pub struct SequenceCounters {
    user_email: AtomicU64,
    event_host: AtomicU64,
    field_host: AtomicU64,
    fqdn: AtomicU64,
}

impl SequenceCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next sequence number for a synthesized user/email row.
    pub fn next_user(&self) -> u64 {
        self.user_email.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Next suffix making each fanned-out event's host distinguishable.
    pub fn next_event_host(&self) -> u64 {
        self.event_host.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Next suffix for a synthesized `host` candidate of a key-field rule.
    pub fn next_field_host(&self) -> u64 {
        self.field_host.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Next suffix for a synthesized fqdn candidate.
    pub fn next_fqdn(&self) -> u64 {
        self.fqdn.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Reset all sequences. Called between independent test sessions.
    pub fn reset(&self) {
        self.user_email.store(0, Ordering::Relaxed);
        self.event_host.store(0, Ordering::Relaxed);
        self.field_host.store(0, Ordering::Relaxed);
        self.fqdn.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequences_start_at_one() {
        let counters = SequenceCounters::new();
        assert_eq!(counters.next_user(), 1);
        assert_eq!(counters.next_user(), 2);
        assert_eq!(counters.next_event_host(), 1);
    }

    #[test]
    fn test_reset_restarts_sequences() {
        let counters = SequenceCounters::new();
        counters.next_user();
        counters.next_field_host();
        counters.reset();
        assert_eq!(counters.next_user(), 1);
        assert_eq!(counters.next_field_host(), 1);
    }
}
