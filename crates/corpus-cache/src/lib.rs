//! Cross-process corpus store.
//!
//! When a test session is split across worker processes, only one worker may
//! pay the cost of tokenizing the samples; the others must see the exact
//! same corpus. The store is a JSON file keyed by the session's run id and
//! guarded by an exclusive advisory lock: the first worker to take the lock
//! generates and writes, every later worker finds the file and reads it.
//!
//! A cache file that cannot be decoded, or that was written with a different
//! schema version, is an error rather than a trigger for regeneration. The
//! workers of one session must agree on the corpus, and silently rebuilding
//! it in one worker would hand that worker different events.

use fs2::FileExt;
use gen_core::SampleEvent;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Format version of the stored corpus. Bump when the serialized shape of
/// [`SampleEvent`] changes.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("corpus cache io: {0}")]
    Io(#[from] std::io::Error),

    #[error("corpus cache at {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to encode corpus: {0}")]
    Encode(serde_json::Error),

    #[error("corpus generation failed: {0}")]
    Generate(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("corpus cache at {path} has schema version {found}, expected {expected}")]
    SchemaMismatch {
        path: PathBuf,
        found: u32,
        expected: u32,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct CachedCorpus {
    schema_version: u32,
    run_id: String,
    events: Vec<SampleEvent>,
}

/// One session's corpus file plus the lock protecting its creation.
pub struct CorpusStore {
    path: PathBuf,
    run_id: String,
}

impl CorpusStore {
    pub fn new(dir: impl Into<PathBuf>, run_id: &str) -> Self {
        CorpusStore {
            path: dir.into().join(format!("sample_gen_corpus_{run_id}.json")),
            run_id: run_id.to_string(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Return the session's corpus, generating and storing it first if this
    /// is the first worker to arrive. Across all processes sharing the
    /// store's directory and run id, `generate` runs at most once; a failed
    /// generation stores nothing, so a later worker retries it.
    pub fn get_or_generate<E>(
        &self,
        generate: impl FnOnce() -> Result<Vec<SampleEvent>, E>,
    ) -> Result<Vec<SampleEvent>, CacheError>
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let lock_path = self.path.with_extension("lock");
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)?;
        lock.lock_exclusive()?;
        let result = self.locked_get_or_generate(generate);
        // Dropping the handle releases the lock too; unlock explicitly so an
        // error surfaces instead of vanishing.
        FileExt::unlock(&lock)?;
        result
    }

    fn locked_get_or_generate<E>(
        &self,
        generate: impl FnOnce() -> Result<Vec<SampleEvent>, E>,
    ) -> Result<Vec<SampleEvent>, CacheError>
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        if self.path.exists() {
            let content = fs::read_to_string(&self.path)?;
            let cached: CachedCorpus =
                serde_json::from_str(&content).map_err(|source| CacheError::Corrupt {
                    path: self.path.clone(),
                    source,
                })?;
            if cached.schema_version != SCHEMA_VERSION {
                return Err(CacheError::SchemaMismatch {
                    path: self.path.clone(),
                    found: cached.schema_version,
                    expected: SCHEMA_VERSION,
                });
            }
            tracing::debug!(
                run_id = %self.run_id,
                "Read {} events from corpus cache at {}",
                cached.events.len(),
                self.path.display()
            );
            return Ok(cached.events);
        }

        let events = generate().map_err(|err| CacheError::Generate(err.into()))?;
        let cached = CachedCorpus {
            schema_version: SCHEMA_VERSION,
            run_id: self.run_id.clone(),
            events,
        };
        // Write-then-rename so a crash mid-write never leaves a half-written
        // file that a later worker would reject as corrupt.
        let tmp = self.path.with_extension("json.tmp");
        let encoded = serde_json::to_string(&cached).map_err(CacheError::Encode)?;
        fs::write(&tmp, encoded)?;
        fs::rename(&tmp, &self.path)?;
        tracing::info!(
            run_id = %self.run_id,
            "Stored {} generated events to corpus cache at {}",
            cached.events.len(),
            self.path.display()
        );
        Ok(cached.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gen_core::EventMetadata;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn corpus() -> Result<Vec<SampleEvent>, std::io::Error> {
        Ok(vec![
            SampleEvent::new("event one", EventMetadata::default(), "sample.log"),
            SampleEvent::new("event two", EventMetadata::default(), "sample.log"),
        ])
    }

    #[test]
    fn test_generates_then_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = CorpusStore::new(dir.path(), "run1");
        let calls = AtomicUsize::new(0);

        let first = store
            .get_or_generate(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                corpus()
            })
            .unwrap();
        let second = store
            .get_or_generate(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                corpus()
            })
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(first, second);
        assert_eq!(first[0].event, "event one");
    }

    #[test]
    fn test_separate_run_ids_do_not_share() {
        let dir = tempfile::tempdir().unwrap();
        let a = CorpusStore::new(dir.path(), "run1");
        let b = CorpusStore::new(dir.path(), "run2");
        a.get_or_generate(corpus).unwrap();
        let calls = AtomicUsize::new(0);
        b.get_or_generate(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            corpus()
        })
        .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_generation_stores_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = CorpusStore::new(dir.path(), "run1");
        let err = store
            .get_or_generate(|| Err(std::io::Error::other("generation broke")))
            .unwrap_err();
        assert!(matches!(err, CacheError::Generate(_)));
        assert!(!store.path().exists());
        // The next worker retries and succeeds.
        let events = store.get_or_generate(corpus).unwrap();
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_corrupt_cache_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = CorpusStore::new(dir.path(), "run1");
        fs::write(store.path(), "not json").unwrap();
        let err = store.get_or_generate(corpus).unwrap_err();
        assert!(matches!(err, CacheError::Corrupt { .. }));
    }

    #[test]
    fn test_schema_mismatch_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = CorpusStore::new(dir.path(), "run1");
        fs::write(
            store.path(),
            r#"{"schema_version":999,"run_id":"run1","events":[]}"#,
        )
        .unwrap();
        let err = store.get_or_generate(corpus).unwrap_err();
        assert!(matches!(err, CacheError::SchemaMismatch { found: 999, .. }));
    }

    #[test]
    fn test_concurrent_workers_generate_once() {
        let dir = tempfile::tempdir().unwrap();
        let calls = AtomicUsize::new(0);
        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    let store = CorpusStore::new(dir.path(), "run1");
                    let events = store
                        .get_or_generate(|| {
                            calls.fetch_add(1, Ordering::SeqCst);
                            corpus()
                        })
                        .unwrap();
                    assert_eq!(events.len(), 2);
                });
            }
        });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
