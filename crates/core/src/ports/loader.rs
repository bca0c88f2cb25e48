//! Batched, request-scoped key loading.
//!
//! [`BatchKeyLoader`] coalesces by-key lookups into one batched query per
//! invocation wave against an injected [`KeyFetcher`], deduplicates repeated
//! keys, preserves input order in its results, and tolerates missing keys
//! (a key with no matching record yields `None`, never an error).
//!
//! One loader instance is constructed per inbound API request and discarded
//! with it; the cache never outlives the request. Concurrent calls on the
//! same instance serialize on the cache, so overlapping key sets never issue
//! duplicate underlying queries for the same key.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::error;

use crate::error::{ConnectionError, ConnectionResult, FetchError, FetchResult};
use crate::metrics::record_loader_batch;
use crate::models::{Keyed, Viewer};

// =============================================================================
// Fetcher Seam
// =============================================================================

/// Batched key-lookup backend for a [`BatchKeyLoader`].
///
/// Implementations issue one query for the whole key set and return whatever
/// records exist; keys without a match are simply absent from the result.
#[async_trait]
pub trait KeyFetcher: Send + Sync {
    /// Record type this fetcher resolves.
    type Value: Keyed + Clone + Send + Sync;

    /// Fetch all records matching `keys` in a single batched query.
    async fn fetch_keys(&self, keys: &[String]) -> FetchResult<Vec<Self::Value>>;
}

// =============================================================================
// Loader
// =============================================================================

/// Cached value: `None` records a confirmed miss so repeated lookups of an
/// unknown key never re-query.
type Cache<V> = HashMap<String, Option<V>>;

/// Request-scoped batching loader for by-key lookups.
pub struct BatchKeyLoader<V: Keyed + Clone + Send + Sync + 'static> {
    /// Loader name for diagnostics (e.g. "domain").
    name: &'static str,
    /// User-facing subject for the generic failure message.
    subject: &'static str,
    fetcher: Arc<dyn KeyFetcher<Value = V>>,
    viewer: Viewer,
    cache: Mutex<Cache<V>>,
}

impl<V: Keyed + Clone + Send + Sync + 'static> BatchKeyLoader<V> {
    pub fn new(
        name: &'static str,
        subject: &'static str,
        fetcher: Arc<dyn KeyFetcher<Value = V>>,
    ) -> Self {
        Self {
            name,
            subject,
            fetcher,
            viewer: Viewer::anonymous(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Attach the acting user for diagnostics.
    pub fn for_viewer(mut self, viewer: &Viewer) -> Self {
        self.viewer = viewer.clone();
        self
    }

    /// Load one record by key. Unknown keys yield `None`.
    pub async fn load(&self, key: &str) -> ConnectionResult<Option<V>> {
        let mut results = self.load_many(&[key.to_string()]).await?;
        Ok(results.pop().flatten())
    }

    /// Load many records by key, returning results in input order.
    ///
    /// Duplicate keys resolve to the same cached record without duplicate
    /// work; all cache misses are fetched in one batched query.
    pub async fn load_many(&self, keys: &[String]) -> ConnectionResult<Vec<Option<V>>> {
        let mut cache = self.cache.lock().await;

        let mut seen = HashSet::new();
        let misses: Vec<String> = keys
            .iter()
            .filter(|k| !cache.contains_key(*k) && seen.insert((*k).clone()))
            .cloned()
            .collect();

        if !misses.is_empty() {
            record_loader_batch(self.name, keys.len(), misses.len());
            let fetched = self
                .fetcher
                .fetch_keys(&misses)
                .await
                .map_err(|e| self.unavailable(e))?;
            for value in fetched {
                cache.insert(value.key().to_string(), Some(value));
            }
            // Requested keys the query did not return are confirmed misses.
            for key in &misses {
                cache.entry(key.clone()).or_insert(None);
            }
        }

        Ok(keys
            .iter()
            .map(|k| cache.get(k).cloned().flatten())
            .collect())
    }

    fn unavailable(&self, err: FetchError) -> ConnectionError {
        error!(
            loader = self.name,
            user = self.viewer.log_key(),
            kind = err.kind(),
            error = %err,
            "batched key lookup failed"
        );
        ConnectionError::Unavailable {
            subject: self.subject.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Record {
        key: String,
    }

    impl Keyed for Record {
        fn key(&self) -> &str {
            &self.key
        }
    }

    struct MockFetcher {
        known: Vec<&'static str>,
        fail: Option<FetchError>,
        calls: Mutex<Vec<Vec<String>>>,
        query_count: AtomicUsize,
    }

    impl MockFetcher {
        fn with_keys(known: Vec<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                known,
                fail: None,
                calls: Mutex::new(Vec::new()),
                query_count: AtomicUsize::new(0),
            })
        }

        fn failing(err: FetchError) -> Arc<Self> {
            Arc::new(Self {
                known: Vec::new(),
                fail: Some(err),
                calls: Mutex::new(Vec::new()),
                query_count: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl KeyFetcher for MockFetcher {
        type Value = Record;

        async fn fetch_keys(&self, keys: &[String]) -> FetchResult<Vec<Record>> {
            self.query_count.fetch_add(1, Ordering::SeqCst);
            self.calls.lock().await.push(keys.to_vec());
            if let Some(err) = &self.fail {
                return Err(err.clone());
            }
            Ok(keys
                .iter()
                .filter(|k| self.known.contains(&k.as_str()))
                .map(|k| Record { key: k.clone() })
                .collect())
        }
    }

    fn loader(fetcher: Arc<MockFetcher>) -> BatchKeyLoader<Record> {
        BatchKeyLoader::new("domain", "domain", fetcher)
    }

    // Test critique: les clés dupliquées ne déclenchent qu'une seule requête
    #[tokio::test]
    async fn duplicate_keys_are_deduplicated() {
        let fetcher = MockFetcher::with_keys(vec!["k1", "k2"]);
        let loader = loader(fetcher.clone());

        let results = loader
            .load_many(&["k1".into(), "k2".into(), "k1".into()])
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0], results[2]);
        assert_eq!(results[0].as_ref().unwrap().key, "k1");
        assert_eq!(fetcher.query_count.load(Ordering::SeqCst), 1);
        assert_eq!(
            fetcher.calls.lock().await[0],
            vec!["k1".to_string(), "k2".to_string()]
        );
    }

    #[tokio::test]
    async fn unknown_keys_yield_none_not_an_error() {
        let fetcher = MockFetcher::with_keys(vec!["k1"]);
        let loader = loader(fetcher.clone());

        assert!(loader.load("missing").await.unwrap().is_none());
        assert!(loader.load("k1").await.unwrap().is_some());

        let results = loader
            .load_many(&["k1".into(), "missing".into()])
            .await
            .unwrap();
        assert!(results[0].is_some());
        assert!(results[1].is_none());
    }

    #[tokio::test]
    async fn cache_spans_calls_within_one_instance() {
        let fetcher = MockFetcher::with_keys(vec!["k1", "k2"]);
        let loader = loader(fetcher.clone());

        loader.load("k1").await.unwrap();
        loader.load("k1").await.unwrap();
        loader.load_many(&["k1".into(), "k2".into()]).await.unwrap();

        // k1 resolved once; the second wave only fetched k2.
        assert_eq!(fetcher.query_count.load(Ordering::SeqCst), 2);
        let calls = fetcher.calls.lock().await;
        assert_eq!(calls[0], vec!["k1".to_string()]);
        assert_eq!(calls[1], vec!["k2".to_string()]);
    }

    #[tokio::test]
    async fn confirmed_misses_are_cached() {
        let fetcher = MockFetcher::with_keys(vec![]);
        let loader = loader(fetcher.clone());

        assert!(loader.load("ghost").await.unwrap().is_none());
        assert!(loader.load("ghost").await.unwrap().is_none());
        assert_eq!(fetcher.query_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn rejected_query_surfaces_the_generic_message() {
        let fetcher = MockFetcher::failing(FetchError::Query("timeout".into()));
        let loader = loader(fetcher).for_viewer(&Viewer::known("users/9"));

        let err = loader.load("k1").await.unwrap_err();
        assert_eq!(err.to_string(), "Unable to load domain. Please try again.");
        assert!(!err.to_string().contains("timeout"));
    }

    #[tokio::test]
    async fn cursor_failure_surfaces_the_same_message() {
        let fetcher = MockFetcher::failing(FetchError::Cursor("bad row".into()));
        let loader = loader(fetcher);

        let err = loader.load_many(&["k1".into()]).await.unwrap_err();
        assert_eq!(err.to_string(), "Unable to load domain. Please try again.");
    }

    #[tokio::test]
    async fn failed_wave_is_not_cached_as_missing() {
        let fetcher = MockFetcher::failing(FetchError::Query("down".into()));
        let loader = loader(fetcher.clone());

        assert!(loader.load("k1").await.is_err());
        assert!(loader.load("k1").await.is_err());
        // Both attempts reached the fetcher: failures leave no cache entry.
        assert_eq!(fetcher.query_count.load(Ordering::SeqCst), 2);
    }
}
