use crate::error::{EmbedError, Result};
use crate::gate::{GateStats, RequestGate};
use crate::provider::EmbeddingProvider;
use crate::split::split_text_to_fit;
use librarian_cache::{EmbeddingCache, EmbeddingCacheStats};
use lru::LruCache;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{OnceCell, Semaphore};
use tokio::task::JoinSet;

/// Prefix applied to texts embedded at index time. Asymmetric embedding
/// models treat documents and queries differently.
pub const DOCUMENT_PREFIX: &str = "search_document: ";

/// Prefix applied to search queries.
pub const QUERY_PREFIX: &str = "search_query: ";

const DIMENSION_PROBE: &str = "test";
const BACKOFF_CAP_SECS: u64 = 16;
const HEALTH_PROBE_AFTER_ATTEMPT: usize = 2;

/// Engine tuning knobs.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum concurrently in-flight provider requests.
    pub max_concurrent: usize,

    /// Request spacing; zero disables the interval gate.
    pub requests_per_second: f64,

    /// Attempts per item before the terminal error.
    pub max_retries: usize,

    /// Provider text-length limit in characters.
    pub max_text_length: usize,

    /// Worker bound for parallel batch dispatch.
    pub max_workers: usize,

    /// Entries in the in-process LRU in front of the persistent cache.
    pub hot_cache_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 2,
            requests_per_second: 8.0,
            max_retries: 5,
            max_text_length: 1500,
            max_workers: 8,
            hot_cache_size: 5000,
        }
    }
}

impl EngineConfig {
    /// Validate configuration.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.max_concurrent == 0 {
            return Err("max_concurrent must be > 0".to_string());
        }
        if self.max_retries == 0 {
            return Err("max_retries must be > 0".to_string());
        }
        if self.max_text_length == 0 {
            return Err("max_text_length must be > 0".to_string());
        }
        if self.max_workers == 0 {
            return Err("max_workers must be > 0".to_string());
        }
        Ok(())
    }
}

/// Result of a batch embedding call.
///
/// Items whose retries were exhausted are substituted with zero vectors so
/// one bad item never fails its batch; their original indices are listed
/// in `failed_indices` for callers that need strict correctness.
#[derive(Debug, Clone, Default)]
pub struct BatchEmbeddings {
    pub vectors: Vec<Vec<f32>>,
    pub failed_indices: Vec<usize>,
}

impl BatchEmbeddings {
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failed_indices.len()
    }

    #[must_use]
    pub fn is_fully_successful(&self) -> bool {
        self.failed_indices.is_empty()
    }
}

/// Cache and queue statistics.
#[derive(Debug, Clone, Default)]
pub struct EngineStats {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub hit_rate: f64,
    pub gate: GateStats,
    pub persistent: Option<EmbeddingCacheStats>,
}

/// Rate-limited, cache-aware embedding engine.
///
/// Lookup order per text: bounded in-process LRU, persistent
/// [`EmbeddingCache`], then the provider behind the [`RequestGate`] with
/// retry. Cache reads and writes that fail are treated as misses, never as
/// errors.
pub struct EmbeddingEngine {
    provider: Arc<dyn EmbeddingProvider>,
    gate: Arc<RequestGate>,
    cache: Option<EmbeddingCache>,
    hot_cache: Mutex<LruCache<String, Vec<f32>>>,
    dimension: OnceCell<usize>,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    config: EngineConfig,
}

impl EmbeddingEngine {
    /// Create an engine around `provider`. `cache` is the persistent
    /// vector cache; pass `None` to run cache-less.
    #[must_use]
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        cache: Option<EmbeddingCache>,
        config: EngineConfig,
    ) -> Self {
        config
            .validate()
            .expect("Invalid embedding engine configuration provided");

        let hot_capacity = NonZeroUsize::new(config.hot_cache_size.max(1))
            .unwrap_or_else(|| unreachable!("hot cache capacity is at least 1"));

        Self {
            gate: Arc::new(RequestGate::new(
                config.max_concurrent,
                config.requests_per_second,
            )),
            provider,
            cache,
            hot_cache: Mutex::new(LruCache::new(hot_capacity)),
            dimension: OnceCell::new(),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            config,
        }
    }

    /// Vector dimension, probed from the provider once and cached.
    pub async fn dimension(&self) -> Result<usize> {
        self.dimension
            .get_or_try_init(|| async {
                let probe = self.embed_direct(DIMENSION_PROBE).await?;
                log::info!("Detected embedding dimension: {}", probe.len());
                Ok(probe.len())
            })
            .await
            .copied()
    }

    /// Embed one text with `prefix` applied, through both cache layers.
    pub async fn embed(&self, text: &str, prefix: &str) -> Result<Vec<f32>> {
        let prefixed = format!("{prefix}{text}");

        if let Some(vector) = self.hot_lookup(&prefixed) {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(vector);
        }

        let hash = EmbeddingCache::hash_text(&prefixed);
        if let Some(cache) = &self.cache {
            if let Some(vector) = cache.get(&hash).await {
                self.cache_hits.fetch_add(1, Ordering::Relaxed);
                self.hot_insert(&prefixed, &vector);
                return Ok(vector);
            }
        }

        self.cache_misses.fetch_add(1, Ordering::Relaxed);
        let vector = self.embed_direct(&prefixed).await?;
        if let Some(cache) = &self.cache {
            if let Err(err) = cache.put(&hash, &vector).await {
                log::warn!("Embedding cache write failed (treated as miss): {err}");
            }
        }
        self.hot_insert(&prefixed, &vector);
        Ok(vector)
    }

    /// Embed many texts with `prefix` applied, returning vectors in input
    /// order.
    ///
    /// Inputs are partitioned into cache hits and misses with a single
    /// batch lookup; only unique misses are dispatched, in parallel up to
    /// the worker bound, each dispatch still gated by the admission
    /// semaphore. New vectors are written to the cache before being merged
    /// with the hits.
    pub async fn embed_batch(&self, texts: &[String], prefix: &str) -> Result<BatchEmbeddings> {
        if texts.is_empty() {
            return Ok(BatchEmbeddings::default());
        }

        let prefixed: Vec<String> = texts.iter().map(|t| format!("{prefix}{t}")).collect();
        let hashes: Vec<String> = prefixed.iter().map(|t| EmbeddingCache::hash_text(t)).collect();

        let mut results: Vec<Option<Vec<f32>>> = vec![None; texts.len()];

        // In-process LRU first.
        {
            let mut hot = lock_hot(&self.hot_cache);
            for (i, text) in prefixed.iter().enumerate() {
                if let Some(vector) = hot.get(text) {
                    results[i] = Some(vector.clone());
                }
            }
        }

        // One persistent-cache round-trip for the rest.
        if let Some(cache) = &self.cache {
            let outstanding: Vec<String> = results
                .iter()
                .zip(&hashes)
                .filter(|(slot, _)| slot.is_none())
                .map(|(_, hash)| hash.clone())
                .collect();
            if !outstanding.is_empty() {
                let found = cache.get_batch(&outstanding).await;
                for (i, hash) in hashes.iter().enumerate() {
                    if results[i].is_none() {
                        if let Some(vector) = found.get(hash) {
                            results[i] = Some(vector.clone());
                            self.hot_insert(&prefixed[i], vector);
                        }
                    }
                }
            }
        }

        let hits = results.iter().filter(|slot| slot.is_some()).count() as u64;
        self.cache_hits.fetch_add(hits, Ordering::Relaxed);
        self.cache_misses
            .fetch_add(texts.len() as u64 - hits, Ordering::Relaxed);

        // Dedup misses by hash so identical text costs one provider call.
        let mut unique_order: Vec<String> = Vec::new();
        let mut pending: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, hash) in hashes.iter().enumerate() {
            if results[i].is_some() {
                continue;
            }
            let indices = pending.entry(hash.clone()).or_insert_with(|| {
                unique_order.push(hash.clone());
                Vec::new()
            });
            indices.push(i);
        }

        let mut failed_indices: Vec<usize> = Vec::new();

        if !unique_order.is_empty() {
            let workers = Arc::new(Semaphore::new(self.config.max_workers));
            let mut join_set: JoinSet<(usize, Result<Vec<f32>>)> = JoinSet::new();

            for (slot, hash) in unique_order.iter().enumerate() {
                let first_index = pending[hash][0];
                let text = prefixed[first_index].clone();
                let provider = self.provider.clone();
                let gate = self.gate.clone();
                let config = self.config.clone();
                let workers = workers.clone();

                join_set.spawn(async move {
                    let _worker = workers
                        .acquire_owned()
                        .await
                        .unwrap_or_else(|_| unreachable!("worker semaphore closed"));
                    let outcome = embed_with_retry(provider, gate, &config, &text).await;
                    (slot, outcome)
                });
            }

            let mut fresh: Vec<Option<Vec<f32>>> = vec![None; unique_order.len()];
            while let Some(joined) = join_set.join_next().await {
                match joined {
                    Ok((slot, Ok(vector))) => fresh[slot] = Some(vector),
                    Ok((slot, Err(err))) => {
                        log::warn!(
                            "Embedding failed after retries, substituting zero vector: {err}"
                        );
                        fresh[slot] = None;
                    }
                    Err(err) => {
                        log::error!("Embedding worker panicked: {err}");
                    }
                }
            }

            // Write-back before merging with the cached hits.
            if let Some(cache) = &self.cache {
                let items: Vec<(String, Vec<f32>)> = unique_order
                    .iter()
                    .zip(&fresh)
                    .filter_map(|(hash, vector)| {
                        vector.as_ref().map(|v| (hash.clone(), v.clone()))
                    })
                    .collect();
                if let Err(err) = cache.put_batch(&items).await {
                    log::warn!("Embedding cache batch write failed: {err}");
                }
            }

            let zero_dimension = match fresh.iter().flatten().next() {
                Some(vector) => vector.len(),
                None => self.dimension().await?,
            };

            for (hash, vector) in unique_order.iter().zip(&fresh) {
                for &i in &pending[hash] {
                    match vector {
                        Some(v) => {
                            self.hot_insert(&prefixed[i], v);
                            results[i] = Some(v.clone());
                        }
                        None => {
                            failed_indices.push(i);
                            results[i] = Some(vec![0.0; zero_dimension]);
                        }
                    }
                }
            }
        }

        failed_indices.sort_unstable();
        let vectors = results
            .into_iter()
            .map(|slot| slot.unwrap_or_default())
            .collect();

        Ok(BatchEmbeddings {
            vectors,
            failed_indices,
        })
    }

    /// Cache and queue statistics.
    pub async fn stats(&self) -> EngineStats {
        let hits = self.cache_hits.load(Ordering::Relaxed);
        let misses = self.cache_misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let persistent = match &self.cache {
            Some(cache) => Some(cache.stats().await),
            None => None,
        };
        EngineStats {
            cache_hits: hits,
            cache_misses: misses,
            hit_rate: if total == 0 {
                0.0
            } else {
                hits as f64 / total as f64
            },
            gate: self.gate.stats(),
            persistent,
        }
    }

    /// Clear both cache layers and reset counters.
    pub async fn clear_cache(&self) -> Result<()> {
        lock_hot(&self.hot_cache).clear();
        if let Some(cache) = &self.cache {
            cache
                .clear()
                .await
                .map_err(|err| EmbedError::Other(format!("cache clear failed: {err}")))?;
        }
        self.cache_hits.store(0, Ordering::Relaxed);
        self.cache_misses.store(0, Ordering::Relaxed);
        Ok(())
    }

    /// Model identifier of the underlying provider.
    #[must_use]
    pub fn model_id(&self) -> &str {
        self.provider.model_id()
    }

    async fn embed_direct(&self, text: &str) -> Result<Vec<f32>> {
        embed_with_retry(
            self.provider.clone(),
            self.gate.clone(),
            &self.config,
            text,
        )
        .await
    }

    fn hot_lookup(&self, text: &str) -> Option<Vec<f32>> {
        lock_hot(&self.hot_cache).get(text).cloned()
    }

    fn hot_insert(&self, text: &str, vector: &[f32]) {
        lock_hot(&self.hot_cache).put(text.to_string(), vector.to_vec());
    }
}

fn lock_hot(
    cache: &Mutex<LruCache<String, Vec<f32>>>,
) -> std::sync::MutexGuard<'_, LruCache<String, Vec<f32>>> {
    cache.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// One gated provider call per attempt, with the full retry policy:
/// overload retries with capped exponential backoff and a liveness probe
/// after repeated overload, network failures retry with the same backoff,
/// client errors fail immediately.
async fn embed_with_retry(
    provider: Arc<dyn EmbeddingProvider>,
    gate: Arc<RequestGate>,
    config: &EngineConfig,
    text: &str,
) -> Result<Vec<f32>> {
    // Callers are expected to pre-split oversized inputs; falling back to
    // the first sub-text here is lossy.
    let safe_text: String = if text.len() > config.max_text_length {
        let parts = split_text_to_fit(text, config.max_text_length);
        if parts.len() > 1 {
            log::warn!(
                "Oversized text ({} chars) reached the embedder; using first of {} parts",
                text.len(),
                parts.len()
            );
        }
        parts.into_iter().next().unwrap_or_default()
    } else {
        text.to_string()
    };

    let mut last_error: Option<EmbedError> = None;

    for attempt in 0..config.max_retries {
        let permit = gate.admit().await;
        let outcome = provider.embed(&safe_text).await;
        drop(permit);

        match outcome {
            Ok(vector) => return Ok(vector),
            Err(err @ EmbedError::Client { .. }) => return Err(err),
            Err(err) if err.is_retryable() => {
                let overloaded = err.is_overload();
                log::debug!(
                    "Embed attempt {}/{} failed: {err}",
                    attempt + 1,
                    config.max_retries
                );
                last_error = Some(err);

                if attempt + 1 < config.max_retries {
                    if overloaded
                        && attempt >= HEALTH_PROBE_AFTER_ATTEMPT
                        && !provider.health().await
                    {
                        log::warn!("Provider unresponsive during overload backoff");
                    }
                    tokio::time::sleep(backoff_delay(attempt)).await;
                }
            }
            Err(err) => return Err(err),
        }
    }

    Err(EmbedError::RetriesExhausted {
        attempts: config.max_retries,
        last: Box::new(
            last_error.unwrap_or_else(|| EmbedError::Other("embedding failed".to_string())),
        ),
    })
}

fn backoff_delay(attempt: usize) -> Duration {
    let capped = attempt.min(4) as u32;
    Duration::from_secs((1u64 << capped).min(BACKOFF_CAP_SECS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::EmbeddingProvider;
    use crate::stub::StubProvider;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::AtomicUsize;
    use tempfile::tempdir;

    fn fast_config() -> EngineConfig {
        EngineConfig {
            max_concurrent: 4,
            requests_per_second: 0.0,
            max_retries: 3,
            max_text_length: 1500,
            max_workers: 8,
            hot_cache_size: 100,
        }
    }

    struct OverloadedProvider {
        attempts: AtomicUsize,
        health_probes: AtomicUsize,
    }

    impl OverloadedProvider {
        fn new() -> Self {
            Self {
                attempts: AtomicUsize::new(0),
                health_probes: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for OverloadedProvider {
        fn model_id(&self) -> &str {
            "overloaded"
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(EmbedError::Overloaded { status: 500 })
        }

        async fn health(&self) -> bool {
            self.health_probes.fetch_add(1, Ordering::SeqCst);
            true
        }
    }

    struct SelectiveProvider {
        inner: StubProvider,
        poison: String,
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingProvider for SelectiveProvider {
        fn model_id(&self) -> &str {
            "selective"
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if text.contains(&self.poison) {
                return Err(EmbedError::Overloaded { status: 503 });
            }
            self.inner.embed(text).await
        }

        async fn health(&self) -> bool {
            true
        }
    }

    struct TrackingProvider {
        inner: StubProvider,
        active: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl EmbeddingProvider for TrackingProvider {
        fn model_id(&self) -> &str {
            "tracking"
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            self.inner.embed(text).await
        }

        async fn health(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn batch_dedupes_identical_texts() {
        let provider = Arc::new(StubProvider::new(8));
        let engine = EmbeddingEngine::new(provider.clone(), None, fast_config());

        let texts = vec!["a".to_string(), "a".to_string(), "b".to_string()];
        let out = engine.embed_batch(&texts, "").await.unwrap();

        assert_eq!(out.vectors.len(), 3);
        assert_eq!(out.vectors[0], out.vectors[1]);
        assert_ne!(out.vectors[0], out.vectors[2]);
        assert!(out.is_fully_successful());
        // Exactly two provider calls for three inputs.
        assert_eq!(provider.embed_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn always_overloaded_provider_exhausts_exactly_max_retries() {
        let provider = Arc::new(OverloadedProvider::new());
        let engine = EmbeddingEngine::new(provider.clone(), None, fast_config());

        let err = engine.embed("doomed", "").await.unwrap_err();
        match err {
            EmbedError::RetriesExhausted { attempts, last } => {
                assert_eq!(attempts, 3);
                assert!(last.is_overload());
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(provider.attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_item_is_zero_filled_and_siblings_survive() {
        let provider = Arc::new(SelectiveProvider {
            inner: StubProvider::new(4),
            poison: "bad".to_string(),
            attempts: AtomicUsize::new(0),
        });
        let engine = EmbeddingEngine::new(provider.clone(), None, fast_config());

        let texts = vec!["good one".to_string(), "bad one".to_string()];
        let out = engine.embed_batch(&texts, "").await.unwrap();

        assert_eq!(out.vectors.len(), 2);
        assert_eq!(out.failed_indices, vec![1]);
        assert_eq!(out.vectors[1], vec![0.0; 4]);
        assert!(out.vectors[0].iter().any(|v| *v != 0.0));
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_overload_probes_provider_health() {
        let provider = Arc::new(OverloadedProvider::new());
        let config = EngineConfig {
            max_retries: 5,
            ..fast_config()
        };
        let engine = EmbeddingEngine::new(provider.clone(), None, config);

        let _ = engine.embed("doomed", "").await;
        assert!(provider.health_probes.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn client_error_fails_fast() {
        struct RejectingProvider {
            attempts: AtomicUsize,
        }

        #[async_trait]
        impl EmbeddingProvider for RejectingProvider {
            fn model_id(&self) -> &str {
                "rejecting"
            }

            async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
                self.attempts.fetch_add(1, Ordering::SeqCst);
                Err(EmbedError::Client {
                    status: 400,
                    message: "model not found".to_string(),
                })
            }

            async fn health(&self) -> bool {
                true
            }
        }

        let provider = Arc::new(RejectingProvider {
            attempts: AtomicUsize::new(0),
        });
        let engine = EmbeddingEngine::new(provider.clone(), None, fast_config());

        let err = engine.embed("text", "").await.unwrap_err();
        assert!(matches!(err, EmbedError::Client { status: 400, .. }));
        assert_eq!(provider.attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn gate_bounds_concurrent_provider_calls() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let provider = Arc::new(TrackingProvider {
            inner: StubProvider::new(4),
            active: active.clone(),
            peak: peak.clone(),
        });

        let config = EngineConfig {
            max_concurrent: 2,
            max_workers: 16,
            ..fast_config()
        };
        let engine = EmbeddingEngine::new(provider, None, config);

        let texts: Vec<String> = (0..20).map(|i| format!("text {i}")).collect();
        let out = engine.embed_batch(&texts, "").await.unwrap();

        assert_eq!(out.vectors.len(), 20);
        assert!(
            peak.load(Ordering::SeqCst) <= 2,
            "peak concurrency {} exceeded the gate",
            peak.load(Ordering::SeqCst)
        );
    }

    #[tokio::test]
    async fn persistent_cache_deduplicates_across_engines() {
        let temp = tempdir().unwrap();
        let provider = Arc::new(StubProvider::new(8));

        {
            let cache = EmbeddingCache::new(temp.path(), provider.model_id());
            let engine = EmbeddingEngine::new(provider.clone(), Some(cache), fast_config());
            engine.embed("shared text", DOCUMENT_PREFIX).await.unwrap();
            assert_eq!(provider.embed_calls(), 1);
        }

        // A fresh engine (cold LRU) over the same store hits the
        // persistent layer.
        let cache = EmbeddingCache::new(temp.path(), provider.model_id());
        let engine = EmbeddingEngine::new(provider.clone(), Some(cache), fast_config());
        let vector = engine.embed("shared text", DOCUMENT_PREFIX).await.unwrap();

        assert_eq!(provider.embed_calls(), 1);
        assert_eq!(vector.len(), 8);

        let stats = engine.stats().await;
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(stats.cache_misses, 0);
    }

    #[tokio::test]
    async fn prefixes_produce_distinct_vectors() {
        let provider = Arc::new(StubProvider::new(8));
        let engine = EmbeddingEngine::new(provider, None, fast_config());

        let doc = engine.embed("query text", DOCUMENT_PREFIX).await.unwrap();
        let query = engine.embed("query text", QUERY_PREFIX).await.unwrap();
        assert_ne!(doc, query);
    }

    #[tokio::test]
    async fn dimension_is_probed_once() {
        let provider = Arc::new(StubProvider::new(12));
        let engine = EmbeddingEngine::new(provider.clone(), None, fast_config());

        assert_eq!(engine.dimension().await.unwrap(), 12);
        assert_eq!(engine.dimension().await.unwrap(), 12);
        assert_eq!(provider.embed_calls(), 1);
    }

    #[tokio::test]
    async fn empty_batch_is_a_no_op() {
        let provider = Arc::new(StubProvider::new(8));
        let engine = EmbeddingEngine::new(provider.clone(), None, fast_config());

        let out = engine.embed_batch(&[], DOCUMENT_PREFIX).await.unwrap();
        assert!(out.vectors.is_empty());
        assert_eq!(provider.embed_calls(), 0);
    }

    #[test]
    fn backoff_is_exponential_and_capped() {
        assert_eq!(backoff_delay(0), Duration::from_secs(1));
        assert_eq!(backoff_delay(1), Duration::from_secs(2));
        assert_eq!(backoff_delay(2), Duration::from_secs(4));
        assert_eq!(backoff_delay(4), Duration::from_secs(16));
        assert_eq!(backoff_delay(9), Duration::from_secs(16));
    }
}
