use crate::error::{EmbeddingError, Result};
use crate::provider::EmbeddingProvider;
use lru::LruCache;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of cached vectors.
    pub capacity: usize,
    /// Entry lifetime; expired entries are dropped before LRU eviction.
    pub ttl: Duration,
    /// Provider chunk size for batch generation.
    pub batch_size: usize,
    /// Time box for each provider call.
    pub provider_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 5_000,
            ttl: Duration::from_secs(24 * 60 * 60),
            batch_size: 100,
            provider_timeout: Duration::from_secs(30),
        }
    }
}

/// Snapshot of cache occupancy and hit/miss counters.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub expired: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
}

struct Entry {
    vector: Arc<Vec<f32>>,
    created_at: Instant,
}

struct Inner {
    entries: LruCache<String, Entry>,
    hits: u64,
    misses: u64,
}

/// Get-or-create embedding cache with TTL and bulk LRU eviction.
///
/// Keys are content-addressed: sha256 of the lowercased, trimmed text,
/// so identical normalized text always maps to the same entry. Writes
/// for the same key serialize on a per-key lock, so concurrent callers
/// racing on one text trigger a single provider call.
pub struct EmbeddingCache {
    provider: Arc<dyn EmbeddingProvider>,
    inner: Mutex<Inner>,
    key_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    config: CacheConfig,
}

impl EmbeddingCache {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, config: CacheConfig) -> Self {
        Self {
            provider,
            inner: Mutex::new(Inner {
                entries: LruCache::unbounded(),
                hits: 0,
                misses: 0,
            }),
            key_locks: Mutex::new(HashMap::new()),
            config,
        }
    }

    pub fn with_default_config(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self::new(provider, CacheConfig::default())
    }

    pub fn normalize(text: &str) -> String {
        text.trim().to_lowercase()
    }

    pub fn cache_key(normalized: &str) -> String {
        let digest = Sha256::digest(normalized.as_bytes());
        digest.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Return the cached vector for `text`, calling the provider on a
    /// miss. Provider errors propagate typed and are never cached.
    pub async fn get_or_create(&self, text: &str) -> Result<Arc<Vec<f32>>> {
        let normalized = Self::normalize(text);
        if normalized.is_empty() {
            return Err(EmbeddingError::EmptyText);
        }
        let key = Self::cache_key(&normalized);

        if let Some(vector) = self.lookup(&key).await {
            return Ok(vector);
        }

        // Single writer per key: the first caller generates, the rest
        // wait and then hit the cache on re-check.
        let key_lock = {
            let mut locks = self.key_locks.lock().await;
            locks.entry(key.clone()).or_default().clone()
        };
        let _guard = key_lock.lock().await;

        if let Some(vector) = self.lookup(&key).await {
            self.key_locks.lock().await.remove(&key);
            return Ok(vector);
        }

        // The key lock entry must go away on the error path too, or
        // repeated failures on unique texts grow the map without bound.
        let outcome = self.generate_and_insert(normalized, &key).await;
        self.key_locks.lock().await.remove(&key);
        outcome
    }

    async fn generate_and_insert(&self, normalized: String, key: &str) -> Result<Arc<Vec<f32>>> {
        let texts = [normalized];
        let vectors = self.call_provider(&texts).await?;
        let vector = Arc::new(vectors.into_iter().next().ok_or_else(|| {
            EmbeddingError::ProviderUnavailable("provider returned no vectors".to_string())
        })?);

        let mut inner = self.inner.lock().await;
        inner.misses += 1;
        Self::insert(&mut inner, &self.config, key.to_string(), vector.clone());
        Ok(vector)
    }

    /// Batch variant: cache hits resolve locally, misses go to the
    /// provider in fixed-size chunks, and the output preserves input
    /// order.
    ///
    /// Batch generation skips the per-key locks: a single lookup
    /// racing a batch on the same text can duplicate one provider
    /// call, with last-write-wins on insert.
    pub async fn batch_get_or_create(&self, texts: &[String]) -> Result<Vec<Arc<Vec<f32>>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let normalized: Vec<String> = texts.iter().map(|t| Self::normalize(t)).collect();
        if normalized.iter().any(String::is_empty) {
            return Err(EmbeddingError::EmptyText);
        }
        let keys: Vec<String> = normalized.iter().map(|n| Self::cache_key(n)).collect();

        let mut slots: Vec<Option<Arc<Vec<f32>>>> = vec![None; texts.len()];
        let mut missing: Vec<(String, String)> = Vec::new(); // (key, normalized)
        {
            let mut inner = self.inner.lock().await;
            let ttl = self.config.ttl;
            for (i, key) in keys.iter().enumerate() {
                let fresh = inner
                    .entries
                    .get(key)
                    .map(|e| e.created_at.elapsed() < ttl)
                    .unwrap_or(false);
                if fresh {
                    inner.hits += 1;
                    slots[i] = inner.entries.get(key).map(|e| e.vector.clone());
                } else {
                    inner.misses += 1;
                    if !missing.iter().any(|(k, _)| k == key) {
                        missing.push((key.clone(), normalized[i].clone()));
                    }
                }
            }
        }

        if !missing.is_empty() {
            log::debug!(
                "Batch embedding: {} hits, {} misses",
                texts.len() - missing.len(),
                missing.len()
            );
            let mut generated: HashMap<String, Arc<Vec<f32>>> = HashMap::new();
            for chunk in missing.chunks(self.config.batch_size.max(1)) {
                let chunk_texts: Vec<String> = chunk.iter().map(|(_, n)| n.clone()).collect();
                let vectors = self.call_provider(&chunk_texts).await?;
                if vectors.len() != chunk.len() {
                    return Err(EmbeddingError::InvalidRequest(format!(
                        "provider returned {} vectors for {} texts",
                        vectors.len(),
                        chunk.len()
                    )));
                }
                for ((key, _), vector) in chunk.iter().zip(vectors) {
                    generated.insert(key.clone(), Arc::new(vector));
                }
            }

            let mut inner = self.inner.lock().await;
            for (key, vector) in &generated {
                Self::insert(&mut inner, &self.config, key.clone(), vector.clone());
            }
            for (i, key) in keys.iter().enumerate() {
                if slots[i].is_none() {
                    slots[i] = generated.get(key).cloned();
                }
            }
        }

        slots
            .into_iter()
            .map(|slot| {
                slot.ok_or_else(|| {
                    EmbeddingError::ProviderUnavailable("missing vector in batch".to_string())
                })
            })
            .collect()
    }

    /// Drop the entry for `text`, if any.
    pub async fn invalidate(&self, text: &str) {
        let key = Self::cache_key(&Self::normalize(text));
        self.inner.lock().await.entries.pop(&key);
    }

    /// Drop every entry. Used when taxonomy drift invalidates the
    /// embedding space.
    pub async fn clear(&self) {
        let mut inner = self.inner.lock().await;
        let dropped = inner.entries.len();
        inner.entries.clear();
        log::info!("Embedding cache cleared ({dropped} entries)");
    }

    pub async fn stats(&self) -> CacheStats {
        let inner = self.inner.lock().await;
        let ttl = self.config.ttl;
        let expired = inner
            .entries
            .iter()
            .filter(|(_, e)| e.created_at.elapsed() >= ttl)
            .count();
        CacheStats {
            entries: inner.entries.len(),
            expired,
            capacity: self.config.capacity,
            hits: inner.hits,
            misses: inner.misses,
        }
    }

    async fn lookup(&self, key: &str) -> Option<Arc<Vec<f32>>> {
        let mut inner = self.inner.lock().await;
        let fresh = inner
            .entries
            .get(key)
            .map(|e| e.created_at.elapsed() < self.config.ttl)
            .unwrap_or(false);
        if fresh {
            inner.hits += 1;
            inner.entries.get(key).map(|e| e.vector.clone())
        } else {
            None
        }
    }

    async fn call_provider(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let timeout = self.config.provider_timeout;
        match tokio::time::timeout(timeout, self.provider.embed(texts)).await {
            Ok(result) => result,
            Err(_) => Err(EmbeddingError::Timeout(timeout)),
        }
    }

    /// Insert with eviction: expired entries go first; if the cache is
    /// still at capacity, the oldest 30% are dropped in one sweep.
    fn insert(inner: &mut Inner, config: &CacheConfig, key: String, vector: Arc<Vec<f32>>) {
        if inner.entries.len() >= config.capacity {
            let ttl = config.ttl;
            let expired: Vec<String> = inner
                .entries
                .iter()
                .filter(|(_, e)| e.created_at.elapsed() >= ttl)
                .map(|(k, _)| k.clone())
                .collect();
            for k in &expired {
                inner.entries.pop(k);
            }
            if inner.entries.len() >= config.capacity {
                let to_drop = (inner.entries.len() * 3).div_ceil(10);
                for _ in 0..to_drop {
                    if inner.entries.pop_lru().is_none() {
                        break;
                    }
                }
                log::debug!("Embedding cache evicted {to_drop} oldest entries");
            }
        }
        inner.entries.put(
            key,
            Entry {
                vector,
                created_at: Instant::now(),
            },
        );
    }
}
