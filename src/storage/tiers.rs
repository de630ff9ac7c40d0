use super::{cache_key, sanitize_key, CacheBackend, CacheEntry, RecordBackend};
use crate::normalize::NormalizedNumber;
use crate::types::{LookupPayload, SOURCE_CACHE, SOURCE_DATABASE};
use chrono::Utc;
use std::sync::Arc;
use tracing::warn;

/// Low-latency tier. TTL is the only expiry mechanism; stale entries are
/// purged lazily on read. Every failure of the underlying backend is
/// recovered locally: a read failure reads as a miss and a write failure is
/// dropped, so the lookup pipeline never fails on this tier.
#[derive(Clone)]
pub struct FastCache {
    backend: Arc<dyn CacheBackend>,
    ttl_ms: i64,
    prefix: String,
}

impl FastCache {
    pub fn new(backend: Arc<dyn CacheBackend>, ttl_seconds: u64, prefix: impl Into<String>) -> Self {
        FastCache {
            backend,
            ttl_ms: (ttl_seconds as i64).saturating_mul(1000),
            prefix: prefix.into(),
        }
    }

    pub async fn read(&self, normalized: &NormalizedNumber) -> Option<LookupPayload> {
        let key = cache_key(&self.prefix, &normalized.e164);
        let entry = match self.backend.get(&key).await {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(err) => {
                warn!("Cache read failed for {}: {}", key, err);
                return None;
            }
        };

        if Utc::now().timestamp_millis() - entry.cached_at > self.ttl_ms {
            // Expired cache entry: purge fire-and-forget.
            let backend = self.backend.clone();
            tokio::spawn(async move {
                if let Err(err) = backend.remove(&key).await {
                    warn!("Failed to purge expired cache entry: {}", err);
                }
            });
            return None;
        }

        let mut payload = entry.payload;
        payload.add_source(SOURCE_CACHE);
        Some(payload)
    }

    pub async fn write(&self, normalized: &NormalizedNumber, payload: &LookupPayload) {
        let key = cache_key(&self.prefix, &normalized.e164);
        let entry = CacheEntry {
            payload: payload.clone(),
            cached_at: Utc::now().timestamp_millis(),
        };
        if let Err(err) = self.backend.set(&key, entry).await {
            warn!("Failed to write realtime cache: {}", err);
        }
    }

    /// Connectivity probe for the health endpoint.
    pub async fn healthy(&self) -> bool {
        self.backend.get("healthz/probe").await.is_ok()
    }
}

/// Persistent tier: source of truth once a number has ever been looked up.
/// Records never expire and are never deleted by this subsystem. Writes are
/// best-effort; persistence must not block returning a result the caller
/// already has in hand.
#[derive(Clone)]
pub struct DurableStore {
    backend: Arc<dyn RecordBackend>,
}

impl DurableStore {
    pub fn new(backend: Arc<dyn RecordBackend>) -> Self {
        DurableStore { backend }
    }

    pub async fn read(&self, normalized: &NormalizedNumber) -> Option<LookupPayload> {
        let key = sanitize_key(&normalized.e164);
        match self.backend.get(key).await {
            Ok(Some(record)) => {
                let mut payload = record.payload;
                payload.add_source(SOURCE_DATABASE);
                Some(payload)
            }
            Ok(None) => None,
            Err(err) => {
                warn!("Durable store read failed for {}: {}", key, err);
                None
            }
        }
    }

    pub async fn write(&self, normalized: &NormalizedNumber, payload: &LookupPayload) {
        let key = sanitize_key(&normalized.e164);
        if let Err(err) = self.backend.upsert(key, payload, normalized).await {
            warn!("Failed to persist lookup: {}", err);
        }
    }
}
