pub mod memory;
pub mod sqlite;
pub mod tiers;

use crate::error::Result;
use crate::normalize::NormalizedNumber;
use crate::types::LookupPayload;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use tiers::{DurableStore, FastCache};

/// Fast-tier entry: the payload plus its write time, checked against the TTL
/// on every read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub payload: LookupPayload,
    /// Unix milliseconds at write time.
    pub cached_at: i64,
}

/// Durable-tier record: authoritative history for a number that has ever been
/// looked up. Never expires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecord {
    pub payload: LookupPayload,
    pub normalized: NormalizedNumber,
    pub created_at: String,
    pub updated_at: String,
}

/// Storage keys must not carry the `+`; some backends treat it as illegal
/// path syntax. Both tiers derive their key from the same sanitized `e164`.
pub fn sanitize_key(e164: &str) -> &str {
    e164.strip_prefix('+').unwrap_or(e164)
}

pub fn cache_key(prefix: &str, e164: &str) -> String {
    format!("{}/{}", prefix.trim_end_matches('/'), sanitize_key(e164))
}

/// Key/value port for the fast tier. TTL policy lives in [`FastCache`], not
/// in the backend.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>>;
    async fn set(&self, key: &str, entry: CacheEntry) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Document port for the durable tier. `upsert` has merge semantics: the
/// creation timestamp is set once and preserved across updates.
#[async_trait]
pub trait RecordBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<StoredRecord>>;
    async fn upsert(
        &self,
        key: &str,
        payload: &LookupPayload,
        normalized: &NormalizedNumber,
    ) -> Result<()>;
}
