use super::{CacheBackend, CacheEntry, RecordBackend, StoredRecord};
use crate::error::Result;
use crate::normalize::NormalizedNumber;
use crate::types::LookupPayload;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// In-memory fast-tier backend. Process-local, shared across requests via
/// `Arc`; entries live until the TTL policy purges them.
#[derive(Default)]
pub struct InMemoryCacheBackend {
    entries: Arc<Mutex<HashMap<String, CacheEntry>>>,
}

impl InMemoryCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheBackend for InMemoryCacheBackend {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let entries = self.entries.lock().unwrap();
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, entry: CacheEntry) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(key.to_string(), entry);
        debug!("Cached lookup under key {}", key);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        entries.remove(key);
        debug!("Removed cache entry {}", key);
        Ok(())
    }
}

/// In-memory durable-tier backend for development and tests.
#[derive(Default)]
pub struct InMemoryRecordBackend {
    records: Arc<Mutex<HashMap<String, StoredRecord>>>,
}

impl InMemoryRecordBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RecordBackend for InMemoryRecordBackend {
    async fn get(&self, key: &str) -> Result<Option<StoredRecord>> {
        let records = self.records.lock().unwrap();
        Ok(records.get(key).cloned())
    }

    async fn upsert(
        &self,
        key: &str,
        payload: &LookupPayload,
        normalized: &NormalizedNumber,
    ) -> Result<()> {
        let mut records = self.records.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        let created_at = records
            .get(key)
            .map(|r| r.created_at.clone())
            .unwrap_or_else(|| now.clone());
        records.insert(
            key.to_string(),
            StoredRecord {
                payload: payload.clone(),
                normalized: normalized.clone(),
                created_at,
                updated_at: now,
            },
        );
        debug!("Upserted lookup record {}", key);
        Ok(())
    }
}
