use async_trait::async_trait;
use phone_lookup::error::{LookupError, ProviderFault, Result};
use phone_lookup::provider::EnrichmentProvider;
use phone_lookup::resolver::Resolver;
use phone_lookup::storage::memory::{InMemoryCacheBackend, InMemoryRecordBackend};
use phone_lookup::storage::{cache_key, CacheBackend, CacheEntry, DurableStore, FastCache, RecordBackend};
use phone_lookup::types::{LookupPayload, SOURCE_CACHE, SOURCE_DATABASE, SOURCE_PROVIDER};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

enum ProviderMode {
    Respond(LookupPayload),
    Unavailable,
    /// An error the resolver must never surface unclassified.
    Unclassified,
}

/// Test double recording every provider invocation.
struct SpyProvider {
    calls: AtomicUsize,
    mode: ProviderMode,
}

#[async_trait]
impl EnrichmentProvider for SpyProvider {
    async fn fetch(&self, _e164: &str) -> Result<LookupPayload> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.mode {
            ProviderMode::Respond(payload) => Ok(payload.clone()),
            ProviderMode::Unavailable => Err(LookupError::provider_unavailable()),
            ProviderMode::Unclassified => Err(LookupError::Storage("boom".to_string())),
        }
    }
}

struct Harness {
    resolver: Arc<Resolver>,
    cache_backend: Arc<InMemoryCacheBackend>,
    record_backend: Arc<InMemoryRecordBackend>,
    provider: Arc<SpyProvider>,
}

const CACHE_PREFIX: &str = "cache/lookups";

fn acme_payload() -> LookupPayload {
    let mut payload = LookupPayload::new(SOURCE_PROVIDER);
    payload.carrier.name = Some("Acme Mobile".to_string());
    payload.country.name = Some("United States".to_string());
    payload
}

fn harness(mode: ProviderMode) -> Harness {
    let cache_backend = Arc::new(InMemoryCacheBackend::new());
    let record_backend = Arc::new(InMemoryRecordBackend::new());
    let provider = Arc::new(SpyProvider {
        calls: AtomicUsize::new(0),
        mode,
    });
    let resolver = Arc::new(Resolver::new(
        FastCache::new(cache_backend.clone(), 3600, CACHE_PREFIX),
        DurableStore::new(record_backend.clone()),
        provider.clone(),
        "US",
    ));
    Harness {
        resolver,
        cache_backend,
        record_backend,
        provider,
    }
}

/// Spawned write-backs race the assertions; give them a moment to land.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[tokio::test]
async fn first_miss_fetches_then_second_call_hits_cache() {
    let h = harness(ProviderMode::Respond(acme_payload()));

    let first = h.resolver.lookup("+14155552671").await.unwrap();
    assert_eq!(first.sources, vec![SOURCE_PROVIDER]);
    assert_eq!(first.normalized.as_ref().unwrap().e164, "+14155552671");
    assert_eq!(first.carrier.name.as_deref(), Some("Acme Mobile"));

    let second = h.resolver.lookup("+14155552671").await.unwrap();
    assert!(second.has_source(SOURCE_CACHE));
    assert_eq!(second.normalized, first.normalized);
    assert_eq!(second.carrier, first.carrier);
    assert_eq!(second.number, first.number);

    assert_eq!(h.provider.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn inputs_with_equal_identity_share_one_payload() {
    let h = harness(ProviderMode::Respond(acme_payload()));

    let a = h.resolver.lookup("4155552671").await.unwrap();
    let b = h.resolver.lookup("(415) 555-2671").await.unwrap();

    // Keyed by e164, not by raw input: one provider call, same enrichment.
    assert_eq!(h.provider.calls.load(Ordering::SeqCst), 1);
    assert_eq!(a.normalized, b.normalized);
    assert_eq!(a.carrier, b.carrier);
}

#[tokio::test]
async fn durable_hit_skips_provider_and_refills_cache() -> anyhow::Result<()> {
    let h = harness(ProviderMode::Respond(acme_payload()));
    let normalized = phone_lookup::normalize::normalize("4155552671", "US")?;
    h.record_backend
        .upsert("14155552671", &acme_payload(), &normalized)
        .await?;

    let payload = h.resolver.lookup("4155552671").await?;
    assert!(payload.has_source(SOURCE_DATABASE));
    assert_eq!(payload.carrier.name.as_deref(), Some("Acme Mobile"));
    assert_eq!(h.provider.calls.load(Ordering::SeqCst), 0);

    // The async refill makes the next read a fast-cache hit.
    settle().await;
    let refilled = h
        .cache_backend
        .get(&cache_key(CACHE_PREFIX, "+14155552671"))
        .await?;
    assert!(refilled.is_some());
    Ok(())
}

#[tokio::test]
async fn full_miss_writes_both_tiers_back() {
    let h = harness(ProviderMode::Respond(acme_payload()));

    let returned = h.resolver.lookup("4155552671").await.unwrap();
    settle().await;

    let cached = h
        .cache_backend
        .get(&cache_key(CACHE_PREFIX, "+14155552671"))
        .await
        .unwrap()
        .expect("fast tier entry");
    assert_eq!(cached.payload.carrier, returned.carrier);
    assert_eq!(cached.payload.number, returned.number);

    let stored = h
        .record_backend
        .get("14155552671")
        .await
        .unwrap()
        .expect("durable record");
    assert_eq!(stored.payload.carrier, returned.carrier);
    assert_eq!(stored.normalized.e164, "+14155552671");
}

#[tokio::test]
async fn expired_cache_entry_falls_through_to_provider() {
    let h = harness(ProviderMode::Respond(acme_payload()));
    let key = cache_key(CACHE_PREFIX, "+14155552671");
    let stale = CacheEntry {
        payload: acme_payload(),
        cached_at: chrono::Utc::now().timestamp_millis() - 3600 * 1000 - 1,
    };
    h.cache_backend.set(&key, stale).await.unwrap();

    let payload = h.resolver.lookup("4155552671").await.unwrap();
    assert!(!payload.has_source(SOURCE_CACHE));
    assert_eq!(h.provider.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn validation_failure_performs_no_io() {
    let h = harness(ProviderMode::Respond(acme_payload()));

    assert!(matches!(
        h.resolver.lookup("").await.unwrap_err(),
        LookupError::Validation(_)
    ));
    assert!(matches!(
        h.resolver.lookup("123").await.unwrap_err(),
        LookupError::Validation(_)
    ));

    assert_eq!(h.provider.calls.load(Ordering::SeqCst), 0);
    assert!(h.cache_backend.is_empty());
    assert!(h.record_backend.is_empty());
}

#[tokio::test]
async fn provider_unavailable_leaves_tiers_unwritten() {
    let h = harness(ProviderMode::Unavailable);

    let err = h.resolver.lookup("4155552671").await.unwrap_err();
    assert!(matches!(
        err,
        LookupError::Provider { kind: ProviderFault::Unavailable, status: 503, .. }
    ));

    settle().await;
    assert!(h.cache_backend.is_empty());
    assert!(h.record_backend.is_empty());
}

#[tokio::test]
async fn unclassified_provider_failure_is_coerced_to_502() {
    let h = harness(ProviderMode::Unclassified);

    let err = h.resolver.lookup("4155552671").await.unwrap_err();
    assert!(matches!(
        err,
        LookupError::Provider { kind: ProviderFault::Upstream, status: 502, .. }
    ));
}

#[tokio::test]
async fn concurrent_identical_misses_converge() {
    let h = harness(ProviderMode::Respond(acme_payload()));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let resolver = h.resolver.clone();
        handles.push(tokio::spawn(async move {
            resolver.lookup("(415) 555-2671").await
        }));
    }

    for handle in handles {
        let payload = handle.await.unwrap().unwrap();
        assert_eq!(payload.normalized.as_ref().unwrap().e164, "+14155552671");
        assert_eq!(payload.carrier.name.as_deref(), Some("Acme Mobile"));
    }
    settle().await;

    // No single-flight: the provider may be hit more than once, but both
    // tiers converge on a single record for the shared identity.
    assert!(h.provider.calls.load(Ordering::SeqCst) >= 1);
    assert_eq!(h.record_backend.len(), 1);
    assert_eq!(h.cache_backend.len(), 1);

    let stored = h.record_backend.get("14155552671").await.unwrap().unwrap();
    assert_eq!(stored.payload.carrier.name.as_deref(), Some("Acme Mobile"));
}

#[tokio::test]
async fn returned_payload_is_fully_merged_on_every_path() {
    let h = harness(ProviderMode::Respond(acme_payload()));

    for _ in 0..2 {
        let payload = h.resolver.lookup("4155552671").await.unwrap();
        assert_eq!(payload.number.international_format.as_deref(), Some("+14155552671"));
        assert_eq!(payload.number.national_format.as_deref(), Some("(415) 555-2671"));
        assert_eq!(payload.number.country_code.as_deref(), Some("+1"));
        assert_eq!(payload.country.name.as_deref(), Some("United States"));
        assert!(!payload.sources.is_empty());
    }
}
