use crate::error::{LookupError, Result};
use crate::normalize::{normalize, NormalizedNumber};
use crate::provider::EnrichmentProvider;
use crate::storage::{DurableStore, FastCache};
use crate::types::LookupPayload;
use std::sync::Arc;
use tracing::{debug, info};

/// Orchestrates the multi-tier lookup pipeline:
/// normalize -> fast cache -> durable store -> provider -> dual write-back.
///
/// Constructed once at startup and shared across requests via `Arc`. No
/// cross-request locking or single-flight coalescing: concurrent identical
/// misses each call the provider and race on the write-back, converging
/// because every write is keyed by the same deterministic `e164`.
pub struct Resolver {
    cache: FastCache,
    store: DurableStore,
    provider: Arc<dyn EnrichmentProvider>,
    default_region: String,
}

impl Resolver {
    pub fn new(
        cache: FastCache,
        store: DurableStore,
        provider: Arc<dyn EnrichmentProvider>,
        default_region: impl Into<String>,
    ) -> Self {
        Resolver {
            cache,
            store,
            provider,
            default_region: default_region.into(),
        }
    }

    pub fn fast_cache(&self) -> &FastCache {
        &self.cache
    }

    pub async fn lookup(&self, raw_input: &str) -> Result<LookupPayload> {
        // Validation failures propagate before any I/O happens.
        let normalized = normalize(raw_input, &self.default_region)?;

        if let Some(cached) = self.cache.read(&normalized).await {
            debug!("Fast-cache hit for {}", normalized.e164);
            return Ok(enrich_payload(cached, &normalized));
        }

        if let Some(stored) = self.store.read(&normalized).await {
            debug!("Durable-store hit for {}", normalized.e164);
            let payload = enrich_payload(stored, &normalized);
            // Repopulate the fast tier off the request path; the next read
            // should be hot, but a refill failure must not affect this one.
            let cache = self.cache.clone();
            let refill_normalized = normalized.clone();
            let refill_payload = payload.clone();
            tokio::spawn(async move {
                cache.write(&refill_normalized, &refill_payload).await;
            });
            return Ok(payload);
        }

        info!("Tier miss for {}; querying provider", normalized.e164);
        let fetched = match self.provider.fetch(&normalized.e164).await {
            Ok(payload) => payload,
            Err(err @ LookupError::Provider { .. }) => return Err(err),
            // Callers only ever see the two classified error kinds.
            Err(err) => return Err(LookupError::upstream(502, err.to_string())),
        };

        let enriched = enrich_payload(fetched, &normalized);

        // Dual write-back, concurrent and best-effort: both tiers swallow
        // their own failures, and the result is already in hand.
        tokio::join!(
            self.cache.write(&normalized, &enriched),
            self.store.write(&normalized, &enriched),
        );

        Ok(enriched)
    }
}

/// The merge rule applied at every return point: identity fields are filled
/// from the payload when present and backfilled from the current request's
/// normalization otherwise, and a fresh `normalized` block is always attached
/// so identity stays current even when the enrichment itself is stale.
pub fn enrich_payload(payload: LookupPayload, normalized: &NormalizedNumber) -> LookupPayload {
    let mut enriched = payload;
    if enriched.number.international_format.is_none() {
        enriched.number.international_format = Some(normalized.e164.clone());
    }
    if enriched.number.national_format.is_none() {
        enriched.number.national_format = Some(normalized.national.clone());
    }
    if enriched.number.country_code.is_none() {
        enriched.number.country_code = Some(normalized.country_code.clone());
    }
    if enriched.country.name.is_none() {
        enriched.country.name = normalized.country_name.clone();
    }
    enriched.normalized = Some(normalized.clone());
    enriched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LookupPayload, SOURCE_PROVIDER};

    #[test]
    fn merge_backfills_missing_identity_fields() {
        let normalized = normalize("4155552671", "US").unwrap();
        let payload = LookupPayload::new(SOURCE_PROVIDER);
        let enriched = enrich_payload(payload, &normalized);

        assert_eq!(enriched.number.international_format.as_deref(), Some("+14155552671"));
        assert_eq!(enriched.number.national_format.as_deref(), Some("(415) 555-2671"));
        assert_eq!(enriched.number.country_code.as_deref(), Some("+1"));
        assert_eq!(enriched.country.name.as_deref(), Some("United States"));
        assert_eq!(enriched.normalized.as_ref().unwrap().e164, "+14155552671");
    }

    #[test]
    fn merge_prefers_provider_fields_when_present() {
        let normalized = normalize("4155552671", "US").unwrap();
        let mut payload = LookupPayload::new(SOURCE_PROVIDER);
        payload.number.national_format = Some("415-555-2671".to_string());
        payload.country.name = Some("United States of America".to_string());

        let enriched = enrich_payload(payload, &normalized);
        assert_eq!(enriched.number.national_format.as_deref(), Some("415-555-2671"));
        assert_eq!(enriched.country.name.as_deref(), Some("United States of America"));
        // The normalized block still reflects the current request.
        assert_eq!(enriched.normalized.as_ref().unwrap().national, "(415) 555-2671");
    }
}
