use crate::config::AppConfig;
use crate::error::{LookupError, Result};
use crate::types::{LookupPayload, SpamScore, SOURCE_PROVIDER};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Port for the external enrichment API so the resolver can be exercised with
/// fakes in tests.
#[async_trait]
pub trait EnrichmentProvider: Send + Sync {
    async fn fetch(&self, e164: &str) -> Result<LookupPayload>;
}

/// Wire shape of a Veriphone verify response. Unknown fields are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct VeriphoneResponse {
    pub international_number: Option<String>,
    pub local_number: Option<String>,
    pub country_code: Option<String>,
    pub carrier: Option<String>,
    pub phone_type: Option<String>,
    pub country_name: Option<String>,
    pub region: Option<String>,
    pub spam_score: Option<SpamScore>,
    pub last_seen: Option<String>,
}

/// HTTP client for the Veriphone verify endpoint. One outbound request per
/// invocation, no retries; retry policy belongs to the resolver and none is
/// applied. The request timeout is bounded so a hung upstream cannot stall a
/// request indefinitely.
pub struct VeriphoneClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl VeriphoneClient {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.provider_timeout_seconds))
            .build()
            .map_err(|e| LookupError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(VeriphoneClient {
            client,
            base_url: config.veriphone_base_url.clone(),
            api_key: config
                .veriphone_api_key
                .clone()
                .filter(|k| !k.trim().is_empty()),
        })
    }
}

/// Map provider field names into the internal payload shape. Fields absent in
/// the response stay absent so merge logic can tell "unknown" from "empty".
pub fn payload_from_response(response: VeriphoneResponse) -> LookupPayload {
    let mut payload = LookupPayload::new(SOURCE_PROVIDER);
    payload.number.international_format = response.international_number;
    payload.number.national_format = response.local_number;
    payload.number.country_code = response.country_code;
    payload.carrier.name = response.carrier;
    payload.carrier.kind = response.phone_type;
    payload.country.name = response.country_name;
    payload.location.city = response.region.clone();
    payload.location.state = response.region;
    payload.reputation.spam_score = response.spam_score;
    payload.reputation.last_seen = response.last_seen;
    payload
}

#[async_trait]
impl EnrichmentProvider for VeriphoneClient {
    async fn fetch(&self, e164: &str) -> Result<LookupPayload> {
        // Checked before any network I/O.
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(LookupError::provider_unavailable)?;

        debug!("Fetching enrichment for {}", e164);
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("phone", e164), ("key", api_key)])
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| LookupError::upstream(502, format!("Lookup request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body: Option<serde_json::Value> = response.json().await.ok();
            let detail = body
                .as_ref()
                .and_then(|b| b.get("status_message").or_else(|| b.get("message")))
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("Lookup failed")
                        .to_string()
                });
            return Err(LookupError::upstream(status.as_u16(), detail));
        }

        let parsed: VeriphoneResponse = response
            .json()
            .await
            .map_err(|e| LookupError::upstream(502, format!("Invalid provider response: {}", e)))?;
        Ok(payload_from_response(parsed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderFault;

    #[tokio::test]
    async fn missing_credential_fails_before_any_network_call() {
        // Unroutable base URL: if the client tried the network this would
        // error differently (or hang until the timeout).
        let config = AppConfig {
            veriphone_api_key: None,
            veriphone_base_url: "http://192.0.2.1/verify".to_string(),
            ..AppConfig::default()
        };
        let client = VeriphoneClient::new(&config).unwrap();
        let err = client.fetch("+14155552671").await.unwrap_err();
        assert!(matches!(
            err,
            LookupError::Provider { kind: ProviderFault::Unavailable, status: 503, .. }
        ));
    }

    #[tokio::test]
    async fn blank_credential_counts_as_missing() {
        let config = AppConfig {
            veriphone_api_key: Some("   ".to_string()),
            ..AppConfig::default()
        };
        let client = VeriphoneClient::new(&config).unwrap();
        assert!(client.fetch("+14155552671").await.is_err());
    }

    #[test]
    fn response_maps_into_payload_shape() {
        let response: VeriphoneResponse = serde_json::from_str(
            r#"{
                "phone_valid": true,
                "international_number": "+1 415-555-2671",
                "local_number": "(415) 555-2671",
                "country_code": "US",
                "carrier": "Acme Mobile",
                "phone_type": "mobile",
                "country_name": "United States",
                "region": "California"
            }"#,
        )
        .unwrap();
        let payload = payload_from_response(response);
        assert_eq!(payload.source, "veriphone");
        assert_eq!(payload.sources, vec!["veriphone"]);
        assert_eq!(payload.carrier.name.as_deref(), Some("Acme Mobile"));
        assert_eq!(payload.country.name.as_deref(), Some("United States"));
        assert_eq!(payload.location.city.as_deref(), Some("California"));
        // Absent provider fields stay absent rather than defaulting to "".
        assert!(payload.reputation.spam_score.is_none());
    }
}
