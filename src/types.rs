use crate::normalize::NormalizedNumber;
use serde::{Deserialize, Serialize};

/// Provenance tags recorded in `LookupPayload::sources`.
pub const SOURCE_PROVIDER: &str = "veriphone";
pub const SOURCE_CACHE: &str = "cache";
pub const SOURCE_DATABASE: &str = "database";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NumberInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub international_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub national_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CarrierInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CountryInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LocationInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

/// Veriphone reports spam scores as either a bare number or a string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum SpamScore {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Reputation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spam_score: Option<SpamScore>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<String>,
}

/// The canonical enrichment record returned to callers and persisted in both
/// storage tiers. Absent fields are omitted from JSON so merge logic can tell
/// "unknown" apart from an empty string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LookupPayload {
    pub source: String,
    #[serde(default)]
    pub number: NumberInfo,
    #[serde(default)]
    pub carrier: CarrierInfo,
    #[serde(default)]
    pub country: CountryInfo,
    #[serde(default)]
    pub location: LocationInfo,
    #[serde(default)]
    pub reputation: Reputation,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalized: Option<NormalizedNumber>,
}

impl LookupPayload {
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        LookupPayload {
            sources: vec![source.clone()],
            source,
            number: NumberInfo::default(),
            carrier: CarrierInfo::default(),
            country: CountryInfo::default(),
            location: LocationInfo::default(),
            reputation: Reputation::default(),
            normalized: None,
        }
    }

    /// Set-union append: adding a tag that is already present is a no-op.
    pub fn add_source(&mut self, tag: &str) {
        if !self.sources.iter().any(|s| s == tag) {
            self.sources.push(tag.to_string());
        }
    }

    pub fn has_source(&self, tag: &str) -> bool {
        self.sources.iter().any(|s| s == tag)
    }
}
