use crate::error::{LookupError, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

/// Runtime settings for the lookup service. Resolved once at startup from
/// `config.toml` (when present) with environment-variable overrides, then
/// treated as read-only for the life of the process.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub veriphone_api_key: Option<String>,
    pub veriphone_base_url: String,
    pub default_region: String,
    pub cache_ttl_seconds: u64,
    pub cache_path_prefix: String,
    pub provider_timeout_seconds: u64,
    pub posts_dir: String,
    pub database_path: String,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            veriphone_api_key: None,
            veriphone_base_url: "https://api.veriphone.io/v2/verify".to_string(),
            default_region: "US".to_string(),
            cache_ttl_seconds: 3600,
            cache_path_prefix: "cache/lookups".to_string(),
            provider_timeout_seconds: 10,
            posts_dir: "posts".to_string(),
            database_path: "data/lookups.db".to_string(),
            port: 8080,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        Self::load_from("config.toml")
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| {
                LookupError::Config(format!("Failed to read '{}': {}", path.display(), e))
            })?;
            toml::from_str(&content)
                .map_err(|e| LookupError::Config(format!("Invalid '{}': {}", path.display(), e)))?
        } else {
            AppConfig::default()
        };
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(v) = env::var("VERIPHONE_API_KEY") {
            if !v.is_empty() {
                self.veriphone_api_key = Some(v);
            }
        }
        if let Ok(v) = env::var("VERIPHONE_BASE_URL") {
            self.veriphone_base_url = v;
        }
        if let Ok(v) = env::var("DEFAULT_REGION") {
            self.default_region = v;
        }
        if let Ok(v) = env::var("CACHE_TTL_SECONDS") {
            if let Ok(n) = v.parse() {
                self.cache_ttl_seconds = n;
            }
        }
        if let Ok(v) = env::var("CACHE_PATH_PREFIX") {
            self.cache_path_prefix = v;
        }
        if let Ok(v) = env::var("PROVIDER_TIMEOUT_SECONDS") {
            if let Ok(n) = v.parse() {
                self.provider_timeout_seconds = n;
            }
        }
        if let Ok(v) = env::var("POSTS_DIR") {
            self.posts_dir = v;
        }
        if let Ok(v) = env::var("DATABASE_PATH") {
            self.database_path = v;
        }
        if let Ok(v) = env::var("PORT") {
            if let Ok(n) = v.parse() {
                self.port = n;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_service_expectations() {
        let config = AppConfig::default();
        assert_eq!(config.veriphone_base_url, "https://api.veriphone.io/v2/verify");
        assert_eq!(config.default_region, "US");
        assert_eq!(config.cache_ttl_seconds, 3600);
        assert_eq!(config.cache_path_prefix, "cache/lookups");
        assert!(config.veriphone_api_key.is_none());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = AppConfig::load_from("does-not-exist.toml").unwrap();
        assert_eq!(config.cache_ttl_seconds, 3600);
    }

    #[test]
    fn toml_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "default_region = \"GB\"\ncache_ttl_seconds = 60").unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.default_region, "GB");
        assert_eq!(config.cache_ttl_seconds, 60);
        // Untouched keys keep their defaults.
        assert_eq!(config.port, 8080);
    }
}
