use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use crate::provider::ProviderId;

/// Environment variable that overrides the configured API key.
pub const API_KEY_ENV: &str = "WEATHERDASH_API_KEY";

/// City shown when neither the command line nor the config names one.
pub const FALLBACK_CITY: &str = "London";

/// Configuration for a single provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: String,

    /// Overrides the provider's public endpoint, e.g. for a proxy or a test server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Optional default provider id, e.g. "weatherapi" or "openweather".
    pub default_provider: Option<String>,

    /// City to show when no location is given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_city: Option<String>,

    /// Example TOML:
    /// [providers.weatherapi]
    /// api_key = "..."
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    #[serde(skip)]
    api_key_override: Option<String>,
}

impl Config {
    /// Return the default provider as a strongly-typed ProviderId.
    /// Falls back to WeatherAPI when none is configured.
    pub fn default_provider_id(&self) -> Result<ProviderId> {
        match self.default_provider.as_deref() {
            Some(s) => ProviderId::try_from(s),
            None => Ok(ProviderId::WeatherApi),
        }
    }

    pub fn provider_config(&self, id: ProviderId) -> Option<&ProviderConfig> {
        self.providers.get(id.as_str())
    }

    /// Store default provider as string.
    pub fn set_default_provider(&mut self, id: ProviderId) {
        self.default_provider = Some(id.as_str().to_string());
    }

    pub fn default_city(&self) -> &str {
        self.default_city.as_deref().unwrap_or(FALLBACK_CITY)
    }

    /// Load config from the platform location, or an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    /// Load config from `path`, applying the API key environment override.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut cfg = if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;

            toml::from_str::<Config>(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            // First run: no config file, return empty.
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Self::default()
        };

        if let Ok(key) = std::env::var(API_KEY_ENV) {
            cfg.set_api_key_override(key);
        }

        Ok(cfg)
    }

    /// Save config to the platform location.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    /// Save config to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "weatherdash", "weatherdash")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    /// Directory where the persisted store state lives.
    pub fn data_dir() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.data_dir().to_path_buf())
    }

    /// Convenience helper: set/replace a provider API key and optionally set default provider.
    pub fn upsert_provider_api_key(&mut self, provider_id: ProviderId, api_key: String) {
        let base_url = self.provider_config(provider_id).and_then(|cfg| cfg.base_url.clone());
        self.providers
            .insert(provider_id.as_str().to_string(), ProviderConfig { api_key, base_url });

        if self.default_provider.is_none() {
            self.default_provider = Some(provider_id.to_string());
        }
    }

    pub fn set_provider_base_url(&mut self, provider_id: ProviderId, base_url: String) {
        if let Some(cfg) = self.providers.get_mut(provider_id.as_str()) {
            cfg.base_url = Some(base_url);
        }
    }

    /// Key to use with a provider. The environment override wins over the file.
    pub fn provider_api_key(&self, provider_id: ProviderId) -> Option<&str> {
        self.api_key_override.as_deref().or_else(|| {
            self.providers.get(provider_id.as_str()).map(|cfg| cfg.api_key.as_str())
        })
    }

    pub fn provider_base_url(&self, provider_id: ProviderId) -> Option<&str> {
        self.provider_config(provider_id).and_then(|cfg| cfg.base_url.as_deref())
    }

    /// Whether the config file holds a key for the provider. Ignores the environment override.
    pub fn is_provider_configured(&self, provider_id: ProviderId) -> bool {
        self.provider_config(provider_id).is_some()
    }

    pub fn set_api_key_override(&mut self, key: String) {
        if !key.trim().is_empty() {
            self.api_key_override = Some(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderId;

    #[test]
    fn default_provider_id_falls_back_to_weatherapi() {
        let cfg = Config::default();
        assert_eq!(cfg.default_provider_id().unwrap(), ProviderId::WeatherApi);
    }

    #[test]
    fn default_provider_id_rejects_unknown_name() {
        let cfg = Config { default_provider: Some("darksky".into()), ..Default::default() };
        let err = cfg.default_provider_id().unwrap_err();

        assert!(err.to_string().contains("Unknown provider"));
    }

    #[test]
    fn set_api_key_and_default_for_provider() {
        let mut cfg = Config::default();

        cfg.upsert_provider_api_key(ProviderId::WeatherApi, "WA_KEY".into());

        let default = cfg.default_provider_id().expect("default provider must exist");
        assert_eq!(default, ProviderId::WeatherApi);

        let key = cfg.provider_api_key(ProviderId::WeatherApi);
        assert_eq!(key, Some("WA_KEY"));
        assert!(cfg.is_provider_configured(ProviderId::WeatherApi));
        assert!(!cfg.is_provider_configured(ProviderId::OpenWeather));
    }

    #[test]
    fn upsert_does_not_override_existing_default() {
        let mut cfg = Config::default();

        cfg.upsert_provider_api_key(ProviderId::WeatherApi, "WA_KEY".into());
        cfg.upsert_provider_api_key(ProviderId::OpenWeather, "OW_KEY".into());

        let default = cfg.default_provider_id().expect("default provider must exist");

        assert_eq!(default, ProviderId::WeatherApi);
        assert!(cfg.is_provider_configured(ProviderId::OpenWeather));
    }

    #[test]
    fn set_default_provider_overrides_default() {
        let mut cfg = Config::default();

        cfg.upsert_provider_api_key(ProviderId::WeatherApi, "WA_KEY".into());
        cfg.upsert_provider_api_key(ProviderId::OpenWeather, "OW_KEY".into());

        cfg.set_default_provider(ProviderId::OpenWeather);

        let default = cfg.default_provider_id().expect("default provider must exist");
        assert_eq!(default, ProviderId::OpenWeather);
    }

    #[test]
    fn upsert_keeps_base_url() {
        let mut cfg = Config::default();
        cfg.upsert_provider_api_key(ProviderId::WeatherApi, "OLD".into());
        cfg.set_provider_base_url(ProviderId::WeatherApi, "http://localhost:9000".into());
        cfg.upsert_provider_api_key(ProviderId::WeatherApi, "NEW".into());

        assert_eq!(cfg.provider_api_key(ProviderId::WeatherApi), Some("NEW"));
        assert_eq!(cfg.provider_base_url(ProviderId::WeatherApi), Some("http://localhost:9000"));
    }

    #[test]
    fn api_key_override_wins() {
        let mut cfg = Config::default();
        cfg.upsert_provider_api_key(ProviderId::WeatherApi, "FILE".into());
        cfg.set_api_key_override("ENV".into());

        assert_eq!(cfg.provider_api_key(ProviderId::WeatherApi), Some("ENV"));
    }

    #[test]
    fn api_key_override_does_not_mark_providers_configured() {
        let mut cfg = Config::default();
        cfg.upsert_provider_api_key(ProviderId::WeatherApi, "FILE".into());
        cfg.set_api_key_override("ENV".into());

        assert!(cfg.is_provider_configured(ProviderId::WeatherApi));
        assert!(!cfg.is_provider_configured(ProviderId::OpenWeather));
        assert_eq!(cfg.provider_api_key(ProviderId::OpenWeather), Some("ENV"));
    }

    #[test]
    fn default_city_falls_back_to_london() {
        let mut cfg = Config::default();
        assert_eq!(cfg.default_city(), "London");

        cfg.default_city = Some("Oslo".into());
        assert_eq!(cfg.default_city(), "Oslo");
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.upsert_provider_api_key(ProviderId::OpenWeather, "OW_KEY".into());
        cfg.default_city = Some("Tokyo".into());
        cfg.save_to(&path).expect("save");

        let loaded = Config::load_from(&path).expect("load");
        assert_eq!(loaded.default_provider_id().unwrap(), ProviderId::OpenWeather);
        assert_eq!(loaded.default_city(), "Tokyo");
        assert!(loaded.provider_config(ProviderId::OpenWeather).is_some());
    }

    #[test]
    fn load_from_missing_file_is_empty() {
        let dir = tempfile::tempdir().expect("temp dir");
        let cfg = Config::load_from(&dir.path().join("absent.toml")).expect("load");
        assert!(cfg.default_provider.is_none());
        assert!(cfg.providers.is_empty());
    }

    #[test]
    fn load_from_invalid_toml_fails() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "default_provider = [").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
