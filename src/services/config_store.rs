// Configuration Storage Service
// Handles config file read/write and version backup

use crate::services::detection::{resolve_threshold, EvaluatorConfig, TfidfConfig};
use crate::services::providers::{SearchSettings, BING_DEFAULT_URL, DEFAULT_USER_AGENT};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

pub const CONFIG_VERSION: &str = "1.0.0";
const BACKUPS_TO_KEEP: usize = 10;

pub const ENV_SEARCH_URL: &str = "PLAGIPROOF_SEARCH_URL";
pub const ENV_THRESHOLD: &str = "PLAGIPROOF_THRESHOLD";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("unknown config key: {0}")]
    UnknownKey(String),
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
    #[error("no config directory available on this platform")]
    NoConfigDir,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            detection: DetectionConfig::default(),
            search: SearchConfig::default(),
            proxy: ProxyConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProxyConfig {
    pub enabled: bool,
    pub http: Option<String>,
    pub https: Option<String>,
}

impl ProxyConfig {
    /// Proxy URL to route search traffic through, preferring the HTTPS entry.
    pub fn active_url(&self) -> Option<String> {
        if !self.enabled {
            return None;
        }
        self.https
            .clone()
            .or_else(|| self.http.clone())
            .filter(|s| !s.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionConfig {
    /// Explicit threshold; when unset the sensitivity preset decides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(default = "default_sensitivity")]
    pub sensitivity: String,
    #[serde(default = "default_true")]
    pub remove_stop_words: bool,
    #[serde(default = "default_interval_ms")]
    pub min_request_interval_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            threshold: None,
            sensitivity: default_sensitivity(),
            remove_stop_words: true,
            min_request_interval_ms: default_interval_ms(),
            request_timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            max_results: default_max_results(),
        }
    }
}

fn default_version() -> String { CONFIG_VERSION.to_string() }
fn default_sensitivity() -> String { "medium".to_string() }
fn default_true() -> bool { true }
fn default_interval_ms() -> u64 { 1000 }
fn default_timeout_secs() -> u64 { 10 }
fn default_base_url() -> String { BING_DEFAULT_URL.to_string() }
fn default_user_agent() -> String { DEFAULT_USER_AGENT.to_string() }
fn default_max_results() -> usize { 10 }

impl AppConfig {
    pub fn threshold(&self) -> f64 {
        resolve_threshold(self.detection.threshold, &self.detection.sensitivity)
    }

    pub fn evaluator_config(&self) -> EvaluatorConfig {
        EvaluatorConfig {
            threshold: self.threshold(),
            min_request_interval: Duration::from_millis(self.detection.min_request_interval_ms),
            request_timeout: Duration::from_secs(self.detection.request_timeout_secs.max(1)),
            tfidf: TfidfConfig {
                remove_stop_words: self.detection.remove_stop_words,
                ..TfidfConfig::default()
            },
        }
    }

    pub fn search_settings(&self) -> SearchSettings {
        SearchSettings {
            base_url: self.search.base_url.clone(),
            user_agent: self.search.user_agent.clone(),
            max_results: self.search.max_results,
            timeout_secs: self.detection.request_timeout_secs.max(1),
            proxy: self.proxy.active_url(),
        }
    }

    /// Apply `PLAGIPROOF_SEARCH_URL` and `PLAGIPROOF_THRESHOLD` from the environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(
            std::env::var(ENV_SEARCH_URL).ok(),
            std::env::var(ENV_THRESHOLD).ok(),
        );
    }

    fn apply_overrides(&mut self, search_url: Option<String>, threshold: Option<String>) {
        if let Some(url) = search_url.filter(|u| !u.trim().is_empty()) {
            debug!(url = %url, "config.env_override.search_url");
            self.search.base_url = url;
        }
        if let Some(raw) = threshold {
            match raw.trim().parse::<f64>() {
                Ok(t) if (0.0..=1.0).contains(&t) => self.detection.threshold = Some(t),
                _ => warn!(value = %raw, "Ignoring invalid {}", ENV_THRESHOLD),
            }
        }
    }

    /// Set a single value by its dotted camelCase key, e.g. `detection.threshold`.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = || ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };
        let parse_bool = |v: &str| match v.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" => Some(false),
            _ => None,
        };
        let optional = |v: &str| {
            let v = v.trim();
            if v.is_empty() || v == "none" {
                None
            } else {
                Some(v.to_string())
            }
        };

        match key {
            "detection.threshold" => {
                if matches!(value.trim(), "" | "none") {
                    self.detection.threshold = None;
                } else {
                    let t: f64 = value.trim().parse().map_err(|_| invalid())?;
                    if !(0.0..=1.0).contains(&t) {
                        return Err(invalid());
                    }
                    self.detection.threshold = Some(t);
                }
            }
            "detection.sensitivity" => {
                let v = value.trim().to_lowercase();
                if !matches!(v.as_str(), "low" | "medium" | "high") {
                    return Err(invalid());
                }
                self.detection.sensitivity = v;
            }
            "detection.removeStopWords" => {
                self.detection.remove_stop_words = parse_bool(value).ok_or_else(invalid)?;
            }
            "detection.minRequestIntervalMs" => {
                self.detection.min_request_interval_ms = value.trim().parse().map_err(|_| invalid())?;
            }
            "detection.requestTimeoutSecs" => {
                let secs: u64 = value.trim().parse().map_err(|_| invalid())?;
                if secs == 0 {
                    return Err(invalid());
                }
                self.detection.request_timeout_secs = secs;
            }
            "search.baseUrl" => {
                let v = value.trim();
                if !(v.starts_with("http://") || v.starts_with("https://")) {
                    return Err(invalid());
                }
                self.search.base_url = v.to_string();
            }
            "search.userAgent" => self.search.user_agent = value.to_string(),
            "search.maxResults" => {
                self.search.max_results = value.trim().parse().map_err(|_| invalid())?;
            }
            "proxy.enabled" => self.proxy.enabled = parse_bool(value).ok_or_else(invalid)?,
            "proxy.http" => self.proxy.http = optional(value),
            "proxy.https" => self.proxy.https = optional(value),
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }
}

pub struct ConfigStore {
    config_dir: PathBuf,
    config_file: PathBuf,
}

impl ConfigStore {
    pub fn new(config_dir: PathBuf) -> Self {
        let config_file = config_dir.join("config.json");
        Self { config_dir, config_file }
    }

    /// Store rooted at the platform config directory.
    pub fn open_default() -> Result<Self, ConfigError> {
        Self::default_config_dir()
            .map(Self::new)
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Get default config directory
    pub fn default_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("plagiproof"))
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    /// Ensure config directory exists
    pub fn ensure_dir(&self) -> Result<(), ConfigError> {
        fs::create_dir_all(&self.config_dir).map_err(|source| ConfigError::Io {
            path: self.config_dir.clone(),
            source,
        })
    }

    /// Load configuration from file; a missing file yields defaults.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        if !self.config_file.exists() {
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&self.config_file).map_err(|source| ConfigError::Io {
            path: self.config_file.clone(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: self.config_file.clone(),
            source,
        })
    }

    /// Save configuration to file
    pub fn save(&self, config: &AppConfig) -> Result<(), ConfigError> {
        self.ensure_dir()?;

        // Create backup if file exists
        if self.config_file.exists() {
            self.create_backup()?;
        }

        let content = serde_json::to_string_pretty(config)?;

        fs::write(&self.config_file, content).map_err(|source| ConfigError::Io {
            path: self.config_file.clone(),
            source,
        })
    }

    /// Load, change one key, save.
    pub fn set(&self, key: &str, value: &str) -> Result<AppConfig, ConfigError> {
        let mut config = self.load()?;
        config.set_value(key, value)?;
        self.save(&config)?;
        Ok(config)
    }

    fn backup_dir(&self) -> PathBuf {
        self.config_dir.join("backups")
    }

    /// Create a backup of current config
    fn create_backup(&self) -> Result<(), ConfigError> {
        let backup_dir = self.backup_dir();
        fs::create_dir_all(&backup_dir).map_err(|source| ConfigError::Io {
            path: backup_dir.clone(),
            source,
        })?;

        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S%.3f");
        let backup_file = backup_dir.join(format!("config_{}.json", timestamp));

        fs::copy(&self.config_file, &backup_file).map_err(|source| ConfigError::Io {
            path: backup_file.clone(),
            source,
        })?;

        self.cleanup_old_backups(&backup_dir, BACKUPS_TO_KEEP)
    }

    /// Remove old backups, keeping only the most recent N
    fn cleanup_old_backups(&self, backup_dir: &Path, keep: usize) -> Result<(), ConfigError> {
        let mut entries: Vec<_> = fs::read_dir(backup_dir)
            .map_err(|source| ConfigError::Io {
                path: backup_dir.to_path_buf(),
                source,
            })?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
            .collect();

        if entries.len() <= keep {
            return Ok(());
        }

        // Timestamped names sort oldest first
        entries.sort_by_key(|e| e.file_name());

        for entry in entries.iter().take(entries.len() - keep) {
            let _ = fs::remove_file(entry.path());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.detection.sensitivity, "medium");
        assert!(config.detection.remove_stop_words);
        assert_eq!(config.threshold(), 0.70);
        assert_eq!(config.search.base_url, BING_DEFAULT_URL);
        assert!(config.proxy.active_url().is_none());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let parsed: AppConfig =
            serde_json::from_str(r#"{"detection":{"sensitivity":"high"}}"#).unwrap();
        assert_eq!(parsed.version, CONFIG_VERSION);
        assert_eq!(parsed.threshold(), 0.55);
        assert_eq!(parsed.detection.min_request_interval_ms, 1000);
        assert_eq!(parsed.search.max_results, 10);
    }

    #[test]
    fn test_explicit_threshold_beats_sensitivity() {
        let mut config = AppConfig::default();
        config.detection.sensitivity = "low".to_string();
        config.detection.threshold = Some(0.6);
        assert_eq!(config.threshold(), 0.6);
        assert_eq!(config.evaluator_config().threshold, 0.6);
    }

    #[test]
    fn test_evaluator_and_search_settings() {
        let mut config = AppConfig::default();
        config.detection.min_request_interval_ms = 250;
        config.detection.remove_stop_words = false;
        config.proxy = ProxyConfig {
            enabled: true,
            http: Some("http://127.0.0.1:8080".to_string()),
            https: None,
        };

        let eval = config.evaluator_config();
        assert_eq!(eval.min_request_interval, Duration::from_millis(250));
        assert_eq!(eval.request_timeout, Duration::from_secs(10));
        assert!(!eval.tfidf.remove_stop_words);

        let search = config.search_settings();
        assert_eq!(search.proxy.as_deref(), Some("http://127.0.0.1:8080"));
        assert_eq!(search.timeout_secs, 10);
    }

    #[test]
    fn test_overrides() {
        let mut config = AppConfig::default();
        config.apply_overrides(Some("http://localhost:9000/search".to_string()), Some("0.9".to_string()));
        assert_eq!(config.search.base_url, "http://localhost:9000/search");
        assert_eq!(config.threshold(), 0.9);

        config.apply_overrides(None, Some("abc".to_string()));
        assert_eq!(config.threshold(), 0.9);
    }

    #[test]
    fn test_set_value() {
        let mut config = AppConfig::default();
        config.set_value("detection.threshold", "0.8").unwrap();
        config.set_value("detection.removeStopWords", "off").unwrap();
        config.set_value("proxy.https", "http://proxy:3128").unwrap();
        assert_eq!(config.detection.threshold, Some(0.8));
        assert!(!config.detection.remove_stop_words);
        assert_eq!(config.proxy.https.as_deref(), Some("http://proxy:3128"));

        assert!(matches!(
            config.set_value("detection.threshold", "1.5"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            config.set_value("search.engine", "ddg"),
            Err(ConfigError::UnknownKey(_))
        ));
    }

    #[test]
    fn test_store_roundtrip_and_backups() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().to_path_buf());

        assert_eq!(store.load().unwrap().threshold(), 0.70);

        store.set("detection.sensitivity", "high").unwrap();
        store.set("search.maxResults", "5").unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.detection.sensitivity, "high");
        assert_eq!(loaded.search.max_results, 5);

        // First save had nothing to back up.
        let backups = fs::read_dir(dir.path().join("backups")).unwrap().count();
        assert_eq!(backups, 1);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.json"), "{ not json").unwrap();
        let store = ConfigStore::new(dir.path().to_path_buf());
        assert!(matches!(store.load(), Err(ConfigError::Parse { .. })));
    }
}
