//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (STRATUS_*)
//! 2. TOML config file (if STRATUS_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (STRATUS_*)
/// 2. TOML config file (if STRATUS_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version tag naming the current cache generation.
    ///
    /// Bumping this tag is the sole supported mechanism for invalidating
    /// all previously cached content: the next activation deletes every
    /// generation whose name differs.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Asset URLs precached during install, relative to `scope` or absolute.
    #[serde(default = "default_precache_assets")]
    pub precache_assets: Vec<String>,

    /// Base URL the agent controls.
    ///
    /// Relative asset and request URLs resolve against it, and its origin
    /// is the same-origin boundary for the snapshot validity check.
    #[serde(default = "default_scope")]
    pub scope: String,

    /// Document served as the fallback shell for offline navigations.
    #[serde(default = "default_fallback_document")]
    pub fallback_document: String,

    /// Plain-text body of the synthesized 408 response.
    #[serde(default = "default_offline_message")]
    pub offline_message: String,

    /// Path to SQLite cache database.
    ///
    /// Set via STRATUS_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_cache_version() -> String {
    "app-shell-v1".into()
}

fn default_precache_assets() -> Vec<String> {
    vec![".".into(), "./index.html".into(), "./manifest.json".into()]
}

fn default_scope() -> String {
    "http://localhost:8080/".into()
}

fn default_fallback_document() -> String {
    "./index.html".into()
}

fn default_offline_message() -> String {
    "Network unavailable. Check your connection.".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./stratus-cache.sqlite")
}

fn default_user_agent() -> String {
    "stratus/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_version: default_cache_version(),
            precache_assets: default_precache_assets(),
            scope: default_scope(),
            fallback_document: default_fallback_document(),
            offline_message: default_offline_message(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `STRATUS_`
    /// 2. TOML file from `STRATUS_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("STRATUS_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("STRATUS_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
