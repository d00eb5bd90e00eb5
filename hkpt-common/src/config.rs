//! Configuration loading and path resolution
//!
//! Resolution order for every location follows the same priority:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing config file is not an error: the service starts on defaults and
//! logs a warning.

use crate::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "HKPT_CONFIG";
/// Environment variable naming the SQLite database file
pub const DATABASE_PATH_ENV: &str = "HKPT_DATABASE_PATH";
/// Default database file name
pub const DATABASE_FILE_NAME: &str = "property_translations.db";

/// Top-level TOML configuration
///
/// Every field has a default, so an empty file (or no file) is valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// SQLite database file
    pub database_path: Option<PathBuf>,
    /// HTTP bind host
    pub host: String,
    /// HTTP bind port
    pub port: u16,
    pub logging: LoggingConfig,
    pub oracle: OracleConfig,
    pub fuzzy: FuzzyConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            host: "0.0.0.0".to_string(),
            port: 8080,
            logging: LoggingConfig::default(),
            oracle: OracleConfig::default(),
            fuzzy: FuzzyConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing level when RUST_LOG is not set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// External translation oracle (xAI Grok) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// API key (lowest-priority source; database and environment win)
    pub api_key: Option<String>,
    /// Chat-completions base URL
    pub base_url: String,
    /// Model identifier
    pub model: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Maximum oracle invocations per resolution
    pub max_attempts: u32,
    /// Rate-limit backoff base; the wait before retry N is `base * 2^N`
    pub backoff_base_ms: u64,
    /// Client-side request quota
    pub requests_per_second: u32,
    /// Request search-augmented answers (live web/news search)
    pub live_search: bool,
    /// Domains the live search may consult
    pub allowed_websites: Vec<String>,
    /// Oldest publication date live search may consult
    pub search_from_date: NaiveDate,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.x.ai/v1".to_string(),
            model: "grok-3".to_string(),
            timeout_secs: 3600,
            max_attempts: 3,
            backoff_base_ms: 1000,
            requests_per_second: 5,
            live_search: true,
            allowed_websites: vec![
                "midland.com.hk".to_string(),
                "centaline.com.hk".to_string(),
                "28hse.com".to_string(),
                "gov.hk".to_string(),
                "landsd.gov.hk".to_string(),
            ],
            search_from_date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default(),
        }
    }
}

/// Fuzzy matching layer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FuzzyConfig {
    /// Run the fuzzy layer at all
    pub enabled: bool,
    /// Minimum combined similarity for a match
    pub threshold: f64,
    /// Semantic similarity backend; character-only when absent
    pub embedding: Option<EmbeddingConfig>,
}

impl Default for FuzzyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold: 0.75,
            embedding: None,
        }
    }
}

/// OpenAI-compatible embeddings endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub base_url: String,
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Load TOML configuration from `path`
///
/// Missing file → warning + defaults. Unreadable or malformed file → error.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!(
            "Config file {} not found, using defaults",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;

    validate(&config)?;
    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

fn validate(config: &TomlConfig) -> Result<()> {
    if !(0.0..=1.0).contains(&config.fuzzy.threshold) {
        return Err(Error::Config(format!(
            "fuzzy.threshold must be within [0, 1], got {}",
            config.fuzzy.threshold
        )));
    }
    if config.oracle.max_attempts == 0 {
        return Err(Error::Config("oracle.max_attempts must be at least 1".to_string()));
    }
    if config.oracle.requests_per_second == 0 {
        return Err(Error::Config(
            "oracle.requests_per_second must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// Resolve the config file location
///
/// Returns `None` when no candidate exists; callers then use defaults.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Platform config directory
    dirs::config_dir()
        .map(|d| d.join("hkpt").join("config.toml"))
        .filter(|p| p.exists())
}

/// Resolve the SQLite database location
pub fn resolve_database_path(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(DATABASE_PATH_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(path) = &config.database_path {
        return path.clone();
    }

    // Priority 4: OS-dependent compiled default
    default_database_path()
}

/// Get OS-dependent default database path
fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("hkpt").join(DATABASE_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(DATABASE_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = TomlConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.oracle.max_attempts, 3);
        assert_eq!(config.oracle.backoff_base_ms, 1000);
        assert_eq!(config.oracle.search_from_date.to_string(), "2023-01-01");
        assert!(!config.fuzzy.enabled);
        assert!((config.fuzzy.threshold - 0.75).abs() < f64::EPSILON);
        assert!(config.fuzzy.embedding.is_none());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: TomlConfig = toml::from_str(
            r#"
            port = 9000

            [oracle]
            model = "grok-4"

            [fuzzy]
            enabled = true
            "#,
        )
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.oracle.model, "grok-4");
        assert_eq!(config.oracle.timeout_secs, 3600);
        assert!(config.fuzzy.enabled);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_validate_rejects_out_of_range_threshold() {
        let mut config = TomlConfig::default();
        config.fuzzy.threshold = 1.5;
        assert!(matches!(validate(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let mut config = TomlConfig::default();
        config.oracle.max_attempts = 0;
        assert!(validate(&config).is_err());
    }
}
