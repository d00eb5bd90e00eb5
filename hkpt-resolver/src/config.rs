//! Configuration resolution for hkpt-resolver
//!
//! The oracle API key is resolved with Database → ENV → TOML priority.

use hkpt_common::config::TomlConfig;
use hkpt_common::Result;
use sqlx::{Pool, Sqlite};
use tracing::{info, warn};

/// Environment variables checked for the oracle key, in order
pub const API_KEY_ENV_VARS: &[&str] = &["GROK_API_KEY", "XAI_API_KEY"];

/// Resolve the oracle API key from 3-tier configuration
///
/// **Priority:** Database → ENV → TOML
///
/// Returns `Ok(None)` when no tier has a key. The service still starts; AI
/// requests then degrade to the synthetic fallback.
pub async fn resolve_oracle_api_key(
    db: &Pool<Sqlite>,
    toml_config: &TomlConfig,
) -> Result<Option<String>> {
    let db_key = crate::db::settings::get_oracle_api_key(db)
        .await?
        .filter(|key| is_valid_key(key));
    let env_key = env_api_key();
    let toml_key = toml_config
        .oracle
        .api_key
        .clone()
        .filter(|key| is_valid_key(key));

    let sources: Vec<&str> = [
        (db_key.is_some(), "database"),
        (env_key.is_some(), "environment"),
        (toml_key.is_some(), "TOML"),
    ]
    .iter()
    .filter(|(present, _)| *present)
    .map(|(_, source)| *source)
    .collect();

    // Warn if multiple sources (potential misconfiguration)
    if sources.len() > 1 {
        warn!(
            "Oracle API key found in multiple sources: {}. Using {} (highest priority).",
            sources.join(", "),
            sources[0]
        );
    }

    if let Some(key) = db_key {
        info!("Oracle API key loaded from database");
        return Ok(Some(key));
    }

    if let Some(key) = env_key {
        info!("Oracle API key loaded from environment variable");
        return Ok(Some(key));
    }

    if let Some(key) = toml_key {
        info!("Oracle API key loaded from TOML config");
        return Ok(Some(key));
    }

    warn!(
        "Oracle API key not configured. Set {} or oracle.api_key in the config file; \
         AI translations will use the synthetic fallback",
        API_KEY_ENV_VARS.join(" / ")
    );
    Ok(None)
}

fn env_api_key() -> Option<String> {
    API_KEY_ENV_VARS
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|key| is_valid_key(key))
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
