//! Settings database operations
//!
//! Key-value accessors over the `settings` table.

use hkpt_common::{Error, Result};
use sqlx::{Pool, Sqlite};

const ORACLE_API_KEY: &str = "oracle_api_key";

/// Get the oracle API key from the database
///
/// **Returns:** Some(key) if exists, None if not set
pub async fn get_oracle_api_key(db: &Pool<Sqlite>) -> Result<Option<String>> {
    get_setting(db, ORACLE_API_KEY).await
}

/// Set the oracle API key in the database
pub async fn set_oracle_api_key(db: &Pool<Sqlite>, key: String) -> Result<()> {
    set_setting(db, ORACLE_API_KEY, key).await
}

/// Generic setting getter (internal)
async fn get_setting<T>(db: &Pool<Sqlite>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let row: Option<(Option<String>,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await
        .map_err(Error::Database)?;

    match row {
        Some((Some(value),)) => {
            let parsed = value
                .parse::<T>()
                .map_err(|e| Error::Config(format!("Parse setting failed: {}", e)))?;
            Ok(Some(parsed))
        }
        _ => Ok(None),
    }
}

/// Generic setting setter (internal)
async fn set_setting<T>(db: &Pool<Sqlite>, key: &str, value: T) -> Result<()>
where
    T: std::fmt::Display,
{
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES (?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP",
    )
    .bind(key)
    .bind(value.to_string())
    .execute(db)
    .await
    .map_err(Error::Database)?;

    Ok(())
}
