//! Database initialization
//!
//! Creates the SQLite file on first run, applies connection pragmas and
//! creates every table idempotently. Reference data is seeded afterwards by
//! [`crate::db::seed`].

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL allows concurrent readers alongside the single writer
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_schema(&pool).await?;
    let seeded = crate::db::seed::seed_geo_locations(&pool).await?;
    info!(inserted = seeded, "Geo dictionary ready");

    Ok(pool)
}

/// Create all tables (idempotent - safe to call multiple times)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_settings_table(pool).await?;
    create_geo_locations_table(pool).await?;
    create_slang_terms_table(pool).await?;
    create_official_translations_table(pool).await?;
    create_verified_translations_table(pool).await?;
    create_translation_history_table(pool).await?;
    Ok(())
}

/// Key-value settings (oracle API key, ...)
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Fixed place names: districts, areas, MTR stations, regions
pub async fn create_geo_locations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS geo_locations (
            id INTEGER PRIMARY KEY,
            chinese_name TEXT NOT NULL UNIQUE,
            english_name TEXT NOT NULL,
            category TEXT NOT NULL DEFAULT 'geo'
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Colloquial names with a curated English equivalent
pub async fn create_slang_terms_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS slang_terms (
            id INTEGER PRIMARY KEY,
            chinese_name TEXT NOT NULL UNIQUE,
            english_name TEXT NOT NULL,
            confidence REAL NOT NULL DEFAULT 0.9
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Trusted translations from developers / government sources
pub async fn create_official_translations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS official_translations (
            id INTEGER PRIMARY KEY,
            chinese_name TEXT NOT NULL UNIQUE,
            english_name TEXT NOT NULL,
            source TEXT NOT NULL DEFAULT 'official',
            confidence REAL NOT NULL DEFAULT 0.98,
            usage_count INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            last_used TIMESTAMP,
            verified BOOLEAN NOT NULL DEFAULT TRUE
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Translations learned from earlier accepted resolutions
pub async fn create_verified_translations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS verified_translations (
            id INTEGER PRIMARY KEY,
            chinese_name TEXT NOT NULL UNIQUE,
            english_name TEXT NOT NULL,
            confidence REAL NOT NULL,
            usage_count INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            last_used TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Append-only log of every resolution
pub async fn create_translation_history_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS translation_history (
            id INTEGER PRIMARY KEY,
            chinese_name TEXT NOT NULL,
            english_name TEXT NOT NULL,
            method TEXT NOT NULL,
            layer INTEGER NOT NULL,
            confidence REAL NOT NULL,
            source TEXT NOT NULL DEFAULT '',
            search_results TEXT NOT NULL DEFAULT '',
            timestamp TIMESTAMP NOT NULL,
            user_feedback TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_history_chinese_name ON translation_history(chinese_name)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
