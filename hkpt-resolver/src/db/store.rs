//! SQLite-backed lookup store
//!
//! Reads the geo / slang / official / verified tables and appends to the
//! translation history. Counter increments are single `UPDATE ... + 1`
//! statements, so concurrent hits on the same record never lose updates.

use crate::types::{
    CorpusTier, LookupRecord, LookupStore, Provenance, StoreResult, TranslationResult,
    TranslationStats,
};
use crate::utils::db_retry::{retry_on_lock, DEFAULT_MAX_LOCK_WAIT_MS};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::SqlitePool;
use std::collections::HashMap;

/// Lookup store over the shared SQLite pool
#[derive(Clone)]
pub struct SqliteLookupStore {
    pool: SqlitePool,
    max_lock_wait_ms: u64,
}

impl SqliteLookupStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            max_lock_wait_ms: DEFAULT_MAX_LOCK_WAIT_MS,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Insert or replace an official translation
    pub async fn upsert_official(
        &self,
        chinese_name: &str,
        english_name: &str,
        source: &str,
        confidence: f64,
    ) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO official_translations (chinese_name, english_name, source, confidence)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(chinese_name) DO UPDATE SET
                english_name = excluded.english_name,
                source = excluded.source,
                confidence = excluded.confidence
            "#,
        )
        .bind(chinese_name)
        .bind(english_name)
        .bind(source)
        .bind(confidence)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Insert or replace a verified translation (usage counter preserved)
    pub async fn upsert_verified(
        &self,
        chinese_name: &str,
        english_name: &str,
        confidence: f64,
    ) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO verified_translations (chinese_name, english_name, confidence)
            VALUES (?, ?, ?)
            ON CONFLICT(chinese_name) DO UPDATE SET
                english_name = excluded.english_name,
                confidence = excluded.confidence
            "#,
        )
        .bind(chinese_name)
        .bind(english_name)
        .bind(confidence)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Insert or replace a slang term
    pub async fn upsert_slang(
        &self,
        chinese_name: &str,
        english_name: &str,
        confidence: f64,
    ) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO slang_terms (chinese_name, english_name, confidence)
            VALUES (?, ?, ?)
            ON CONFLICT(chinese_name) DO UPDATE SET
                english_name = excluded.english_name,
                confidence = excluded.confidence
            "#,
        )
        .bind(chinese_name)
        .bind(english_name)
        .bind(confidence)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Parse a stored timestamp; tolerates RFC 3339 and SQLite's default format
fn parse_timestamp(raw: Option<String>) -> Option<DateTime<Utc>> {
    let raw = raw?;
    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[async_trait]
impl LookupStore for SqliteLookupStore {
    async fn get_geo(&self, chinese_name: &str) -> StoreResult<Option<LookupRecord>> {
        let row: Option<(String, String)> = sqlx::query_as(
            "SELECT english_name, category FROM geo_locations WHERE chinese_name = ?",
        )
        .bind(chinese_name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(english_name, category)| LookupRecord {
            chinese_name: chinese_name.to_string(),
            english_name,
            confidence: 0.99,
            provenance: Provenance::Geo { category },
        }))
    }

    async fn get_slang(
        &self,
        chinese_name: &str,
        min_confidence: f64,
    ) -> StoreResult<Option<LookupRecord>> {
        let row: Option<(String, f64)> = sqlx::query_as(
            "SELECT english_name, confidence FROM slang_terms WHERE chinese_name = ? AND confidence >= ?",
        )
        .bind(chinese_name)
        .bind(min_confidence)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(english_name, confidence)| LookupRecord {
            chinese_name: chinese_name.to_string(),
            english_name,
            confidence,
            provenance: Provenance::Slang,
        }))
    }

    async fn get_official(&self, chinese_name: &str) -> StoreResult<Option<LookupRecord>> {
        let row: Option<(String, String, f64, i64)> = sqlx::query_as(
            r#"
            SELECT english_name, source, confidence, usage_count
            FROM official_translations
            WHERE chinese_name = ?
            "#,
        )
        .bind(chinese_name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(english_name, source, confidence, usage_count)| LookupRecord {
            chinese_name: chinese_name.to_string(),
            english_name,
            confidence,
            provenance: Provenance::Official { source, usage_count },
        }))
    }

    async fn get_verified(&self, chinese_name: &str) -> StoreResult<Option<LookupRecord>> {
        let row: Option<(String, f64, i64, Option<String>)> = sqlx::query_as(
            r#"
            SELECT english_name, confidence, usage_count, CAST(last_used AS TEXT)
            FROM verified_translations
            WHERE chinese_name = ?
            "#,
        )
        .bind(chinese_name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(english_name, confidence, usage_count, last_used)| LookupRecord {
            chinese_name: chinese_name.to_string(),
            english_name,
            confidence,
            provenance: Provenance::Verified {
                usage_count,
                last_used: parse_timestamp(last_used),
            },
        }))
    }

    async fn list_all_known(&self) -> StoreResult<HashMap<String, String>> {
        let mut known = HashMap::new();

        let official: Vec<(String, String)> =
            sqlx::query_as("SELECT chinese_name, english_name FROM official_translations")
                .fetch_all(&self.pool)
                .await?;
        known.extend(official);

        // Verified entries are inserted last so they win on duplicate keys
        let verified: Vec<(String, String)> =
            sqlx::query_as("SELECT chinese_name, english_name FROM verified_translations")
                .fetch_all(&self.pool)
                .await?;
        known.extend(verified);

        Ok(known)
    }

    async fn record_history(&self, result: &TranslationResult) -> StoreResult<()> {
        let search_results = result
            .search_analysis
            .as_ref()
            .map(|value| value.to_string())
            .unwrap_or_default();
        let search_results = search_results.as_str();

        retry_on_lock("record translation history", self.max_lock_wait_ms, || async move {
            sqlx::query(
                r#"
                INSERT INTO translation_history
                    (chinese_name, english_name, method, layer, confidence, source, search_results, timestamp)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&result.chinese_name)
            .bind(&result.english_name)
            .bind(&result.method)
            .bind(result.layer as i64)
            .bind(result.confidence)
            .bind(&result.source)
            .bind(search_results)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(hkpt_common::Error::Database)?;
            Ok(())
        })
        .await
    }

    async fn increment_usage(&self, chinese_name: &str, tier: CorpusTier) -> StoreResult<()> {
        let sql = match tier {
            CorpusTier::Official => {
                "UPDATE official_translations SET usage_count = usage_count + 1, last_used = ? WHERE chinese_name = ?"
            }
            CorpusTier::Verified => {
                "UPDATE verified_translations SET usage_count = usage_count + 1, last_used = ? WHERE chinese_name = ?"
            }
        };

        retry_on_lock("increment usage count", self.max_lock_wait_ms, || async move {
            sqlx::query(sql)
                .bind(Utc::now())
                .bind(chinese_name)
                .execute(&self.pool)
                .await
                .map_err(hkpt_common::Error::Database)?;
            Ok(())
        })
        .await
    }

    async fn stats(&self) -> StoreResult<TranslationStats> {
        let layers: Vec<(i64, i64)> = sqlx::query_as(
            "SELECT layer, COUNT(*) FROM translation_history GROUP BY layer",
        )
        .fetch_all(&self.pool)
        .await?;

        let methods: Vec<(String, i64)> = sqlx::query_as(
            "SELECT method, COUNT(*) FROM translation_history GROUP BY method",
        )
        .fetch_all(&self.pool)
        .await?;

        let average: Option<f64> =
            sqlx::query_scalar("SELECT AVG(confidence) FROM translation_history")
                .fetch_one(&self.pool)
                .await?;

        let layer_distribution: std::collections::BTreeMap<u8, i64> = layers
            .into_iter()
            .map(|(layer, count)| (layer.clamp(0, u8::MAX as i64) as u8, count))
            .collect();
        let total_translations = layer_distribution.values().sum();

        Ok(TranslationStats {
            layer_distribution,
            method_distribution: methods.into_iter().collect(),
            average_confidence: average
                .map(|avg| (avg * 1000.0).round() / 1000.0)
                .unwrap_or(0.0),
            total_translations,
        })
    }
}
