//! # Settings Repository
//!
//! Per-owner tax settings. A missing row means tax is disabled.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use khata_core::TaxSettings;

#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SettingsRepository { pool }
    }

    /// The owner's tax settings, or the disabled default.
    pub async fn tax_settings(&self, owner_id: &str) -> DbResult<TaxSettings> {
        let settings = sqlx::query_as::<_, TaxSettings>(
            "SELECT enabled, rate_bps FROM tax_settings WHERE owner_id = ?1",
        )
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(settings.unwrap_or_default())
    }

    /// Inserts or replaces the owner's tax settings.
    pub async fn set_tax_settings(&self, owner_id: &str, settings: TaxSettings) -> DbResult<()> {
        debug!(owner_id = %owner_id, enabled = settings.enabled, rate_bps = settings.rate_bps, "Saving tax settings");

        sqlx::query(
            r#"
            INSERT INTO tax_settings (owner_id, enabled, rate_bps, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (owner_id) DO UPDATE SET
                enabled = excluded.enabled,
                rate_bps = excluded.rate_bps,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(owner_id)
        .bind(settings.enabled)
        .bind(settings.rate_bps)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
