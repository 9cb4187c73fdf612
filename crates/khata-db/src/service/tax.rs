//! # Tax Settings Provider
//!
//! The invoice manager asks for tax settings through this trait instead of
//! reading the table directly, so deployments can source them elsewhere.
//! Settings are always resolved before a unit of work opens.

use async_trait::async_trait;

use crate::pool::Database;
use crate::service::error::ServiceResult;
use khata_core::TaxSettings;

#[async_trait]
pub trait TaxSettingsProvider: Send + Sync {
    async fn tax_settings(&self, owner_id: &str) -> ServiceResult<TaxSettings>;
}

/// Reads settings from the `tax_settings` table.
#[derive(Debug, Clone)]
pub struct DbTaxSettingsProvider {
    db: Database,
}

impl DbTaxSettingsProvider {
    pub fn new(db: Database) -> Self {
        DbTaxSettingsProvider { db }
    }
}

#[async_trait]
impl TaxSettingsProvider for DbTaxSettingsProvider {
    async fn tax_settings(&self, owner_id: &str) -> ServiceResult<TaxSettings> {
        Ok(self.db.settings().tax_settings(owner_id).await?)
    }
}

/// Same settings for every owner. Handy in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedTaxSettings(pub TaxSettings);

#[async_trait]
impl TaxSettingsProvider for FixedTaxSettings {
    async fn tax_settings(&self, _owner_id: &str) -> ServiceResult<TaxSettings> {
        Ok(self.0)
    }
}
