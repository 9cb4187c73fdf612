//! # Engine Services
//!
//! The transaction engine: every operation that changes stock, balances or
//! invoices goes through one of these services, inside one unit of work.
//!
//! ## Collaboration
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   InvoiceManager ─────────────┬─────────────────────────┐              │
//! │     create / change_status    │ stock_ledger::apply_*   │ customer_   │
//! │     update / delete           ▼                         ▼ ledger::*   │
//! │                          ┌──────────────┐      ┌──────────────────┐    │
//! │   StockLedger ──────────►│ products     │      │ customers        │◄── CustomerLedger
//! │     adjust, replay       │ stock_moves  │      │ ledger_txs       │    payments, replay
//! │                          └──────────────┘      └──────────────────┘    │
//! │                                 │                      │               │
//! │                                 └──── same UnitOfWork ─┘               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The connection-level functions in [`stock_ledger`] and [`customer_ledger`]
//! take the caller's open connection, so an invoice operation can combine
//! them without nesting transactions. The service structs wrap them with a
//! unit of work and the configured deadline.

pub mod config;
pub mod customer_ledger;
pub mod error;
pub mod invoice_manager;
pub mod stock_ledger;
pub mod tax;

pub use config::EngineConfig;
pub use customer_ledger::CustomerLedger;
pub use error::{ServiceError, ServiceResult};
pub use invoice_manager::InvoiceManager;
pub use stock_ledger::StockLedger;
pub use tax::{DbTaxSettingsProvider, FixedTaxSettings, TaxSettingsProvider};

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::pool::Database;
use crate::unit_of_work::UnitOfWork;
use khata_core::validation::validate_principal;

// =============================================================================
// Caller Context
// =============================================================================

/// Who is calling: the owning business account and the acting user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerContext {
    pub owner_id: String,
    pub actor: String,
}

impl CallerContext {
    /// Builds a context; the actor defaults to the owner.
    pub fn new(owner_id: &str, actor: Option<&str>) -> ServiceResult<Self> {
        let owner_id = validate_principal("owner_id", owner_id)?;
        let actor = match actor {
            Some(actor) => validate_principal("actor", actor)?,
            None => owner_id.clone(),
        };

        Ok(CallerContext { owner_id, actor })
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Entry point bundling the database, configuration and collaborators.
///
/// Cheap to clone; each accessor hands out a service sharing the same pool
/// and writer gate.
#[derive(Clone)]
pub struct Engine {
    db: Database,
    config: Arc<EngineConfig>,
    tax: Arc<dyn TaxSettingsProvider>,
}

impl Engine {
    /// Creates an engine reading tax settings from the database.
    pub fn new(db: Database, config: EngineConfig) -> Self {
        let tax = Arc::new(DbTaxSettingsProvider::new(db.clone()));
        Engine {
            db,
            config: Arc::new(config),
            tax,
        }
    }

    /// Replaces the tax settings source.
    pub fn with_tax_provider(mut self, provider: Arc<dyn TaxSettingsProvider>) -> Self {
        self.tax = provider;
        self
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn stock(&self) -> StockLedger {
        StockLedger::new(self.db.clone(), Arc::clone(&self.config))
    }

    pub fn customers(&self) -> CustomerLedger {
        CustomerLedger::new(self.db.clone(), Arc::clone(&self.config))
    }

    pub fn invoices(&self) -> InvoiceManager {
        InvoiceManager::new(
            self.db.clone(),
            Arc::clone(&self.config),
            Arc::clone(&self.tax),
        )
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("db", &self.db)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Deadline
// =============================================================================

/// Runs one write operation under the configured deadline, then commits.
///
/// The deadline covers waiting for the writer gate and the work itself. On
/// expiry the future is dropped, which drops its unit of work and rolls the
/// transaction back. `COMMIT` runs after the deadline, so a write that
/// reached SQLite is never reported as aborted.
pub(crate) async fn bounded<T, F>(
    timeout: Duration,
    operation: &'static str,
    fut: F,
) -> ServiceResult<T>
where
    F: Future<Output = ServiceResult<(UnitOfWork, T)>>,
{
    let (uow, value) = match tokio::time::timeout(timeout, fut).await {
        Ok(Err(err @ ServiceError::OperationAborted(_))) => {
            warn!(operation, error = %err, "Operation aborted");
            return Err(err);
        }
        Ok(result) => result?,
        Err(_) => {
            warn!(
                operation,
                timeout_ms = timeout.as_millis() as u64,
                "Operation timed out"
            );
            return Err(ServiceError::OperationAborted(format!(
                "{} did not finish within {}ms",
                operation,
                timeout.as_millis()
            )));
        }
    };

    if let Err(err) = uow.commit().await {
        warn!(operation, error = %err, "Commit failed");
        return Err(err.into());
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::DbConfig;
    use crate::repository::invoice;

    #[test]
    fn test_caller_context_defaults_actor_to_owner() {
        let ctx = CallerContext::new("shop-1", None).unwrap();
        assert_eq!(ctx.actor, "shop-1");

        let ctx = CallerContext::new(" shop-1 ", Some("cashier-7")).unwrap();
        assert_eq!(ctx.owner_id, "shop-1");
        assert_eq!(ctx.actor, "cashier-7");

        assert!(CallerContext::new("  ", None).is_err());
    }

    #[tokio::test]
    async fn test_bounded_times_out_as_aborted() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let result: ServiceResult<()> = bounded(Duration::from_millis(10), "sleepy", async {
            let uow = db.begin().await?;
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok((uow, ()))
        })
        .await;
        assert!(matches!(result, Err(ServiceError::OperationAborted(_))));

        // the dropped unit of work released the writer gate
        assert!(db.begin().await.is_ok());
    }

    #[tokio::test]
    async fn test_bounded_commits_after_the_work() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let first: ServiceResult<i64> = bounded(Duration::from_secs(5), "numbering", async {
            let mut uow = db.begin().await?;
            let seq = invoice::next_sequence(uow.conn(), "shop-1").await?;
            Ok((uow, seq))
        })
        .await;
        assert_eq!(first.unwrap(), 1);

        let mut uow = db.begin().await.unwrap();
        assert_eq!(invoice::next_sequence(uow.conn(), "shop-1").await.unwrap(), 2);
    }
}
