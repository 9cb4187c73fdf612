//! # Unit of Work
//!
//! One serialized database transaction spanning every write of an engine
//! operation.
//!
//! ```text
//!   db.begin()
//!     │  1. lock writer gate (waits behind other writers in this process)
//!     │  2. BEGIN
//!     ▼
//!   UnitOfWork ── conn() ──► repository calls (reads + writes)
//!     │
//!     ├── commit()  → COMMIT, gate released
//!     └── drop      → ROLLBACK, gate released
//! ```
//!
//! While a unit of work is open, all queries of that operation must go
//! through [`UnitOfWork::conn`]. Acquiring a second pool connection from
//! inside it can starve small pools.

use sqlx::{SqliteConnection, SqlitePool, Sqlite, Transaction};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::error::{DbError, DbResult};

/// An open write transaction holding the process-wide writer gate.
pub struct UnitOfWork {
    tx: Transaction<'static, Sqlite>,
    // Field order matters: the transaction is dropped (rolled back) before
    // the gate is released.
    _guard: OwnedMutexGuard<()>,
}

impl UnitOfWork {
    pub(crate) async fn begin(pool: &SqlitePool, gate: Arc<Mutex<()>>) -> DbResult<Self> {
        let guard = gate.lock_owned().await;
        let tx = pool.begin().await.map_err(|e| match DbError::from(e) {
            DbError::Internal(msg) => DbError::TransactionFailed(msg),
            other => other,
        })?;

        debug!("Unit of work started");
        Ok(UnitOfWork { tx, _guard: guard })
    }

    /// The transaction's connection, for repository calls.
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut *self.tx
    }

    /// Commits every write made through this unit of work.
    pub async fn commit(self) -> DbResult<()> {
        self.tx.commit().await.map_err(|e| match DbError::from(e) {
            busy @ DbError::Busy(_) => busy,
            other => DbError::TransactionFailed(other.to_string()),
        })?;

        debug!("Unit of work committed");
        Ok(())
    }
}

impl std::fmt::Debug for UnitOfWork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitOfWork").finish_non_exhaustive()
    }
}
