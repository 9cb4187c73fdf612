//! # Ledger Transaction Repository
//!
//! Customer ledger rows. Append-only, except that reconciliation may delete
//! an invoice's rows and rewrite the before/after snapshots of the rest.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use khata_core::LedgerTransaction;

const TRANSACTION_COLUMNS: &str = r#"
    id, owner_id, customer_id, kind, amount_cents, transaction_date,
    invoice_id, invoice_number, balance_before_cents, balance_after_cents,
    payment_mode, description, actor, created_at
"#;

#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: SqlitePool,
}

impl LedgerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        LedgerRepository { pool }
    }

    /// A customer's transactions in insertion order.
    pub async fn list_for_customer(
        &self,
        owner_id: &str,
        customer_id: &str,
    ) -> DbResult<Vec<LedgerTransaction>> {
        let mut conn = self.pool.acquire().await?;
        list_for_customer(&mut conn, owner_id, customer_id).await
    }

    /// Transactions tied to one invoice, across customers.
    pub async fn list_for_invoice(
        &self,
        owner_id: &str,
        invoice_id: &str,
    ) -> DbResult<Vec<LedgerTransaction>> {
        let mut conn = self.pool.acquire().await?;
        list_for_invoice(&mut conn, owner_id, invoice_id).await
    }
}

// =============================================================================
// Connection-level operations
// =============================================================================

pub async fn insert(conn: &mut SqliteConnection, tx: &LedgerTransaction) -> DbResult<()> {
    debug!(
        customer_id = %tx.customer_id,
        kind = tx.kind.as_str(),
        amount_cents = tx.amount_cents,
        "Recording ledger transaction"
    );

    sqlx::query(
        r#"
        INSERT INTO ledger_transactions (
            id, owner_id, customer_id, kind, amount_cents, transaction_date,
            invoice_id, invoice_number, balance_before_cents, balance_after_cents,
            payment_mode, description, actor, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
        "#,
    )
    .bind(&tx.id)
    .bind(&tx.owner_id)
    .bind(&tx.customer_id)
    .bind(tx.kind)
    .bind(tx.amount_cents)
    .bind(tx.transaction_date)
    .bind(&tx.invoice_id)
    .bind(&tx.invoice_number)
    .bind(tx.balance_before_cents)
    .bind(tx.balance_after_cents)
    .bind(tx.payment_mode)
    .bind(&tx.description)
    .bind(&tx.actor)
    .bind(tx.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn list_for_customer(
    conn: &mut SqliteConnection,
    owner_id: &str,
    customer_id: &str,
) -> DbResult<Vec<LedgerTransaction>> {
    let sql = format!(
        "SELECT {TRANSACTION_COLUMNS} FROM ledger_transactions \
         WHERE owner_id = ?1 AND customer_id = ?2 ORDER BY seq"
    );

    let txs = sqlx::query_as::<_, LedgerTransaction>(&sql)
        .bind(owner_id)
        .bind(customer_id)
        .fetch_all(&mut *conn)
        .await?;

    Ok(txs)
}

pub async fn list_for_invoice(
    conn: &mut SqliteConnection,
    owner_id: &str,
    invoice_id: &str,
) -> DbResult<Vec<LedgerTransaction>> {
    let sql = format!(
        "SELECT {TRANSACTION_COLUMNS} FROM ledger_transactions \
         WHERE owner_id = ?1 AND invoice_id = ?2 ORDER BY seq"
    );

    let txs = sqlx::query_as::<_, LedgerTransaction>(&sql)
        .bind(owner_id)
        .bind(invoice_id)
        .fetch_all(&mut *conn)
        .await?;

    Ok(txs)
}

/// Deletes a customer's transactions for one invoice. Returns rows removed.
pub async fn delete_for_invoice(
    conn: &mut SqliteConnection,
    customer_id: &str,
    invoice_id: &str,
) -> DbResult<u64> {
    let result = sqlx::query(
        "DELETE FROM ledger_transactions WHERE customer_id = ?1 AND invoice_id = ?2",
    )
    .bind(customer_id)
    .bind(invoice_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

/// Rewrites a transaction's balance snapshots after a replay.
pub async fn set_snapshot(
    conn: &mut SqliteConnection,
    id: &str,
    balance_before_cents: i64,
    balance_after_cents: i64,
) -> DbResult<()> {
    sqlx::query(
        r#"
        UPDATE ledger_transactions
        SET balance_before_cents = ?2, balance_after_cents = ?3
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .bind(balance_before_cents)
    .bind(balance_after_cents)
    .execute(&mut *conn)
    .await?;

    Ok(())
}
