//! # Stock Movement Repository
//!
//! Append-only audit log of stock changes. Rows are never updated or
//! deleted; `seq` gives insertion order.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use khata_core::StockMovementEntry;

const MOVEMENT_COLUMNS: &str = r#"
    id, owner_id, product_id, quantity, unit, previous_stock, new_stock,
    kind, description, reference, invoice_id, actor, created_at
"#;

#[derive(Debug, Clone)]
pub struct MovementRepository {
    pool: SqlitePool,
}

impl MovementRepository {
    pub fn new(pool: SqlitePool) -> Self {
        MovementRepository { pool }
    }

    /// Movement history for one product, oldest first.
    pub async fn list_for_product(
        &self,
        owner_id: &str,
        product_id: &str,
    ) -> DbResult<Vec<StockMovementEntry>> {
        let mut conn = self.pool.acquire().await?;
        list_for_product(&mut conn, owner_id, product_id).await
    }

    /// Movements written on behalf of one invoice, oldest first.
    pub async fn list_for_invoice(
        &self,
        owner_id: &str,
        invoice_id: &str,
    ) -> DbResult<Vec<StockMovementEntry>> {
        let sql = format!(
            "SELECT {MOVEMENT_COLUMNS} FROM stock_movements \
             WHERE owner_id = ?1 AND invoice_id = ?2 ORDER BY seq"
        );

        let entries = sqlx::query_as::<_, StockMovementEntry>(&sql)
            .bind(owner_id)
            .bind(invoice_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(entries)
    }
}

pub async fn insert(conn: &mut SqliteConnection, entry: &StockMovementEntry) -> DbResult<()> {
    debug!(
        product_id = %entry.product_id,
        kind = %entry.kind,
        delta = %entry.quantity,
        "Recording stock movement"
    );

    sqlx::query(
        r#"
        INSERT INTO stock_movements (
            id, owner_id, product_id, quantity, unit, previous_stock, new_stock,
            kind, description, reference, invoice_id, actor, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
        "#,
    )
    .bind(&entry.id)
    .bind(&entry.owner_id)
    .bind(&entry.product_id)
    .bind(entry.quantity)
    .bind(entry.unit)
    .bind(entry.previous_stock)
    .bind(entry.new_stock)
    .bind(entry.kind)
    .bind(&entry.description)
    .bind(&entry.reference)
    .bind(&entry.invoice_id)
    .bind(&entry.actor)
    .bind(entry.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn list_for_product(
    conn: &mut SqliteConnection,
    owner_id: &str,
    product_id: &str,
) -> DbResult<Vec<StockMovementEntry>> {
    let sql = format!(
        "SELECT {MOVEMENT_COLUMNS} FROM stock_movements \
         WHERE owner_id = ?1 AND product_id = ?2 ORDER BY seq"
    );

    let entries = sqlx::query_as::<_, StockMovementEntry>(&sql)
        .bind(owner_id)
        .bind(product_id)
        .fetch_all(&mut *conn)
        .await?;

    Ok(entries)
}
