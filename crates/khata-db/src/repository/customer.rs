//! # Customer Repository
//!
//! Customers and their denormalized balance columns. The balance columns
//! are only written by the customer ledger, always together with a ledger
//! transaction in the same unit of work.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::like_pattern;
use khata_core::ledger::LedgerTotals;
use khata_core::Customer;

const CUSTOMER_COLUMNS: &str = r#"
    id, owner_id, name, phone, email, address,
    amount_due_cents, total_purchases_cents, total_payments_cents,
    last_transaction_date, created_at, updated_at
"#;

#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    pub async fn get_by_id(&self, owner_id: &str, id: &str) -> DbResult<Option<Customer>> {
        let mut conn = self.pool.acquire().await?;
        fetch(&mut conn, owner_id, id).await
    }

    /// Lists customers, matching the search term against name, phone and email.
    pub async fn search(
        &self,
        owner_id: &str,
        query: &str,
        limit: u32,
        offset: u32,
    ) -> DbResult<Vec<Customer>> {
        let query = query.trim();
        debug!(owner_id = %owner_id, query = %query, "Searching customers");

        let sql = format!(
            r#"
            SELECT {CUSTOMER_COLUMNS}
            FROM customers
            WHERE owner_id = ?1
              AND (?2 = ''
                   OR name LIKE ?3 ESCAPE '\'
                   OR phone LIKE ?3 ESCAPE '\'
                   OR email LIKE ?3 ESCAPE '\')
            ORDER BY name COLLATE NOCASE, id
            LIMIT ?4 OFFSET ?5
            "#
        );

        let customers = sqlx::query_as::<_, Customer>(&sql)
            .bind(owner_id)
            .bind(query)
            .bind(like_pattern(query))
            .bind(limit as i64)
            .bind(offset as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok(customers)
    }
}

// =============================================================================
// Connection-level operations
// =============================================================================

pub async fn fetch(
    conn: &mut SqliteConnection,
    owner_id: &str,
    id: &str,
) -> DbResult<Option<Customer>> {
    let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE owner_id = ?1 AND id = ?2");

    let customer = sqlx::query_as::<_, Customer>(&sql)
        .bind(owner_id)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(customer)
}

pub async fn insert(conn: &mut SqliteConnection, customer: &Customer) -> DbResult<()> {
    debug!(id = %customer.id, name = %customer.name, "Inserting customer");

    sqlx::query(
        r#"
        INSERT INTO customers (
            id, owner_id, name, phone, email, address,
            amount_due_cents, total_purchases_cents, total_payments_cents,
            last_transaction_date, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&customer.id)
    .bind(&customer.owner_id)
    .bind(&customer.name)
    .bind(&customer.phone)
    .bind(&customer.email)
    .bind(&customer.address)
    .bind(customer.amount_due_cents)
    .bind(customer.total_purchases_cents)
    .bind(customer.total_payments_cents)
    .bind(customer.last_transaction_date)
    .bind(customer.created_at)
    .bind(customer.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Overwrites the balance aggregates.
pub async fn set_totals(
    conn: &mut SqliteConnection,
    id: &str,
    totals: &LedgerTotals,
    now: DateTime<Utc>,
) -> DbResult<()> {
    debug!(
        id = %id,
        amount_due = %totals.amount_due,
        "Updating customer balance"
    );

    let result = sqlx::query(
        r#"
        UPDATE customers SET
            amount_due_cents = ?2,
            total_purchases_cents = ?3,
            total_payments_cents = ?4,
            last_transaction_date = ?5,
            updated_at = ?6
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .bind(totals.amount_due.cents())
    .bind(totals.total_purchases.cents())
    .bind(totals.total_payments.cents())
    .bind(totals.last_transaction_date)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Customer", id));
    }

    Ok(())
}
