//! # Invoice Repository
//!
//! Invoices with their line items embedded as a JSON column, plus the
//! per-owner invoice number counter.
//!
//! ## Storage Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  invoices row                                                           │
//! │  ┌────────────┬───────────────┬──────────────────────────────────────┐ │
//! │  │ id, totals │ customer_id   │ items (TEXT)                         │ │
//! │  │ status ... │ customer_name │ [{"product_id":..,"quantity":1.5,..}]│ │
//! │  └────────────┴───────────────┴──────────────────────────────────────┘ │
//! │         │              │                       │                        │
//! │         ▼              ▼                       ▼                        │
//! │   Invoice { ..., customer: Option<CustomerRef>, items: Vec<InvoiceItem>}│
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Numbering
//! `invoice_counters` holds one row per owner. The next number is taken with
//! a single `INSERT ... ON CONFLICT DO UPDATE ... RETURNING` inside the
//! creating transaction, so a rolled-back create never burns a number.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::like_pattern;
use khata_core::{CustomerRef, Invoice, InvoiceItem, InvoiceStatus, PaymentMethod};

const INVOICE_COLUMNS: &str = r#"
    id, owner_id, invoice_number, invoice_date, customer_id, customer_name,
    items, subtotal_cents, tax_cents, total_cents, status, payment_method,
    amount_paid_cents, due_amount_cents, notes, created_by, created_at, updated_at
"#;

/// Default page size for invoice listings.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Largest page a caller may request.
pub const MAX_PAGE_SIZE: u32 = 500;

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct InvoiceRow {
    id: String,
    owner_id: String,
    invoice_number: String,
    invoice_date: DateTime<Utc>,
    customer_id: Option<String>,
    customer_name: Option<String>,
    items: String,
    subtotal_cents: i64,
    tax_cents: i64,
    total_cents: i64,
    status: InvoiceStatus,
    payment_method: PaymentMethod,
    amount_paid_cents: i64,
    due_amount_cents: i64,
    notes: Option<String>,
    created_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<InvoiceRow> for Invoice {
    type Error = DbError;

    fn try_from(row: InvoiceRow) -> Result<Self, Self::Error> {
        let items: Vec<InvoiceItem> =
            serde_json::from_str(&row.items).map_err(|e| DbError::Corrupt {
                entity: "Invoice".to_string(),
                id: row.id.clone(),
                reason: format!("items: {}", e),
            })?;

        let customer = row.customer_id.map(|id| CustomerRef {
            id,
            name: row.customer_name.unwrap_or_default(),
        });

        Ok(Invoice {
            id: row.id,
            owner_id: row.owner_id,
            invoice_number: row.invoice_number,
            invoice_date: row.invoice_date,
            customer,
            items,
            subtotal_cents: row.subtotal_cents,
            tax_cents: row.tax_cents,
            total_cents: row.total_cents,
            status: row.status,
            payment_method: row.payment_method,
            amount_paid_cents: row.amount_paid_cents,
            due_amount_cents: row.due_amount_cents,
            notes: row.notes,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn encode_items(invoice: &Invoice) -> DbResult<String> {
    serde_json::to_string(&invoice.items).map_err(|e| DbError::Corrupt {
        entity: "Invoice".to_string(),
        id: invoice.id.clone(),
        reason: format!("items: {}", e),
    })
}

// =============================================================================
// Listing Filter
// =============================================================================

/// Sort order for invoice listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceSort {
    #[default]
    DateDesc,
    DateAsc,
    NumberAsc,
    NumberDesc,
    TotalAsc,
    TotalDesc,
}

impl InvoiceSort {
    fn order_by(&self) -> &'static str {
        match self {
            InvoiceSort::DateDesc => " ORDER BY invoice_date DESC, invoice_number DESC",
            InvoiceSort::DateAsc => " ORDER BY invoice_date ASC, invoice_number ASC",
            InvoiceSort::NumberAsc => " ORDER BY invoice_number ASC",
            InvoiceSort::NumberDesc => " ORDER BY invoice_number DESC",
            InvoiceSort::TotalAsc => " ORDER BY total_cents ASC, invoice_number ASC",
            InvoiceSort::TotalDesc => " ORDER BY total_cents DESC, invoice_number DESC",
        }
    }
}

/// Invoice listing filter. Date bounds are inclusive calendar days (UTC).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvoiceFilter {
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default)]
    pub to: Option<NaiveDate>,
    /// Matches invoice number or customer name.
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub status: Option<InvoiceStatus>,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub sort: InvoiceSort,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
}

impl InvoiceFilter {
    pub fn page_size(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::default()))
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, owner_id: &str, filter: &InvoiceFilter) {
    qb.push(" WHERE owner_id = ").push_bind(owner_id.to_string());

    if let Some(from) = filter.from {
        qb.push(" AND invoice_date >= ").push_bind(start_of_day(from));
    }

    // Inclusive upper day: everything before the next midnight
    if let Some(next_day) = filter.to.and_then(|to| to.succ_opt()) {
        qb.push(" AND invoice_date < ").push_bind(start_of_day(next_day));
    }

    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status);
    }

    if let Some(customer_id) = &filter.customer_id {
        qb.push(" AND customer_id = ").push_bind(customer_id.clone());
    }

    if let Some(term) = filter.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        let pattern = like_pattern(term);
        qb.push(" AND (invoice_number LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR customer_name LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }
}

// =============================================================================
// Repository
// =============================================================================

#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    pub async fn get_by_id(&self, owner_id: &str, id: &str) -> DbResult<Option<Invoice>> {
        let mut conn = self.pool.acquire().await?;
        fetch(&mut conn, owner_id, id).await
    }

    /// Lists invoices matching the filter.
    pub async fn list(&self, owner_id: &str, filter: &InvoiceFilter) -> DbResult<Vec<Invoice>> {
        debug!(owner_id = %owner_id, ?filter, "Listing invoices");

        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {INVOICE_COLUMNS} FROM invoices"));
        push_filters(&mut qb, owner_id, filter);
        qb.push(filter.sort.order_by());
        qb.push(" LIMIT ")
            .push_bind(filter.page_size() as i64)
            .push(" OFFSET ")
            .push_bind(filter.offset.unwrap_or(0) as i64);

        let rows: Vec<InvoiceRow> = qb.build_query_as().fetch_all(&self.pool).await?;

        rows.into_iter().map(Invoice::try_from).collect()
    }

    /// Counts invoices matching the filter (ignores limit/offset).
    pub async fn count(&self, owner_id: &str, filter: &InvoiceFilter) -> DbResult<i64> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM invoices");
        push_filters(&mut qb, owner_id, filter);

        let count: i64 = qb.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(count)
    }
}

// =============================================================================
// Connection-level operations
// =============================================================================

pub async fn fetch(
    conn: &mut SqliteConnection,
    owner_id: &str,
    id: &str,
) -> DbResult<Option<Invoice>> {
    let sql = format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE owner_id = ?1 AND id = ?2");

    let row = sqlx::query_as::<_, InvoiceRow>(&sql)
        .bind(owner_id)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    row.map(Invoice::try_from).transpose()
}

pub async fn insert(conn: &mut SqliteConnection, invoice: &Invoice) -> DbResult<()> {
    debug!(id = %invoice.id, number = %invoice.invoice_number, "Inserting invoice");

    let items = encode_items(invoice)?;

    sqlx::query(
        r#"
        INSERT INTO invoices (
            id, owner_id, invoice_number, invoice_date, customer_id, customer_name,
            items, subtotal_cents, tax_cents, total_cents, status, payment_method,
            amount_paid_cents, due_amount_cents, notes, created_by, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
        "#,
    )
    .bind(&invoice.id)
    .bind(&invoice.owner_id)
    .bind(&invoice.invoice_number)
    .bind(invoice.invoice_date)
    .bind(invoice.customer.as_ref().map(|c| c.id.clone()))
    .bind(invoice.customer.as_ref().map(|c| c.name.clone()))
    .bind(items)
    .bind(invoice.subtotal_cents)
    .bind(invoice.tax_cents)
    .bind(invoice.total_cents)
    .bind(invoice.status)
    .bind(invoice.payment_method)
    .bind(invoice.amount_paid_cents)
    .bind(invoice.due_amount_cents)
    .bind(&invoice.notes)
    .bind(&invoice.created_by)
    .bind(invoice.created_at)
    .bind(invoice.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Rewrites every mutable column of an invoice.
pub async fn update(conn: &mut SqliteConnection, invoice: &Invoice) -> DbResult<()> {
    debug!(id = %invoice.id, status = %invoice.status, "Updating invoice");

    let items = encode_items(invoice)?;

    let result = sqlx::query(
        r#"
        UPDATE invoices SET
            invoice_date = ?3,
            customer_id = ?4,
            customer_name = ?5,
            items = ?6,
            subtotal_cents = ?7,
            tax_cents = ?8,
            total_cents = ?9,
            status = ?10,
            payment_method = ?11,
            amount_paid_cents = ?12,
            due_amount_cents = ?13,
            notes = ?14,
            updated_at = ?15
        WHERE owner_id = ?1 AND id = ?2
        "#,
    )
    .bind(&invoice.owner_id)
    .bind(&invoice.id)
    .bind(invoice.invoice_date)
    .bind(invoice.customer.as_ref().map(|c| c.id.clone()))
    .bind(invoice.customer.as_ref().map(|c| c.name.clone()))
    .bind(items)
    .bind(invoice.subtotal_cents)
    .bind(invoice.tax_cents)
    .bind(invoice.total_cents)
    .bind(invoice.status)
    .bind(invoice.payment_method)
    .bind(invoice.amount_paid_cents)
    .bind(invoice.due_amount_cents)
    .bind(&invoice.notes)
    .bind(invoice.updated_at)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Invoice", &invoice.id));
    }

    Ok(())
}

pub async fn delete(conn: &mut SqliteConnection, owner_id: &str, id: &str) -> DbResult<()> {
    debug!(id = %id, "Deleting invoice");

    let result = sqlx::query("DELETE FROM invoices WHERE owner_id = ?1 AND id = ?2")
        .bind(owner_id)
        .bind(id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Invoice", id));
    }

    Ok(())
}

/// Takes the next invoice sequence value for an owner (1, 2, 3, ...).
pub async fn next_sequence(conn: &mut SqliteConnection, owner_id: &str) -> DbResult<i64> {
    let value: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO invoice_counters (owner_id, last_value) VALUES (?1, 1)
        ON CONFLICT (owner_id) DO UPDATE SET last_value = last_value + 1
        RETURNING last_value
        "#,
    )
    .bind(owner_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_defaults() {
        let filter = InvoiceFilter::default();
        assert_eq!(filter.page_size(), DEFAULT_PAGE_SIZE);
        assert_eq!(filter.sort, InvoiceSort::DateDesc);

        let filter = InvoiceFilter {
            limit: Some(10_000),
            ..Default::default()
        };
        assert_eq!(filter.page_size(), MAX_PAGE_SIZE);
    }

    #[test]
    fn test_start_of_day_is_utc_midnight() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        assert_eq!(start_of_day(date).to_rfc3339(), "2026-03-14T00:00:00+00:00");
    }
}
