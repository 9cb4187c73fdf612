//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Key Operations
//! - Lookup by ID (owner scoped)
//! - Name search with LIKE
//! - Stock level writes (called by the stock ledger only)

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::like_pattern;
use khata_core::{Product, Quantity};

const PRODUCT_COLUMNS: &str = r#"
    id, owner_id, name, category_id, price_cents, unit,
    current_stock, is_stock_required, min_quantity,
    created_at, updated_at
"#;

/// Repository for product reads outside a unit of work.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
/// let results = repo.search(owner_id, "rice", 20, 0).await?;
/// let product = repo.get_by_id(owner_id, "uuid-here").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by ID.
    pub async fn get_by_id(&self, owner_id: &str, id: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        fetch(&mut conn, owner_id, id).await
    }

    /// Lists products by name, optionally filtered by a search term.
    ///
    /// Empty query returns every product, alphabetically.
    pub async fn search(
        &self,
        owner_id: &str,
        query: &str,
        limit: u32,
        offset: u32,
    ) -> DbResult<Vec<Product>> {
        let query = query.trim();
        debug!(owner_id = %owner_id, query = %query, limit, "Searching products");

        let sql = format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE owner_id = ?1
              AND (?2 = '' OR name LIKE ?3 ESCAPE '\')
            ORDER BY name COLLATE NOCASE, id
            LIMIT ?4 OFFSET ?5
            "#
        );

        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(owner_id)
            .bind(query)
            .bind(like_pattern(query))
            .bind(limit as i64)
            .bind(offset as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Counts an owner's products (for diagnostics).
    pub async fn count(&self, owner_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE owner_id = ?1")
            .bind(owner_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Connection-level operations (usable inside a unit of work)
// =============================================================================

/// Fetches one product owned by `owner_id`.
pub async fn fetch(
    conn: &mut SqliteConnection,
    owner_id: &str,
    id: &str,
) -> DbResult<Option<Product>> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE owner_id = ?1 AND id = ?2");

    let product = sqlx::query_as::<_, Product>(&sql)
        .bind(owner_id)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(product)
}

/// Inserts a new product row.
pub async fn insert(conn: &mut SqliteConnection, product: &Product) -> DbResult<()> {
    debug!(id = %product.id, name = %product.name, "Inserting product");

    sqlx::query(
        r#"
        INSERT INTO products (
            id, owner_id, name, category_id, price_cents, unit,
            current_stock, is_stock_required, min_quantity,
            created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
    )
    .bind(&product.id)
    .bind(&product.owner_id)
    .bind(&product.name)
    .bind(&product.category_id)
    .bind(product.price_cents)
    .bind(product.unit)
    .bind(product.current_stock)
    .bind(product.is_stock_required)
    .bind(product.min_quantity)
    .bind(product.created_at)
    .bind(product.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Writes a new absolute stock level.
///
/// Only the stock ledger calls this, right before it writes the matching
/// movement entry.
pub async fn set_stock(
    conn: &mut SqliteConnection,
    id: &str,
    new_stock: Quantity,
    now: DateTime<Utc>,
) -> DbResult<()> {
    debug!(id = %id, new_stock = %new_stock, "Updating stock");

    let result = sqlx::query(
        r#"
        UPDATE products
        SET current_stock = ?2, updated_at = ?3
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .bind(new_stock)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Product", id));
    }

    Ok(())
}
