//! # Stock Ledger
//!
//! Owns product stock levels and the append-only movement log. Every change
//! to `products.current_stock` is made here, paired with exactly one
//! movement entry in the same transaction.
//!
//! ## One Change
//! ```text
//! apply_change(conn, product_id, delta, unit, movement)
//!   │
//!   ├── product::fetch ───────────── missing → NotFound
//!   ├── stock::plan_change ───────── UnitMismatch / Validation / InsufficientStock
//!   │        │
//!   │        └── None (untracked product) → return None, nothing written
//!   ├── product::set_stock(new)
//!   └── movement::insert(previous, delta, new, description)
//! ```
//!
//! Batches apply lines in order on the same connection; the first failure
//! propagates and the caller's unit of work rolls every earlier line back.

use chrono::Utc;
use serde::Deserialize;
use sqlx::SqliteConnection;
use std::sync::Arc;
use tracing::{debug, info};

use crate::pool::Database;
use crate::repository::{generate_id, movement, product};
use crate::service::config::EngineConfig;
use crate::service::error::{ServiceError, ServiceResult};
use crate::service::{bounded, CallerContext};
use khata_core::stock::{self, StockLine};
use khata_core::validation::{validate_name, validate_optional_text, validate_price_cents};
use khata_core::{
    Product, Quantity, StockMovementEntry, StockMovementKind, UnitOfMeasure, ValidationError,
};

// =============================================================================
// Requests
// =============================================================================

/// Why a change is being made, copied onto the movement entry.
#[derive(Debug, Clone, Copy)]
pub struct MovementContext<'a> {
    pub kind: StockMovementKind,
    pub reason: Option<&'a str>,
    pub reference: Option<&'a str>,
    pub invoice_id: Option<&'a str>,
}

impl<'a> MovementContext<'a> {
    pub fn new(kind: StockMovementKind) -> Self {
        MovementContext {
            kind,
            reason: None,
            reference: None,
            invoice_id: None,
        }
    }

    /// Ties the movement to an invoice (its id and number).
    pub fn for_invoice(kind: StockMovementKind, invoice_id: &'a str, number: &'a str) -> Self {
        MovementContext {
            kind,
            reason: None,
            reference: Some(number),
            invoice_id: Some(invoice_id),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub category_id: Option<String>,
    pub price_cents: i64,
    pub unit: UnitOfMeasure,
    #[serde(default)]
    pub initial_stock: Quantity,
    #[serde(default = "default_true")]
    pub is_stock_required: bool,
    /// Defaults to the unit's natural increment.
    #[serde(default)]
    pub min_quantity: Option<Quantity>,
}

fn default_true() -> bool {
    true
}

/// A manual stock correction. Positive adds, negative removes.
#[derive(Debug, Clone, Deserialize)]
pub struct StockAdjustment {
    pub quantity: Quantity,
    /// Defaults to the product's unit.
    #[serde(default)]
    pub unit: Option<UnitOfMeasure>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
}

/// Outcome of replaying a product's movement log.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct StockReplayReport {
    pub product_id: String,
    pub current: Quantity,
    pub replayed: Quantity,
    pub broken_links: usize,
    pub consistent: bool,
}

// =============================================================================
// Connection-level operations
// =============================================================================

/// Applies one signed change. Returns `None` for untracked products.
pub async fn apply_change(
    conn: &mut SqliteConnection,
    ctx: &CallerContext,
    product_id: &str,
    delta: Quantity,
    unit: UnitOfMeasure,
    movement: &MovementContext<'_>,
) -> ServiceResult<Option<StockMovementEntry>> {
    let product = product::fetch(conn, &ctx.owner_id, product_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Product", product_id))?;

    let Some(change) = stock::plan_change(&product, delta, unit)? else {
        debug!(product_id = %product_id, "Stock not tracked, skipping");
        return Ok(None);
    };

    let now = Utc::now();
    product::set_stock(conn, &product.id, change.new, now).await?;

    let entry = StockMovementEntry {
        id: generate_id(),
        owner_id: ctx.owner_id.clone(),
        product_id: product.id.clone(),
        quantity: change.delta,
        unit: product.unit,
        previous_stock: change.previous,
        new_stock: change.new,
        kind: movement.kind,
        description: stock::describe_with_reason(movement.kind, delta, unit, movement.reason),
        reference: movement.reference.map(str::to_string),
        invoice_id: movement.invoice_id.map(str::to_string),
        actor: ctx.actor.clone(),
        created_at: now,
    };
    movement::insert(conn, &entry).await?;

    debug!(
        product_id = %product.id,
        kind = %movement.kind,
        previous = %change.previous,
        new = %change.new,
        "Stock changed"
    );

    Ok(Some(entry))
}

/// Applies lines in order. Entries for untracked products are omitted.
pub async fn apply_lines(
    conn: &mut SqliteConnection,
    ctx: &CallerContext,
    lines: &[StockLine],
    movement: &MovementContext<'_>,
) -> ServiceResult<Vec<StockMovementEntry>> {
    let mut entries = Vec::with_capacity(lines.len());

    for line in lines {
        if let Some(entry) =
            apply_change(conn, ctx, &line.product_id, line.delta, line.unit, movement).await?
        {
            entries.push(entry);
        }
    }

    Ok(entries)
}

// =============================================================================
// Service
// =============================================================================

/// Standalone stock operations, each in its own unit of work.
#[derive(Debug, Clone)]
pub struct StockLedger {
    db: Database,
    config: Arc<EngineConfig>,
}

impl StockLedger {
    pub fn new(db: Database, config: Arc<EngineConfig>) -> Self {
        StockLedger { db, config }
    }

    /// Creates a product. A tracked product with opening stock gets one
    /// `initial` movement so its log replays from zero.
    pub async fn create_product(
        &self,
        ctx: &CallerContext,
        request: NewProduct,
    ) -> ServiceResult<Product> {
        let name = validate_name("name", &request.name)?;
        let category_id = validate_optional_text("category_id", request.category_id.as_deref())?;
        validate_price_cents(request.price_cents)?;

        if request.initial_stock.is_negative() {
            return Err(ValidationError::Negative {
                field: "initial_stock".to_string(),
            }
            .into());
        }

        let min_quantity = request
            .min_quantity
            .unwrap_or_else(|| request.unit.default_increment());
        if !min_quantity.is_positive() {
            return Err(ValidationError::MustBePositive {
                field: "min_quantity".to_string(),
            }
            .into());
        }

        let now = Utc::now();
        let opening = request.initial_stock;
        let product = Product {
            id: generate_id(),
            owner_id: ctx.owner_id.clone(),
            name,
            category_id,
            price_cents: request.price_cents,
            unit: request.unit,
            // Tracked stock arrives through the initial movement below
            current_stock: if request.is_stock_required {
                Quantity::zero()
            } else {
                opening
            },
            is_stock_required: request.is_stock_required,
            min_quantity,
            created_at: now,
            updated_at: now,
        };

        let created = bounded(self.config.operation_timeout, "create_product", async {
            let mut uow = self.db.begin().await?;
            product::insert(uow.conn(), &product).await?;

            let mut created = product.clone();
            if product.is_stock_required && opening.is_positive() {
                let movement = MovementContext::new(StockMovementKind::Initial);
                if let Some(entry) =
                    apply_change(uow.conn(), ctx, &product.id, opening, product.unit, &movement)
                        .await?
                {
                    created.current_stock = entry.new_stock;
                }
            }

            Ok((uow, created))
        })
        .await?;

        info!(product_id = %created.id, name = %created.name, stock = %created.current_stock, "Product created");
        Ok(created)
    }

    pub async fn get_product(&self, ctx: &CallerContext, product_id: &str) -> ServiceResult<Product> {
        self.db
            .products()
            .get_by_id(&ctx.owner_id, product_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Product", product_id))
    }

    pub async fn list_products(
        &self,
        ctx: &CallerContext,
        query: &str,
        limit: u32,
        offset: u32,
    ) -> ServiceResult<Vec<Product>> {
        let query = khata_core::validation::validate_search_query(query)?;
        Ok(self
            .db
            .products()
            .search(&ctx.owner_id, &query, limit, offset)
            .await?)
    }

    /// Manual addition (positive) or removal (negative).
    pub async fn adjust_stock(
        &self,
        ctx: &CallerContext,
        product_id: &str,
        adjustment: StockAdjustment,
    ) -> ServiceResult<Option<StockMovementEntry>> {
        let reason = validate_optional_text("reason", adjustment.reason.as_deref())?;
        let reference = validate_optional_text("reference", adjustment.reference.as_deref())?;

        let kind = if adjustment.quantity.is_negative() {
            StockMovementKind::Removal
        } else {
            StockMovementKind::Addition
        };

        let entry = bounded(self.config.operation_timeout, "adjust_stock", async {
            let mut uow = self.db.begin().await?;

            // The unit is checked against the product inside apply_change
            let unit = match adjustment.unit {
                Some(unit) => unit,
                None => {
                    product::fetch(uow.conn(), &ctx.owner_id, product_id)
                        .await?
                        .ok_or_else(|| ServiceError::not_found("Product", product_id))?
                        .unit
                }
            };

            let movement = MovementContext {
                kind,
                reason: reason.as_deref(),
                reference: reference.as_deref(),
                invoice_id: None,
            };
            let entry =
                apply_change(uow.conn(), ctx, product_id, adjustment.quantity, unit, &movement)
                    .await?;

            Ok((uow, entry))
        })
        .await?;

        info!(product_id = %product_id, kind = %kind, delta = %adjustment.quantity, "Stock adjusted");
        Ok(entry)
    }

    /// One change in its own unit of work.
    pub async fn apply_stock_change(
        &self,
        ctx: &CallerContext,
        product_id: &str,
        delta: Quantity,
        unit: UnitOfMeasure,
        movement: MovementContext<'_>,
    ) -> ServiceResult<Option<StockMovementEntry>> {
        bounded(self.config.operation_timeout, "apply_stock_change", async {
            let mut uow = self.db.begin().await?;
            let entry = apply_change(uow.conn(), ctx, product_id, delta, unit, &movement).await?;
            Ok((uow, entry))
        })
        .await
    }

    /// All lines or none.
    pub async fn apply_batch(
        &self,
        ctx: &CallerContext,
        lines: &[StockLine],
        movement: MovementContext<'_>,
    ) -> ServiceResult<Vec<StockMovementEntry>> {
        let entries = bounded(self.config.operation_timeout, "apply_stock_batch", async {
            let mut uow = self.db.begin().await?;
            let entries = apply_lines(uow.conn(), ctx, lines, &movement).await?;
            Ok((uow, entries))
        })
        .await?;

        info!(lines = lines.len(), movements = entries.len(), kind = %movement.kind, "Stock batch applied");
        Ok(entries)
    }

    /// Movement history in the order it was written.
    pub async fn movements(
        &self,
        ctx: &CallerContext,
        product_id: &str,
    ) -> ServiceResult<Vec<StockMovementEntry>> {
        // NotFound for foreign or missing products, not an empty list
        self.get_product(ctx, product_id).await?;
        Ok(self
            .db
            .movements()
            .list_for_product(&ctx.owner_id, product_id)
            .await?)
    }

    /// Replays the movement log from zero and compares with current stock.
    pub async fn replay_stock(
        &self,
        ctx: &CallerContext,
        product_id: &str,
    ) -> ServiceResult<StockReplayReport> {
        let product = self.get_product(ctx, product_id).await?;
        let entries = self
            .db
            .movements()
            .list_for_product(&ctx.owner_id, product_id)
            .await?;

        let replay = stock::replay_movements(&entries);
        let consistent = !product.is_stock_required || replay.matches(product.current_stock);

        Ok(StockReplayReport {
            product_id: product.id,
            current: product.current_stock,
            replayed: replay.replayed,
            broken_links: replay.broken_links,
            consistent,
        })
    }
}
