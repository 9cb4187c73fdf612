//! # Stock Rules
//!
//! Pure arithmetic behind the stock ledger: whether a change is allowed,
//! what the new level is, how the audit entry reads, and replaying the
//! movement log.
//!
//! ## Rule Order
//! ```text
//! apply(product, delta, unit)
//!   │
//!   ├── unit != product.unit ───────────► UnitMismatch
//!   ├── !product.is_stock_required ─────► None (no-op)
//!   ├── delta == 0 ─────────────────────► ValidationError
//!   ├── delta % min_quantity != 0 ──────► ValidationError (granularity)
//!   ├── stock + delta < 0 ──────────────► InsufficientStock
//!   └── Some(StockChange { previous, new })
//! ```

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::quantity::Quantity;
use crate::types::{InvoiceItem, Product, StockMovementEntry, StockMovementKind, UnitOfMeasure};

/// A validated stock change, ready to be persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockChange {
    pub previous: Quantity,
    pub delta: Quantity,
    pub new: Quantity,
}

/// Validates a signed change against a product and computes the new level.
///
/// Returns `Ok(None)` for products that don't track stock.
pub fn plan_change(
    product: &Product,
    delta: Quantity,
    unit: UnitOfMeasure,
) -> CoreResult<Option<StockChange>> {
    if unit != product.unit {
        return Err(CoreError::UnitMismatch {
            product: product.name.clone(),
            expected: product.unit,
            actual: unit,
        });
    }

    if !product.is_stock_required {
        return Ok(None);
    }

    if delta.is_zero() {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        }
        .into());
    }

    if !delta.is_multiple_of(product.min_quantity) {
        return Err(ValidationError::Granularity {
            field: "quantity".to_string(),
            increment: product.min_quantity,
        }
        .into());
    }

    let previous = product.current_stock;
    let new = previous
        .checked_add(delta)
        .filter(|q| !q.is_negative())
        .ok_or_else(|| CoreError::InsufficientStock {
            product: product.name.clone(),
            available: previous,
            requested: delta.abs(),
        })?;

    Ok(Some(StockChange {
        previous,
        delta,
        new,
    }))
}

/// Human-readable description of a movement, e.g. "Sold 3 piece".
///
/// ## Example
/// ```rust
/// use khata_core::quantity::Quantity;
/// use khata_core::stock::describe_movement;
/// use khata_core::types::{StockMovementKind, UnitOfMeasure};
///
/// let text = describe_movement(StockMovementKind::Return, Quantity::from_milli(1500), UnitOfMeasure::Kg);
/// assert_eq!(text, "Returned 1.5 kg");
/// ```
pub fn describe_movement(kind: StockMovementKind, delta: Quantity, unit: UnitOfMeasure) -> String {
    let magnitude = delta.abs();
    match kind {
        StockMovementKind::Initial => format!("Opening stock {} {}", magnitude, unit),
        StockMovementKind::Addition => format!("Added {} {}", magnitude, unit),
        StockMovementKind::Removal => format!("Removed {} {}", magnitude, unit),
        StockMovementKind::Sale => format!("Sold {} {}", magnitude, unit),
        StockMovementKind::Return => format!("Returned {} {}", magnitude, unit),
        StockMovementKind::Adjustment if delta.is_negative() => {
            format!("Adjusted down {} {}", magnitude, unit)
        }
        StockMovementKind::Adjustment => format!("Adjusted up {} {}", magnitude, unit),
    }
}

/// Description with an optional caller-supplied reason appended.
pub fn describe_with_reason(
    kind: StockMovementKind,
    delta: Quantity,
    unit: UnitOfMeasure,
    reason: Option<&str>,
) -> String {
    let base = describe_movement(kind, delta, unit);
    match reason.map(str::trim).filter(|r| !r.is_empty()) {
        Some(reason) => format!("{}: {}", base, reason),
        None => base,
    }
}

// =============================================================================
// Invoice Lines → Stock Lines
// =============================================================================

/// One signed change in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockLine {
    pub product_id: String,
    pub delta: Quantity,
    pub unit: UnitOfMeasure,
}

/// Lines that take an invoice's items out of stock.
pub fn sale_lines(items: &[InvoiceItem]) -> Vec<StockLine> {
    items
        .iter()
        .map(|item| StockLine {
            product_id: item.product_id.clone(),
            delta: -item.quantity,
            unit: item.unit,
        })
        .collect()
}

/// Lines that put an invoice's items back.
pub fn restore_lines(items: &[InvoiceItem]) -> Vec<StockLine> {
    items
        .iter()
        .map(|item| StockLine {
            product_id: item.product_id.clone(),
            delta: item.quantity,
            unit: item.unit,
        })
        .collect()
}

// =============================================================================
// Replay
// =============================================================================

/// Result of replaying a product's movement log from zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockReplay {
    /// Level reached by summing every movement.
    pub replayed: Quantity,
    /// Number of entries whose `previous_stock` didn't match the running
    /// level, or whose `new_stock != previous_stock + quantity`.
    pub broken_links: usize,
}

impl StockReplay {
    pub fn matches(&self, current: Quantity) -> bool {
        self.broken_links == 0 && self.replayed == current
    }
}

/// Replays movements (in timestamp order) starting from zero stock.
pub fn replay_movements(entries: &[StockMovementEntry]) -> StockReplay {
    let mut level = Quantity::zero();
    let mut broken_links = 0;

    for entry in entries {
        if entry.previous_stock != level || entry.new_stock != entry.previous_stock + entry.quantity {
            broken_links += 1;
        }
        level += entry.quantity;
    }

    StockReplay {
        replayed: level,
        broken_links,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
