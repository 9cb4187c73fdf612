//! # Repository Module
//!
//! Database repository implementations for Khata.
//!
//! ## Two Ways In
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Read path (no transaction)          Write path (inside a UnitOfWork)   │
//! │  ──────────────────────────          ───────────────────────────────    │
//! │  db.products().get_by_id(..)         product::fetch(uow.conn(), ..)     │
//! │       │                              product::set_stock(uow.conn(), ..) │
//! │       │ acquires a pool connection        │                             │
//! │       ▼                                   ▼                             │
//! │  same free function, same SQL ◄──────────┘                              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each module exposes free functions taking `&mut SqliteConnection` (usable
//! inside a unit of work) and a repository struct wrapping the pool for the
//! read-only paths. Every query filters by `owner_id`: a row owned by someone
//! else is indistinguishable from a missing one.
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Products and stock level
//! - [`MovementRepository`](movement::MovementRepository) - Stock movement log
//! - [`CustomerRepository`](customer::CustomerRepository) - Customers and balances
//! - [`LedgerRepository`](ledger::LedgerRepository) - Customer ledger transactions
//! - [`InvoiceRepository`](invoice::InvoiceRepository) - Invoices and numbering
//! - [`SettingsRepository`](settings::SettingsRepository) - Per-owner tax settings

pub mod customer;
pub mod invoice;
pub mod ledger;
pub mod movement;
pub mod product;
pub mod settings;

/// Generates a new record ID.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Escapes `%`, `_` and `\` for use inside a `LIKE ... ESCAPE '\'` pattern.
pub(crate) fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("rice"), "%rice%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }
}
