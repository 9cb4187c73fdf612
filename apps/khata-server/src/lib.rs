//! # Khata Server
//!
//! HTTP + JSON front for the invoice & ledger transaction engine.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Khata Server                                    │
//! │                                                                         │
//! │  ┌──────────────┐   ┌──────────────────┐   ┌──────────────────────────┐ │
//! │  │  /invoices   │   │  /customers      │   │  /products               │ │
//! │  │              │   │                  │   │                          │ │
//! │  │ • create     │   │ • create / list  │   │ • create / list          │ │
//! │  │ • update     │   │ • payments       │   │ • stock adjust           │ │
//! │  │ • status     │   │ • transactions   │   │ • movements              │ │
//! │  │ • delete     │   │ • balance check  │   │ • replay check           │ │
//! │  │ • receipt    │   │                  │   │                          │ │
//! │  └──────┬───────┘   └────────┬─────────┘   └────────────┬─────────────┘ │
//! │         └────────────────────┼──────────────────────────┘               │
//! │                              ▼                                          │
//! │                  Engine (khata-db services)                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Every route except `/health` needs `x-owner-id`; `x-user-id` names the
//! acting user and defaults to the owner.
//!
//! ## Configuration
//! Environment variables (see [`config::ServerConfig`]):
//! - `KHATA_BIND_ADDR` - listen address (default: 127.0.0.1:8080)
//! - `KHATA_DATABASE_PATH` - SQLite file (default: ./khata.db)
//! - `KHATA_MAX_CONNECTIONS` - pool size (default: 5)
//! - `KHATA_OPERATION_TIMEOUT_MS` - per-operation deadline (default: 5000)
//! - `KHATA_RECONCILE_ON_DELETE` - remove ledger charges on delete (default: true)
//! - `KHATA_STORE_NAME` - receipt header (default: Khata)

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;

use axum::routing::{get, post, put};
use axum::Router;

use khata_db::Engine;

// Re-exports
pub use config::{ConfigError, ServerConfig};
pub use error::{ApiError, ApiResult};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub engine: Engine,
}

impl AppState {
    pub fn new(engine: Engine) -> Self {
        AppState { engine }
    }
}

/// Builds the full route table.
pub fn router(state: AppState) -> Router {
    use handlers::{customer, invoice, product, settings};

    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/invoices",
            post(invoice::create_invoice).get(invoice::list_invoices),
        )
        .route(
            "/invoices/{id}",
            get(invoice::get_invoice)
                .patch(invoice::update_invoice)
                .delete(invoice::delete_invoice),
        )
        .route("/invoices/{id}/status", put(invoice::change_status))
        .route("/invoices/{id}/receipt", get(invoice::receipt))
        .route(
            "/customers",
            post(customer::create_customer).get(customer::list_customers),
        )
        .route("/customers/{id}", get(customer::get_customer))
        .route("/customers/{id}/payments", post(customer::record_payment))
        .route("/customers/{id}/transactions", get(customer::transactions))
        .route("/customers/{id}/balance", get(customer::verify_balance))
        .route(
            "/products",
            post(product::create_product).get(product::list_products),
        )
        .route("/products/{id}", get(product::get_product))
        .route("/products/{id}/stock", post(product::adjust_stock))
        .route("/products/{id}/movements", get(product::movements))
        .route("/products/{id}/replay", get(product::replay_stock))
        .route("/settings/tax", get(settings::get_tax).put(settings::put_tax))
        .with_state(state)
}
