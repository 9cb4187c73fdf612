//! # khata-db: Persistence and Engine Services for Khata
//!
//! SQLite storage via sqlx, plus the three ledger services that own every
//! write: the stock ledger, the customer balance ledger and the invoice
//! lifecycle manager.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Khata Data Flow                                │
//! │                                                                         │
//! │  HTTP handler (POST /invoices)                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     khata-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────────────┐                                          │   │
//! │  │   │ Engine          │  InvoiceManager ──┬──► StockLedger       │   │
//! │  │   │ (service/)      │                   └──► CustomerLedger    │   │
//! │  │   └────────┬────────┘                                          │   │
//! │  │            │ one UnitOfWork per operation                       │   │
//! │  │            ▼                                                    │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │◄───│ product, ...  │    │  (embedded)  │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file (WAL)                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation, writer gate
//! - [`unit_of_work`] - One transaction per engine operation
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Row-level storage per table
//! - [`service`] - Stock ledger, customer ledger, invoice manager
//!
//! ## Usage
//!
//! ```rust,ignore
//! use khata_db::{Database, DbConfig, Engine, EngineConfig};
//!
//! let db = Database::new(DbConfig::new("khata.db")).await?;
//! let engine = Engine::new(db, EngineConfig::default());
//!
//! let invoice = engine.invoices().create(&ctx, request).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod service;
pub mod unit_of_work;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use unit_of_work::UnitOfWork;

pub use repository::invoice::{InvoiceFilter, InvoiceSort};
pub use service::{
    CallerContext, CustomerLedger, Engine, EngineConfig, InvoiceManager, ServiceError,
    ServiceResult, StockLedger,
};
