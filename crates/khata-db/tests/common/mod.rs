//! Common test utilities for khata-db integration tests.
#![allow(dead_code)]

use std::sync::Once;

use khata_core::invoice::{ClaimedTotals, LineInput};
use khata_core::{Customer, InvoiceStatus, Product, Quantity, UnitOfMeasure};
use khata_db::service::customer_ledger::NewCustomer;
use khata_db::service::invoice_manager::CreateInvoiceRequest;
use khata_db::service::stock_ledger::NewProduct;
use khata_db::{CallerContext, Database, DbConfig, Engine, EngineConfig};

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,khata_db=debug,sqlx=warn")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Fresh in-memory engine plus a caller for a unique owner.
pub async fn spawn_engine() -> (Engine, CallerContext) {
    spawn_engine_with(EngineConfig::default()).await
}

pub async fn spawn_engine_with(config: EngineConfig) -> (Engine, CallerContext) {
    init_tracing();

    let db = Database::new(DbConfig::in_memory())
        .await
        .expect("Failed to open in-memory database");
    let engine = Engine::new(db, config);

    let owner = format!("shop-{}", uuid::Uuid::new_v4());
    let ctx = CallerContext::new(&owner, Some("cashier-1")).expect("valid caller");
    (engine, ctx)
}

pub fn qty(whole: i64) -> Quantity {
    Quantity::from_whole(whole)
}

pub async fn create_product(
    engine: &Engine,
    ctx: &CallerContext,
    name: &str,
    unit: UnitOfMeasure,
    price_cents: i64,
    stock: Quantity,
) -> Product {
    engine
        .stock()
        .create_product(
            ctx,
            NewProduct {
                name: name.to_string(),
                category_id: None,
                price_cents,
                unit,
                initial_stock: stock,
                is_stock_required: true,
                min_quantity: None,
            },
        )
        .await
        .expect("Failed to create product")
}

pub async fn create_customer(engine: &Engine, ctx: &CallerContext, name: &str) -> Customer {
    engine
        .customers()
        .create_customer(
            ctx,
            NewCustomer {
                name: name.to_string(),
                phone: None,
                email: None,
                address: None,
            },
        )
        .await
        .expect("Failed to create customer")
}

pub fn line(product: &Product, quantity: Quantity) -> LineInput {
    LineInput {
        product_id: product.id.clone(),
        quantity,
        unit: Some(product.unit),
        unit_price_cents: None,
        subtotal_cents: None,
    }
}

pub fn invoice_request(
    items: Vec<LineInput>,
    status: InvoiceStatus,
    payment_method: &str,
) -> CreateInvoiceRequest {
    CreateInvoiceRequest {
        customer_id: None,
        items,
        payment_method: Some(payment_method.to_string()),
        status: Some(status),
        amount_paid_cents: None,
        invoice_date: None,
        notes: None,
        claimed: ClaimedTotals::default(),
    }
}

pub async fn stock_of(engine: &Engine, ctx: &CallerContext, product: &Product) -> Quantity {
    engine
        .stock()
        .get_product(ctx, &product.id)
        .await
        .expect("product exists")
        .current_stock
}

pub async fn amount_due(engine: &Engine, ctx: &CallerContext, customer: &Customer) -> i64 {
    engine
        .customers()
        .get_customer(ctx, &customer.id)
        .await
        .expect("customer exists")
        .amount_due_cents
}

pub async fn invoice_count(engine: &Engine, ctx: &CallerContext) -> i64 {
    engine
        .db()
        .invoices()
        .count(&ctx.owner_id, &Default::default())
        .await
        .expect("count invoices")
}
