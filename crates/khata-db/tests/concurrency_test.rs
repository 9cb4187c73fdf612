//! Concurrent operations against a file database with a multi-connection
//! pool.

mod common;

use std::time::Duration;

use common::*;
use khata_core::{ErrorKind, InvoiceStatus, Money, Quantity, UnitOfMeasure};
use khata_db::service::customer_ledger::PaymentRequest;
use khata_db::{CallerContext, Database, DbConfig, Engine, EngineConfig};

async fn file_engine(dir: &tempfile::TempDir, config: EngineConfig) -> (Engine, CallerContext) {
    init_tracing();

    let db = Database::new(DbConfig::new(dir.path().join("khata.db")).max_connections(4))
        .await
        .expect("Failed to open file database");
    let ctx = CallerContext::new("shop-concurrent", Some("cashier-1")).expect("valid caller");
    (Engine::new(db, config), ctx)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn competing_invoices_never_oversell() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, ctx) = file_engine(&dir, EngineConfig::default()).await;
    let lamp = create_product(&engine, &ctx, "Lamp", UnitOfMeasure::Piece, 70_000, qty(5)).await;

    let mut handles = Vec::new();
    for _ in 0..4 {
        let engine = engine.clone();
        let ctx = ctx.clone();
        let request = invoice_request(vec![line(&lamp, qty(2))], InvoiceStatus::Final, "cash");
        handles.push(tokio::spawn(async move {
            engine.invoices().create(&ctx, request).await
        }));
    }

    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(e) => assert_eq!(e.kind(), ErrorKind::InsufficientStock),
        }
    }

    assert_eq!(created, 2);
    assert_eq!(stock_of(&engine, &ctx, &lamp).await, qty(1));
    assert_eq!(invoice_count(&engine, &ctx).await, 2);

    let replay = engine.stock().replay_stock(&ctx, &lamp.id).await.unwrap();
    assert!(replay.consistent);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_payments_all_land() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, ctx) = file_engine(&dir, EngineConfig::default()).await;
    let customer = create_customer(&engine, &ctx, "Anil Sharma").await;

    engine
        .customers()
        .record_purchase(&ctx, &customer.id, Money::from_cents(50_000), None)
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..10 {
        let engine = engine.clone();
        let ctx = ctx.clone();
        let id = customer.id.clone();
        handles.push(tokio::spawn(async move {
            engine
                .customers()
                .record_payment(
                    &ctx,
                    &id,
                    PaymentRequest {
                        amount_cents: 1_000,
                        payment_mode: Default::default(),
                        note: None,
                    },
                )
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(amount_due(&engine, &ctx, &customer).await, 40_000);
    let report = engine
        .customers()
        .verify_balance(&ctx, &customer.id)
        .await
        .unwrap();
    assert!(report.consistent);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn operation_waiting_past_deadline_is_aborted() {
    let dir = tempfile::tempdir().unwrap();
    let config = EngineConfig::default().operation_timeout(Duration::from_millis(100));
    let (engine, ctx) = file_engine(&dir, config).await;
    let lamp = create_product(&engine, &ctx, "Lamp", UnitOfMeasure::Piece, 70_000, qty(3)).await;

    // Another writer holds the gate for longer than the deadline
    let held = engine.db().begin().await.unwrap();

    let err = engine
        .invoices()
        .create(
            &ctx,
            invoice_request(vec![line(&lamp, qty(1))], InvoiceStatus::Final, "cash"),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OperationAborted);

    drop(held);

    // Nothing leaked from the aborted attempt; a retry goes through
    assert_eq!(stock_of(&engine, &ctx, &lamp).await, qty(3));
    let invoice = engine
        .invoices()
        .create(
            &ctx,
            invoice_request(vec![line(&lamp, qty(1))], InvoiceStatus::Final, "cash"),
        )
        .await
        .unwrap();
    assert_eq!(invoice.invoice_number, "INV-000001");
    assert_eq!(stock_of(&engine, &ctx, &lamp).await, Quantity::from_whole(2));
}
