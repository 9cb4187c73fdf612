//! Engine invariants and the reference scenarios, end to end against an
//! in-memory database.

mod common;

use std::sync::Arc;

use common::*;
use khata_core::invoice::verify_invoice;
use khata_core::{
    ErrorKind, InvoiceStatus, LedgerTransactionKind, Money, Quantity, StockMovementKind,
    TaxSettings, UnitOfMeasure,
};
use khata_db::service::customer_ledger::PaymentRequest;
use khata_db::service::stock_ledger::StockAdjustment;
use khata_db::service::FixedTaxSettings;
use khata_db::ServiceError;

// =============================================================================
// Properties
// =============================================================================

#[tokio::test]
async fn stock_never_goes_negative() {
    let (engine, ctx) = spawn_engine().await;
    let rice = create_product(&engine, &ctx, "Rice", UnitOfMeasure::Kg, 5000, qty(3)).await;

    let err = engine
        .stock()
        .adjust_stock(
            &ctx,
            &rice.id,
            StockAdjustment {
                quantity: -qty(4),
                unit: None,
                reason: Some("spoiled".into()),
                reference: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientStock);
    assert_eq!(stock_of(&engine, &ctx, &rice).await, qty(3));

    // Exactly everything is fine
    engine
        .stock()
        .adjust_stock(
            &ctx,
            &rice.id,
            StockAdjustment {
                quantity: -qty(3),
                unit: None,
                reason: None,
                reference: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(stock_of(&engine, &ctx, &rice).await, Quantity::zero());
}

#[tokio::test]
async fn movement_log_replays_to_current_stock() {
    let (engine, ctx) = spawn_engine().await;
    let oil = create_product(&engine, &ctx, "Oil", UnitOfMeasure::Liter, 16000, qty(20)).await;

    let invoice = engine
        .invoices()
        .create(
            &ctx,
            invoice_request(
                vec![line(&oil, Quantity::from_milli(2500))],
                InvoiceStatus::Final,
                "cash",
            ),
        )
        .await
        .unwrap();
    engine
        .invoices()
        .change_status(&ctx, &invoice.id, InvoiceStatus::Draft)
        .await
        .unwrap();
    engine
        .invoices()
        .change_status(&ctx, &invoice.id, InvoiceStatus::Paid)
        .await
        .unwrap();
    engine
        .stock()
        .adjust_stock(
            &ctx,
            &oil.id,
            StockAdjustment {
                quantity: qty(5),
                unit: Some(UnitOfMeasure::Liter),
                reason: Some("restock".into()),
                reference: Some("PO-17".into()),
            },
        )
        .await
        .unwrap();

    let report = engine.stock().replay_stock(&ctx, &oil.id).await.unwrap();
    assert!(report.consistent, "{report:?}");
    assert_eq!(report.current, Quantity::from_milli(22_500));
    assert_eq!(report.replayed, report.current);
    assert_eq!(report.broken_links, 0);
}

#[tokio::test]
async fn ledger_replays_to_amount_due() {
    let (engine, ctx) = spawn_engine().await;
    let customer = create_customer(&engine, &ctx, "Meera Iyer").await;
    let sugar = create_product(&engine, &ctx, "Sugar", UnitOfMeasure::Kg, 4500, qty(100)).await;

    let mut request = invoice_request(vec![line(&sugar, qty(10))], InvoiceStatus::Final, "due");
    request.customer_id = Some(customer.id.clone());
    request.amount_paid_cents = Some(5000);
    let invoice = engine.invoices().create(&ctx, request).await.unwrap();

    engine
        .customers()
        .record_payment(
            &ctx,
            &customer.id,
            PaymentRequest {
                amount_cents: 15000,
                payment_mode: khata_core::PaymentMode::Online,
                note: None,
            },
        )
        .await
        .unwrap();

    // Editing the quantity changes the charge and forces a reconcile
    let patch = serde_json::from_value(serde_json::json!({
        "items": [{"product_id": sugar.id, "quantity": 4}]
    }))
    .unwrap();
    engine.invoices().update(&ctx, &invoice.id, patch).await.unwrap();

    let report = engine
        .customers()
        .verify_balance(&ctx, &customer.id)
        .await
        .unwrap();
    assert!(report.consistent, "{report:?}");
    // 4 × 45.00 − 50.00 paid = 130.00 charged against 150.00 paid
    assert_eq!(report.amount_due_cents, -2000);
    assert_eq!(report.replayed_cents, -2000);
}

#[tokio::test]
async fn invoice_arithmetic_holds_with_tax() {
    let (engine, ctx) = spawn_engine().await;
    let engine = engine.with_tax_provider(Arc::new(FixedTaxSettings(TaxSettings {
        enabled: true,
        rate_bps: 1800,
    })));

    let a = create_product(&engine, &ctx, "Turmeric", UnitOfMeasure::Kg, 33_333, qty(10)).await;
    let b = create_product(&engine, &ctx, "Soap", UnitOfMeasure::Piece, 3_499, qty(10)).await;
    let c = create_product(&engine, &ctx, "Milk", UnitOfMeasure::Liter, 5_450, qty(10)).await;

    let invoice = engine
        .invoices()
        .create(
            &ctx,
            invoice_request(
                vec![
                    line(&a, Quantity::from_milli(333)),
                    line(&b, qty(3)),
                    line(&c, Quantity::from_milli(1_750)),
                ],
                InvoiceStatus::Draft,
                "cash",
            ),
        )
        .await
        .unwrap();

    verify_invoice(&invoice).unwrap();
    assert!(invoice.tax_cents > 0);
    assert_eq!(
        invoice.subtotal_cents + invoice.tax_cents,
        invoice.total_cents
    );
}

#[tokio::test]
async fn failed_creation_leaves_nothing_behind() {
    let (engine, ctx) = spawn_engine().await;
    let customer = create_customer(&engine, &ctx, "Rohan Patel").await;
    let a = create_product(&engine, &ctx, "Atta", UnitOfMeasure::Kg, 3800, qty(10)).await;
    let b = create_product(&engine, &ctx, "Dal", UnitOfMeasure::Kg, 14000, qty(10)).await;
    let c = create_product(&engine, &ctx, "Tea", UnitOfMeasure::Piece, 14500, qty(1)).await;

    let mut request = invoice_request(
        vec![line(&a, qty(2)), line(&b, qty(3)), line(&c, qty(2))],
        InvoiceStatus::Final,
        "due",
    );
    request.customer_id = Some(customer.id.clone());

    let err = engine.invoices().create(&ctx, request).await.unwrap_err();
    match &err {
        ServiceError::Core(khata_core::CoreError::InsufficientStock {
            product,
            available,
            requested,
        }) => {
            assert_eq!(product, "Tea");
            assert_eq!(*available, qty(1));
            assert_eq!(*requested, qty(2));
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }

    assert_eq!(stock_of(&engine, &ctx, &a).await, qty(10));
    assert_eq!(stock_of(&engine, &ctx, &b).await, qty(10));
    assert_eq!(stock_of(&engine, &ctx, &c).await, qty(1));
    assert_eq!(invoice_count(&engine, &ctx).await, 0);
    assert_eq!(amount_due(&engine, &ctx, &customer).await, 0);
    assert!(engine
        .customers()
        .transactions(&ctx, &customer.id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn draft_final_draft_restores_stock() {
    let (engine, ctx) = spawn_engine().await;
    let eggs = create_product(&engine, &ctx, "Eggs", UnitOfMeasure::Dozen, 8400, qty(12)).await;

    let invoice = engine
        .invoices()
        .create(
            &ctx,
            invoice_request(vec![line(&eggs, qty(5))], InvoiceStatus::Draft, "cash"),
        )
        .await
        .unwrap();
    assert_eq!(stock_of(&engine, &ctx, &eggs).await, qty(12));

    engine
        .invoices()
        .change_status(&ctx, &invoice.id, InvoiceStatus::Final)
        .await
        .unwrap();
    assert_eq!(stock_of(&engine, &ctx, &eggs).await, qty(7));

    engine
        .invoices()
        .change_status(&ctx, &invoice.id, InvoiceStatus::Draft)
        .await
        .unwrap();
    assert_eq!(stock_of(&engine, &ctx, &eggs).await, qty(12));

    let kinds: Vec<_> = engine
        .stock()
        .movements(&ctx, &eggs.id)
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            StockMovementKind::Initial,
            StockMovementKind::Sale,
            StockMovementKind::Return
        ]
    );
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn scenario_mixed_units_final_cash_invoice() {
    let (engine, ctx) = spawn_engine().await;
    let x = create_product(&engine, &ctx, "Notebook", UnitOfMeasure::Piece, 1000, qty(10)).await;
    let y = create_product(&engine, &ctx, "Rice", UnitOfMeasure::Kg, 5000, qty(5)).await;

    let invoice = engine
        .invoices()
        .create(
            &ctx,
            invoice_request(
                vec![line(&x, qty(3)), line(&y, qty(1))],
                InvoiceStatus::Final,
                "cash",
            ),
        )
        .await
        .unwrap();

    assert_eq!(invoice.subtotal_cents, 8000);
    assert_eq!(invoice.tax_cents, 0);
    assert_eq!(invoice.total_cents, 8000);
    assert_eq!(invoice.due_amount_cents, 0);
    assert_eq!(invoice.invoice_number, "INV-000001");
    assert_eq!(stock_of(&engine, &ctx, &x).await, qty(7));
    assert_eq!(stock_of(&engine, &ctx, &y).await, qty(4));

    for product in [&x, &y] {
        let sales: Vec<_> = engine
            .stock()
            .movements(&ctx, &product.id)
            .await
            .unwrap()
            .into_iter()
            .filter(|m| m.kind == StockMovementKind::Sale)
            .collect();
        assert_eq!(sales.len(), 1);
        assert_eq!(sales[0].invoice_id.as_deref(), Some(invoice.id.as_str()));
    }

    let sale = engine
        .db()
        .movements()
        .list_for_invoice(&ctx.owner_id, &invoice.id)
        .await
        .unwrap();
    assert_eq!(sale[0].description, "Sold 3 piece");
}

#[tokio::test]
async fn scenario_overpayment_becomes_advance() {
    let (engine, ctx) = spawn_engine().await;
    let customer = create_customer(&engine, &ctx, "Vikram Reddy").await;

    engine
        .customers()
        .record_purchase(&ctx, &customer.id, Money::from_cents(20_000), None)
        .await
        .unwrap();

    let tx = engine
        .customers()
        .record_payment(
            &ctx,
            &customer.id,
            PaymentRequest {
                amount_cents: 25_000,
                payment_mode: Default::default(),
                note: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(tx.kind, LedgerTransactionKind::Payment);
    assert_eq!(tx.balance_before_cents, 20_000);
    assert_eq!(tx.balance_after_cents, -5_000);

    let customer = engine
        .customers()
        .get_customer(&ctx, &customer.id)
        .await
        .unwrap();
    assert_eq!(customer.amount_due_cents, -5_000);
    assert!(customer.has_advance());
    assert_eq!(customer.total_payments_cents, 25_000);
}

#[tokio::test]
async fn scenario_due_invoice_charges_customer() {
    let (engine, ctx) = spawn_engine().await;
    let customer = create_customer(&engine, &ctx, "Kavya Gupta").await;
    let cooker = create_product(&engine, &ctx, "Cooker", UnitOfMeasure::Piece, 50_000, qty(2)).await;

    let mut request = invoice_request(vec![line(&cooker, qty(1))], InvoiceStatus::Final, "due");
    request.customer_id = Some(customer.id.clone());
    let invoice = engine.invoices().create(&ctx, request).await.unwrap();

    assert_eq!(invoice.due_amount_cents, 50_000);
    assert_eq!(amount_due(&engine, &ctx, &customer).await, 50_000);

    let txs = engine
        .customers()
        .transactions(&ctx, &customer.id)
        .await
        .unwrap();
    assert_eq!(txs.len(), 1);
    assert_eq!(txs[0].kind, LedgerTransactionKind::Purchase);
    assert_eq!(txs[0].amount_cents, 50_000);
    assert_eq!(txs[0].balance_before_cents, 0);
    assert_eq!(txs[0].balance_after_cents, 50_000);
    assert_eq!(txs[0].invoice_number.as_deref(), Some("INV-000001"));
}

#[tokio::test]
async fn scenario_insufficient_stock_rejects_invoice() {
    let (engine, ctx) = spawn_engine().await;
    let p = create_product(&engine, &ctx, "Lamp", UnitOfMeasure::Piece, 2500, qty(2)).await;

    let err = engine
        .invoices()
        .create(
            &ctx,
            invoice_request(vec![line(&p, qty(5))], InvoiceStatus::Final, "cash"),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InsufficientStock);
    assert_eq!(stock_of(&engine, &ctx, &p).await, qty(2));
    assert_eq!(invoice_count(&engine, &ctx).await, 0);

    // The rolled-back number is not burnt
    let ok = engine
        .invoices()
        .create(
            &ctx,
            invoice_request(vec![line(&p, qty(2))], InvoiceStatus::Final, "cash"),
        )
        .await
        .unwrap();
    assert_eq!(ok.invoice_number, "INV-000001");
}

#[tokio::test]
async fn scenario_delete_final_invoice_returns_stock() {
    let (engine, ctx) = spawn_engine().await;
    let a = create_product(&engine, &ctx, "Biscuits", UnitOfMeasure::Piece, 1000, qty(20)).await;
    let b = create_product(&engine, &ctx, "Dal", UnitOfMeasure::Kg, 14000, qty(8)).await;

    let invoice = engine
        .invoices()
        .create(
            &ctx,
            invoice_request(
                vec![line(&a, qty(6)), line(&b, Quantity::from_milli(1500))],
                InvoiceStatus::Final,
                "card",
            ),
        )
        .await
        .unwrap();
    assert_eq!(stock_of(&engine, &ctx, &a).await, qty(14));

    engine.invoices().delete(&ctx, &invoice.id).await.unwrap();

    assert_eq!(stock_of(&engine, &ctx, &a).await, qty(20));
    assert_eq!(stock_of(&engine, &ctx, &b).await, qty(8));

    for product in [&a, &b] {
        let returns = engine
            .stock()
            .movements(&ctx, &product.id)
            .await
            .unwrap()
            .into_iter()
            .filter(|m| m.kind == StockMovementKind::Return)
            .count();
        assert_eq!(returns, 1);
    }

    let err = engine.invoices().get(&ctx, &invoice.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}
