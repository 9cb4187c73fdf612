//! Customer balance ledger: payments, purchases, reconciliation and replay.

mod common;

use common::*;
use khata_core::{ErrorKind, LedgerTransactionKind, Money, PaymentMode};
use khata_db::service::customer_ledger::{
    InvoiceRef, NewCustomer, PaymentRequest, Replacement,
};
use khata_db::CallerContext;

fn payment(amount_cents: i64) -> PaymentRequest {
    PaymentRequest {
        amount_cents,
        payment_mode: PaymentMode::Cash,
        note: None,
    }
}

#[tokio::test]
async fn payments_and_purchases_keep_snapshots() {
    let (engine, ctx) = spawn_engine().await;
    let customer = create_customer(&engine, &ctx, "Vikram Reddy").await;
    let ledger = engine.customers();

    ledger
        .record_purchase(&ctx, &customer.id, Money::from_cents(12_000), None)
        .await
        .unwrap();
    let tx = ledger
        .record_payment(
            &ctx,
            &customer.id,
            PaymentRequest {
                amount_cents: 5_000,
                payment_mode: PaymentMode::Online,
                note: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(tx.kind, LedgerTransactionKind::Payment);
    assert_eq!(tx.balance_before_cents, 12_000);
    assert_eq!(tx.balance_after_cents, 7_000);
    assert_eq!(tx.payment_mode, Some(PaymentMode::Online));
    assert_eq!(tx.description, "Payment received (online)");

    let stored = ledger.get_customer(&ctx, &customer.id).await.unwrap();
    assert_eq!(stored.amount_due_cents, 7_000);
    assert_eq!(stored.total_purchases_cents, 12_000);
    assert_eq!(stored.total_payments_cents, 5_000);
    assert!(stored.last_transaction_date.is_some());
}

#[tokio::test]
async fn payment_beyond_balance_is_an_advance() {
    let (engine, ctx) = spawn_engine().await;
    let customer = create_customer(&engine, &ctx, "Meera Patel").await;

    let tx = engine
        .customers()
        .record_payment(&ctx, &customer.id, payment(2_500))
        .await
        .unwrap();

    assert_eq!(tx.balance_after_cents, -2_500);
    assert_eq!(amount_due(&engine, &ctx, &customer).await, -2_500);
}

#[tokio::test]
async fn non_positive_payments_are_rejected() {
    let (engine, ctx) = spawn_engine().await;
    let customer = create_customer(&engine, &ctx, "Rohan Gupta").await;

    for amount in [0, -100] {
        let err = engine
            .customers()
            .record_payment(&ctx, &customer.id, payment(amount))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
    }

    let err = engine
        .customers()
        .record_purchase(&ctx, &customer.id, Money::zero(), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationError);

    assert!(engine
        .customers()
        .transactions(&ctx, &customer.id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn oversized_amounts_are_rejected_before_posting() {
    let (engine, ctx) = spawn_engine().await;
    let customer = create_customer(&engine, &ctx, "Nikhil Bose").await;
    let ledger = engine.customers();

    ledger
        .record_purchase(&ctx, &customer.id, Money::from_cents(5_000), None)
        .await
        .unwrap();

    let err = ledger
        .record_payment(&ctx, &customer.id, payment(i64::MAX))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationError);

    let err = ledger
        .record_purchase(&ctx, &customer.id, Money::from_cents(i64::MAX), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationError);

    assert_eq!(amount_due(&engine, &ctx, &customer).await, 5_000);
    assert_eq!(ledger.transactions(&ctx, &customer.id).await.unwrap().len(), 1);

    let report = ledger.verify_balance(&ctx, &customer.id).await.unwrap();
    assert!(report.consistent);
    assert_eq!(report.replayed_cents, 5_000);
}

#[tokio::test]
async fn verify_balance_reports_a_clean_ledger() {
    let (engine, ctx) = spawn_engine().await;
    let customer = create_customer(&engine, &ctx, "Sana Qureshi").await;
    let ledger = engine.customers();

    let empty = ledger.verify_balance(&ctx, &customer.id).await.unwrap();
    assert!(empty.consistent);
    assert_eq!(empty.customer_id, customer.id);
    assert_eq!(empty.replayed_cents, 0);

    ledger
        .record_payment(&ctx, &customer.id, payment(1_500))
        .await
        .unwrap();
    ledger
        .record_purchase(&ctx, &customer.id, Money::from_cents(4_000), None)
        .await
        .unwrap();

    let report = ledger.verify_balance(&ctx, &customer.id).await.unwrap();
    assert!(report.consistent);
    assert_eq!(report.snapshot_breaks, 0);
    assert_eq!(report.replayed_cents, 2_500);
    assert_eq!(report.amount_due_cents, 2_500);
}

#[tokio::test]
async fn reconcile_replays_remaining_transactions() {
    let (engine, ctx) = spawn_engine().await;
    let customer = create_customer(&engine, &ctx, "Aarav Iyer").await;
    let ledger = engine.customers();

    let first = InvoiceRef {
        invoice_id: "inv-a",
        invoice_number: "INV-000001",
    };
    let second = InvoiceRef {
        invoice_id: "inv-b",
        invoice_number: "INV-000002",
    };

    ledger
        .record_purchase(&ctx, &customer.id, Money::from_cents(10_000), Some(first))
        .await
        .unwrap();
    ledger
        .record_purchase(&ctx, &customer.id, Money::from_cents(4_000), Some(second))
        .await
        .unwrap();
    ledger
        .record_payment(&ctx, &customer.id, payment(3_000))
        .await
        .unwrap();

    let outcome = ledger
        .reconcile_invoice(&ctx, &customer.id, "inv-a", None)
        .await
        .unwrap();
    assert_eq!(outcome.removed, 1);
    assert_eq!(outcome.amount_due, Money::from_cents(1_000));
    assert!(outcome.replacement.is_none());

    let txs = ledger.transactions(&ctx, &customer.id).await.unwrap();
    let snapshots: Vec<_> = txs
        .iter()
        .map(|tx| (tx.balance_before_cents, tx.balance_after_cents))
        .collect();
    assert_eq!(snapshots, vec![(0, 4_000), (4_000, 1_000)]);

    let stored = ledger.get_customer(&ctx, &customer.id).await.unwrap();
    assert_eq!(stored.amount_due_cents, 1_000);
    assert_eq!(stored.total_purchases_cents, 4_000);
    assert_eq!(stored.total_payments_cents, 3_000);

    let report = ledger.verify_balance(&ctx, &customer.id).await.unwrap();
    assert!(report.consistent);
    assert_eq!(report.snapshot_breaks, 0);
    assert_eq!(report.replayed_cents, 1_000);
    assert_eq!(report.amount_due_cents, 1_000);
}

#[tokio::test]
async fn reconcile_with_replacement_appends_new_charge() {
    let (engine, ctx) = spawn_engine().await;
    let customer = create_customer(&engine, &ctx, "Kavya Reddy").await;
    let ledger = engine.customers();

    let invoice = InvoiceRef {
        invoice_id: "inv-a",
        invoice_number: "INV-000007",
    };
    ledger
        .record_purchase(&ctx, &customer.id, Money::from_cents(9_000), Some(invoice))
        .await
        .unwrap();

    let outcome = ledger
        .reconcile_invoice(
            &ctx,
            &customer.id,
            "inv-a",
            Some(Replacement {
                amount: Money::from_cents(6_500),
                invoice_number: "INV-000007".to_string(),
            }),
        )
        .await
        .unwrap();

    let replacement = outcome.replacement.expect("replacement recorded");
    assert_eq!(replacement.invoice_id.as_deref(), Some("inv-a"));
    assert_eq!(replacement.description, "Purchase on invoice INV-000007");
    assert_eq!(outcome.amount_due, Money::from_cents(6_500));
    assert_eq!(amount_due(&engine, &ctx, &customer).await, 6_500);
}

#[tokio::test]
async fn reconcile_unknown_invoice_is_a_replay() {
    let (engine, ctx) = spawn_engine().await;
    let customer = create_customer(&engine, &ctx, "Divya Sharma").await;

    engine
        .customers()
        .record_purchase(&ctx, &customer.id, Money::from_cents(2_000), None)
        .await
        .unwrap();

    let outcome = engine
        .customers()
        .reconcile_invoice(&ctx, &customer.id, "never-issued", None)
        .await
        .unwrap();
    assert_eq!(outcome.removed, 0);
    assert_eq!(outcome.amount_due, Money::from_cents(2_000));
}

#[tokio::test]
async fn create_customer_validates_contact_details() {
    let (engine, ctx) = spawn_engine().await;

    let err = engine
        .customers()
        .create_customer(
            &ctx,
            NewCustomer {
                name: "Sanjay".into(),
                phone: Some("call me".into()),
                email: None,
                address: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationError);

    let err = engine
        .customers()
        .create_customer(
            &ctx,
            NewCustomer {
                name: "   ".into(),
                phone: None,
                email: None,
                address: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationError);

    let ok = engine
        .customers()
        .create_customer(
            &ctx,
            NewCustomer {
                name: "Sanjay Iyer".into(),
                phone: Some("+91 98450-12345".into()),
                email: Some("sanjay@example.in".into()),
                address: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(ok.amount_due_cents, 0);
}

#[tokio::test]
async fn list_customers_searches_within_owner() {
    let (engine, ctx) = spawn_engine().await;
    let other = CallerContext::new("neighbour-shop", None).unwrap();

    create_customer(&engine, &ctx, "Priya Sharma").await;
    create_customer(&engine, &ctx, "Arjun Sharma").await;
    create_customer(&engine, &ctx, "Ananya Gupta").await;
    create_customer(&engine, &other, "Rahul Sharma").await;

    let all = engine.customers().list_customers(&ctx, "", 50, 0).await.unwrap();
    assert_eq!(all.len(), 3);

    let names: Vec<_> = engine
        .customers()
        .list_customers(&ctx, "sharma", 50, 0)
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["Arjun Sharma", "Priya Sharma"]);
}

#[tokio::test]
async fn other_owners_customers_are_not_found() {
    let (engine, ctx) = spawn_engine().await;
    let intruder = CallerContext::new("intruder", None).unwrap();
    let customer = create_customer(&engine, &ctx, "Vikram Patel").await;

    let err = engine
        .customers()
        .record_payment(&intruder, &customer.id, payment(1_000))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = engine
        .customers()
        .transactions(&intruder, &customer.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    assert_eq!(amount_due(&engine, &ctx, &customer).await, 0);
}
