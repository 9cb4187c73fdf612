//! # Customer Ledger Rules
//!
//! Signed running balance arithmetic and chronological replay.
//!
//! ```text
//!   purchase:  after = before + amount     (customer owes more)
//!   payment:   after = before − amount     (may go negative = advance)
//!
//!   replay:  sort by (transaction_date, insertion order)
//!            balance = 0
//!            for tx: tx.before = balance; balance = apply(tx); tx.after = balance
//!            amount_due = balance
//! ```

use chrono::{DateTime, Utc};

use crate::error::{CoreResult, ValidationError};
use crate::money::Money;
use crate::payment::PaymentMode;
use crate::types::{LedgerTransaction, LedgerTransactionKind};

/// Balance after applying one transaction.
///
/// Fails with `ValidationError` when the balance would leave the `i64`
/// range; callers abort the unit of work rather than store a wrapped value.
///
/// ## Example
/// ```rust
/// use khata_core::ledger::apply_balance;
/// use khata_core::money::Money;
/// use khata_core::types::LedgerTransactionKind;
///
/// let after = apply_balance(LedgerTransactionKind::Payment, Money::from_cents(20_000), Money::from_cents(25_000));
/// assert_eq!(after.unwrap().cents(), -5_000);
/// ```
#[inline]
pub fn apply_balance(kind: LedgerTransactionKind, before: Money, amount: Money) -> CoreResult<Money> {
    let after = match kind {
        LedgerTransactionKind::Purchase => before.checked_add(amount),
        LedgerTransactionKind::Payment => before.checked_sub(amount),
    };
    after.ok_or_else(|| ValidationError::overflow("amount_due").into())
}

/// Customer aggregates derived from a full replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LedgerTotals {
    pub amount_due: Money,
    pub total_purchases: Money,
    pub total_payments: Money,
    pub last_transaction_date: Option<DateTime<Utc>>,
}

impl LedgerTotals {
    /// Folds one transaction into the aggregates.
    pub fn record(
        &mut self,
        kind: LedgerTransactionKind,
        amount: Money,
        after: Money,
        at: DateTime<Utc>,
    ) -> CoreResult<()> {
        match kind {
            LedgerTransactionKind::Purchase => {
                self.total_purchases = self
                    .total_purchases
                    .checked_add(amount)
                    .ok_or_else(|| ValidationError::overflow("total_purchases"))?;
            }
            LedgerTransactionKind::Payment => {
                self.total_payments = self
                    .total_payments
                    .checked_add(amount)
                    .ok_or_else(|| ValidationError::overflow("total_payments"))?;
            }
        }
        self.amount_due = after;
        self.last_transaction_date = Some(self.last_transaction_date.map_or(at, |d| d.max(at)));
        Ok(())
    }
}

/// Replays transactions from a zero balance and rewrites their snapshots.
///
/// `transactions` must arrive in insertion order; the stable sort keeps that
/// order among transactions sharing a date.
pub fn rebase(transactions: &mut [LedgerTransaction]) -> CoreResult<LedgerTotals> {
    transactions.sort_by_key(|tx| tx.transaction_date);

    let mut totals = LedgerTotals::default();
    for tx in transactions.iter_mut() {
        let before = totals.amount_due;
        let after = apply_balance(tx.kind, before, tx.amount())?;

        tx.balance_before_cents = before.cents();
        tx.balance_after_cents = after.cents();

        totals.record(tx.kind, tx.amount(), after, tx.transaction_date)?;
    }

    Ok(totals)
}

/// Balance obtained by replaying transactions in date order, without
/// touching their snapshots.
pub fn replay_balance(transactions: &[LedgerTransaction]) -> CoreResult<Money> {
    let mut ordered: Vec<&LedgerTransaction> = transactions.iter().collect();
    ordered.sort_by_key(|tx| tx.transaction_date);

    ordered
        .into_iter()
        .try_fold(Money::zero(), |balance, tx| apply_balance(tx.kind, balance, tx.amount()))
}

/// Description for a purchase recorded from an invoice.
pub fn describe_purchase(invoice_number: Option<&str>) -> String {
    match invoice_number {
        Some(number) => format!("Purchase on invoice {}", number),
        None => "Purchase".to_string(),
    }
}

/// Description for a payment, unless the caller supplies one.
pub fn describe_payment(mode: PaymentMode, note: Option<&str>) -> String {
    match note.map(str::trim).filter(|n| !n.is_empty()) {
        Some(note) => note.to_string(),
        None => format!("Payment received ({})", mode),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
