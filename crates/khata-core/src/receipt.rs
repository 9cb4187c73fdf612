//! # Receipt Artifact
//!
//! Read-only rendering of an invoice for printing or sharing.
//!
//! ```text
//! Invoice ──► Receipt::from_invoice(store) ──► ReceiptRenderer::render ──► String
//!              (frozen, camelCase JSON)          TextReceiptRenderer
//! ```
//!
//! PDF/CSV export lives outside this crate; those renderers implement
//! [`ReceiptRenderer`] the same way the text renderer does.

use serde::{Deserialize, Serialize};
use std::fmt::Write;
use ts_rs::TS;

use crate::money::Money;
use crate::types::Invoice;

/// Receipt document derived from an invoice.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub invoice_id: String,
    pub invoice_number: String,
    pub store_name: String,
    pub timestamp: String,
    pub customer_name: Option<String>,
    pub items: Vec<ReceiptItem>,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub payment_method: String,
    pub amount_paid_cents: i64,
    pub due_amount_cents: i64,
    pub status: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptItem {
    pub name: String,
    /// Quantity with its unit, e.g. "1.5 kg".
    pub quantity: String,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

impl Receipt {
    pub fn from_invoice(invoice: &Invoice, store_name: &str) -> Self {
        Receipt {
            invoice_id: invoice.id.clone(),
            invoice_number: invoice.invoice_number.clone(),
            store_name: store_name.to_string(),
            timestamp: invoice.invoice_date.to_rfc3339(),
            customer_name: invoice.customer.as_ref().map(|c| c.name.clone()),
            items: invoice
                .items
                .iter()
                .map(|i| ReceiptItem {
                    name: i.product_name.clone(),
                    quantity: format!("{} {}", i.quantity, i.unit),
                    unit_price_cents: i.unit_price_cents,
                    line_total_cents: i.subtotal_cents,
                })
                .collect(),
            subtotal_cents: invoice.subtotal_cents,
            tax_cents: invoice.tax_cents,
            total_cents: invoice.total_cents,
            payment_method: invoice.payment_method.to_string(),
            amount_paid_cents: invoice.amount_paid_cents,
            due_amount_cents: invoice.due_amount_cents,
            status: invoice.status.to_string(),
            notes: invoice.notes.clone(),
        }
    }
}

/// Turns a receipt into a printable document.
pub trait ReceiptRenderer: Send + Sync {
    /// MIME type of the rendered output.
    fn content_type(&self) -> &'static str;

    fn render(&self, receipt: &Receipt) -> String;
}

/// Fixed-width plain text, sized for 80mm thermal printers by default.
#[derive(Debug, Clone, Copy)]
pub struct TextReceiptRenderer {
    pub width: usize,
}

impl Default for TextReceiptRenderer {
    fn default() -> Self {
        TextReceiptRenderer { width: 42 }
    }
}

impl TextReceiptRenderer {
    fn row(&self, out: &mut String, left: &str, right: &str) {
        let pad = self
            .width
            .saturating_sub(left.chars().count() + right.chars().count())
            .max(1);
        let _ = writeln!(out, "{}{}{}", left, " ".repeat(pad), right);
    }

    fn centered(&self, out: &mut String, text: &str) {
        let pad = self.width.saturating_sub(text.chars().count()) / 2;
        let _ = writeln!(out, "{}{}", " ".repeat(pad), text);
    }
}

impl ReceiptRenderer for TextReceiptRenderer {
    fn content_type(&self) -> &'static str {
        "text/plain; charset=utf-8"
    }

    fn render(&self, receipt: &Receipt) -> String {
        let rule = "-".repeat(self.width);
        let mut out = String::new();

        self.centered(&mut out, &receipt.store_name);
        self.row(&mut out, &receipt.invoice_number, &receipt.status.to_uppercase());
        let _ = writeln!(out, "{}", receipt.timestamp);
        if let Some(customer) = &receipt.customer_name {
            let _ = writeln!(out, "Customer: {}", customer);
        }
        let _ = writeln!(out, "{}", rule);

        for item in &receipt.items {
            let _ = writeln!(out, "{}", item.name);
            self.row(
                &mut out,
                &format!("  {} x {}", item.quantity, Money::from_cents(item.unit_price_cents)),
                &Money::from_cents(item.line_total_cents).to_string(),
            );
        }

        let _ = writeln!(out, "{}", rule);
        self.row(&mut out, "Subtotal", &Money::from_cents(receipt.subtotal_cents).to_string());
        if receipt.tax_cents != 0 {
            self.row(&mut out, "Tax", &Money::from_cents(receipt.tax_cents).to_string());
        }
        self.row(&mut out, "TOTAL", &Money::from_cents(receipt.total_cents).to_string());
        self.row(&mut out, "Paid by", &receipt.payment_method);
        if receipt.due_amount_cents > 0 {
            self.row(&mut out, "Paid now", &Money::from_cents(receipt.amount_paid_cents).to_string());
            self.row(&mut out, "Balance due", &Money::from_cents(receipt.due_amount_cents).to_string());
        }
        if let Some(notes) = &receipt.notes {
            let _ = writeln!(out, "{}", rule);
            let _ = writeln!(out, "{}", notes);
        }

        out
    }
}
