//! # Invoice
//!
//! Turns a recorded sale into the invoice document handed to the customer.
//!
//! ## Amounts
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Shelf prices are VAT included (TTC), so VAT is extracted, not added:   │
//! │                                                                         │
//! │    subtotal  = Σ line totals                                            │
//! │    total TTC = subtotal - discount                                      │
//! │    VAT       = total TTC - total TTC / (1 + rate)   (integer rounding)  │
//! │    total HT  = total TTC - VAT                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Invoice numbers are `FAC-YYYYMM-NNNNN`, the sequence restarting each month.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{Client, PaymentMethod, Sale, SaleItem, TaxRate};

/// Prefix of every invoice number.
pub const INVOICE_PREFIX: &str = "FAC";

/// Seller details printed on invoices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ShopInfo {
    pub name: String,
    pub address: Option<String>,
    pub siret: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceBuyer {
    pub name: String,
    pub email: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceLine {
    pub reference: String,
    pub name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

/// A complete invoice, ready to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Invoice {
    pub number: String,
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
    pub seller: ShopInfo,
    pub buyer: Option<InvoiceBuyer>,
    pub lines: Vec<InvoiceLine>,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub total_ttc_cents: i64,
    pub vat_rate_bps: u32,
    pub vat_cents: i64,
    pub total_ht_cents: i64,
    pub payment_method: PaymentMethod,
    pub tendered_cents: Option<i64>,
    pub change_cents: i64,
}

impl Invoice {
    /// Builds the invoice for `sale`.
    ///
    /// Totals are recomputed from the frozen line snapshots; the sale's own
    /// discount is carried over.
    pub fn from_sale(
        sale: &Sale,
        items: &[SaleItem],
        client: Option<&Client>,
        shop: &ShopInfo,
        rate: TaxRate,
    ) -> Self {
        let lines: Vec<InvoiceLine> = items
            .iter()
            .map(|item| InvoiceLine {
                reference: item.reference_snapshot.clone(),
                name: item.name_snapshot.clone(),
                quantity: item.quantity,
                unit_price_cents: item.unit_price_cents,
                line_total_cents: item.line_total_cents,
            })
            .collect();

        let subtotal: Money = items
            .iter()
            .map(|item| Money::from_cents(item.line_total_cents))
            .sum();
        let discount = Money::from_cents(sale.discount_cents);
        let total = (subtotal - discount).non_negative();
        let vat = total.included_tax(rate);

        Invoice {
            number: sale.invoice_number.clone(),
            date: sale.sold_at,
            seller: shop.clone(),
            buyer: client.map(|c| InvoiceBuyer {
                name: c.display_name(),
                email: c.email.clone(),
                address: c.address.clone(),
            }),
            lines,
            subtotal_cents: subtotal.cents(),
            discount_cents: discount.cents(),
            total_ttc_cents: total.cents(),
            vat_rate_bps: rate.bps(),
            vat_cents: vat.cents(),
            total_ht_cents: (total - vat).cents(),
            payment_method: sale.payment_method,
            tendered_cents: sale.tendered_cents,
            change_cents: sale.change_cents,
        }
    }
}

/// Formats an invoice number: `invoice_number(42, 2024-03-..)` → `FAC-202403-00042`.
pub fn invoice_number(sequence: u32, date: DateTime<Utc>) -> String {
    format!("{}-{:05}", invoice_prefix_for(date), sequence)
}

/// The `FAC-YYYYMM` part shared by all invoices of a month.
pub fn invoice_prefix_for(date: DateTime<Utc>) -> String {
    format!("{}-{:04}{:02}", INVOICE_PREFIX, date.year(), date.month())
}

/// Sequence part of an invoice number, if it is well formed.
pub fn parse_sequence(number: &str) -> Option<u32> {
    let mut parts = number.splitn(3, '-');
    let prefix = parts.next()?;
    let period = parts.next()?;
    let sequence = parts.next()?;

    if prefix != INVOICE_PREFIX || period.len() != 6 || !period.chars().all(|c| c.is_ascii_digit())
    {
        return None;
    }

    sequence.parse().ok()
}
