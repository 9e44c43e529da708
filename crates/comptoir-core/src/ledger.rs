//! # Ledger Rules
//!
//! Stock and payment rules shared by sales, supply orders and parcel returns.
//!
//! ## One Pattern, Three Documents
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Every stock-affecting action follows the same four steps:              │
//! │                                                                         │
//! │   1. write the record        (vente / approvisionnement / retour)       │
//! │   2. move the stock counter  ← StockDelta::apply                        │
//! │   3. append a movement row   (mouvements_stock, stock_after)            │
//! │   4. recompute the status    ← payment_status (supply orders only)      │
//! │                                                                         │
//! │  The rules live here; comptoir-db runs steps 2-3 in the caller's        │
//! │  transaction so a failed rule rolls the whole action back.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Payment Status
//! ```text
//!   paid == 0, total > 0   → Unpaid
//!   0 < paid < total       → Partial
//!   paid >= total          → Paid    (a zero-total order is Paid)
//! ```

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{MovementKind, MovementReason, PaymentStatus};

// =============================================================================
// Payments
// =============================================================================

/// Status of an order given what has been paid so far.
pub fn payment_status(total: Money, paid: Money) -> PaymentStatus {
    if paid >= total {
        PaymentStatus::Paid
    } else if paid.is_positive() {
        PaymentStatus::Partial
    } else {
        PaymentStatus::Unpaid
    }
}

/// What is still owed, never negative.
pub fn remaining(total: Money, paid: Money) -> Money {
    (total - paid).non_negative()
}

/// Checks a new payment against an order.
///
/// ## Errors
/// - `ValidationError::MustBePositive` for a zero or negative amount
/// - `CoreError::Overpayment` when `already_paid + amount > total`
pub fn check_payment(total: Money, already_paid: Money, amount: Money) -> CoreResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        }
        .into());
    }

    let left = remaining(total, already_paid);
    if amount > left {
        return Err(CoreError::Overpayment {
            amount: amount.to_string(),
            remaining: left.to_string(),
        });
    }

    Ok(())
}

/// Checks the amount paid up front when a supply order is recorded.
pub fn check_initial_payment(total: Money, paid: Money) -> CoreResult<()> {
    if paid.is_negative() || paid > total {
        return Err(CoreError::InvalidPaidAmount {
            paid: paid.to_string(),
            total: total.to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Stock
// =============================================================================

/// Checks that `requested` units can be taken from the shelf.
pub fn check_stock(reference: &str, available: i64, requested: i64) -> CoreResult<()> {
    if requested > available {
        return Err(CoreError::InsufficientStock {
            reference: reference.to_string(),
            available,
            requested,
        });
    }

    Ok(())
}

/// A pending change to one product's stock counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockDelta {
    pub kind: MovementKind,
    /// Always positive.
    pub quantity: i64,
    pub reason: MovementReason,
}

impl StockDelta {
    /// Units entering the shelf.
    pub fn incoming(quantity: i64, reason: MovementReason) -> Self {
        StockDelta {
            kind: MovementKind::In,
            quantity,
            reason,
        }
    }

    /// Units leaving the shelf.
    pub fn outgoing(quantity: i64, reason: MovementReason) -> Self {
        StockDelta {
            kind: MovementKind::Out,
            quantity,
            reason,
        }
    }

    /// Movement that takes the counter from `current` to `target`.
    ///
    /// Returns `None` when nothing changes.
    pub fn adjustment(current: i64, target: i64, reason: MovementReason) -> Option<Self> {
        match target - current {
            0 => None,
            diff if diff > 0 => Some(StockDelta::incoming(diff, reason)),
            diff => Some(StockDelta::outgoing(-diff, reason)),
        }
    }

    /// Signed change to the counter.
    pub fn signed(&self) -> i64 {
        match self.kind {
            MovementKind::In => self.quantity,
            MovementKind::Out => -self.quantity,
        }
    }

    /// Stock after applying this delta to `current`.
    ///
    /// ## Errors
    /// `CoreError::NegativeStock` when the counter would drop below zero.
    pub fn apply(&self, reference: &str, current: i64) -> CoreResult<i64> {
        let after = current + self.signed();
        if after < 0 {
            return Err(CoreError::NegativeStock {
                reference: reference.to_string(),
                current,
                delta: self.signed(),
            });
        }
        Ok(after)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
