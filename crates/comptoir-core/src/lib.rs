//! # comptoir-core: Pure Business Rules for Comptoir
//!
//! This crate holds every rule of the retail back-office that can be
//! expressed without touching a database or the network.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Comptoir Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Browser client (forms, tables)                  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ JSON over HTTP                         │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    apps/server (axum)                           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ comptoir-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐  │   │
//! │  │   │  types  │ │  money  │ │ ledger  │ │ invoice │ │ access  │  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └─────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            comptoir-db (SQLite) / comptoir-parcel (SOAP)        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain entities (Product, Sale, SupplyOrder, ...)
//! - [`money`] - Integer-cents money type
//! - [`ledger`] - Stock and payment rules shared by sales, supplies and returns
//! - [`invoice`] - Invoice document computation
//! - [`access`] - Roles and the areas they may reach
//! - [`parcel`] - Parcel tracking types and search classification
//! - [`validation`] - Field validators
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use comptoir_core::ledger::payment_status;
//! use comptoir_core::{Money, PaymentStatus};
//!
//! let total = Money::from_cents(12_000);
//! let status = payment_status(total, Money::from_cents(5_000));
//! assert_eq!(status, PaymentStatus::Partial);
//! ```

pub mod access;
pub mod error;
pub mod invoice;
pub mod ledger;
pub mod money;
pub mod parcel;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use access::{Area, Role};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity of a single product on one line (sale, supply, return).
///
/// Catches typing mistakes such as 10000 instead of 10.
pub const MAX_LINE_QUANTITY: i64 = 9_999;

/// Maximum unit price in cents (1 000 000,00 €).
///
/// Keeps line totals and document totals far from `i64` overflow.
pub const MAX_PRICE_CENTS: i64 = 100_000_000;

/// Maximum number of lines on a single sale or supply order.
pub const MAX_LINES: usize = 200;

/// Default French VAT rate (20%) in basis points.
pub const DEFAULT_VAT_BPS: u32 = 2_000;
