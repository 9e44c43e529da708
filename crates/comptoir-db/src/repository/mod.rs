//! # Repository Module
//!
//! Database repository implementations for Comptoir.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  HTTP handler                                                          │
//! │       │                                                                 │
//! │       │  db.supplies().add_payment(id, &payment)                       │
//! │       ▼                                                                 │
//! │  SupplyRepository                                                      │
//! │  ├── validates input        (comptoir_core::validation)                │
//! │  ├── BEGIN                                                             │
//! │  ├── checks rules           (comptoir_core::ledger)                    │
//! │  ├── writes rows / moves stock (crate::ledger::apply_movement)         │
//! │  └── COMMIT                 (drop without commit = ROLLBACK)           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`CategoryRepository`] - Categories
//! - [`ProductRepository`] - Products, low stock, movement history
//! - [`ClientRepository`] - Clients and their purchases
//! - [`SupplierRepository`] - Suppliers
//! - [`SupplyRepository`] - Supply orders, supplier payments, reception
//! - [`SaleRepository`] - Point-of-sale tickets
//! - [`ReturnRepository`] - Colissimo parcel returns
//! - [`WithdrawalRepository`] - Cash withdrawals
//! - [`UserRepository`] - Back-office accounts
//! - [`AuditRepository`] - Action history
//! - [`CredentialRepository`] - Colissimo accounts
//! - [`ReportRepository`] - Monthly revenue and dashboard
//!
//! [`CategoryRepository`]: category::CategoryRepository
//! [`ProductRepository`]: product::ProductRepository
//! [`ClientRepository`]: client::ClientRepository
//! [`SupplierRepository`]: supplier::SupplierRepository
//! [`SupplyRepository`]: supply::SupplyRepository
//! [`SaleRepository`]: sale::SaleRepository
//! [`ReturnRepository`]: returns::ReturnRepository
//! [`WithdrawalRepository`]: withdrawal::WithdrawalRepository
//! [`UserRepository`]: user::UserRepository
//! [`AuditRepository`]: audit::AuditRepository
//! [`CredentialRepository`]: credential::CredentialRepository
//! [`ReportRepository`]: report::ReportRepository

pub mod audit;
pub mod category;
pub mod client;
pub mod credential;
pub mod product;
pub mod report;
pub mod returns;
pub mod sale;
pub mod supplier;
pub mod supply;
pub mod user;
pub mod withdrawal;

use uuid::Uuid;

/// Fresh primary key.
pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// `LIKE` pattern for a case-insensitive substring search.
///
/// `%` and `_` typed by the user are escaped; queries use `ESCAPE '\'`.
pub(crate) fn like_pattern(query: &str) -> String {
    let escaped = query
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(" cafe "), "%cafe%");
        assert_eq!(like_pattern("50%"), "%50\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
    }

    #[test]
    fn test_new_id_is_uuid() {
        assert!(Uuid::parse_str(&new_id()).is_ok());
    }
}
