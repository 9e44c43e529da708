//! # Domain Types
//!
//! Entities of the retail back-office and the inputs that create them.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Catalog            Selling              Buying                         │
//! │  ─────────          ─────────            ─────────                      │
//! │  Category           Client               Supplier                       │
//! │  Product ◄───────── Sale ── SaleItem     SupplyOrder ── SupplyOrderLine │
//! │     ▲                 ▲                       └──── SupplierPayment     │
//! │     │                 │                                                 │
//! │  StockMovement     ParcelReturn          Withdrawal                     │
//! │  (audit trail)     (Colissimo)           (cash out of the till)         │
//! │                                                                         │
//! │  Back office: User, AuditEntry, ParcelCredential                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every entity is keyed by a UUID v4 string; money fields are integer cents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::access::Role;
use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate in basis points (2000 = 20%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Percentage for display only.
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate(crate::DEFAULT_VAT_BPS)
    }
}

// =============================================================================
// Status Enums
// =============================================================================

/// How much of a supply order has been paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum PaymentStatus {
    Unpaid,
    Partial,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Partial => "partial",
            PaymentStatus::Paid => "paid",
        }
    }
}

/// Whether the goods of a supply order are on the shelf yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ReceptionStatus {
    Pending,
    Received,
}

impl Default for ReceptionStatus {
    fn default() -> Self {
        ReceptionStatus::Pending
    }
}

/// Direction of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum MovementKind {
    In,
    Out,
}

/// Cause recorded on every stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum MovementReason {
    Sale,
    SaleCancelled,
    SupplyReceived,
    SupplyCancelled,
    ParcelReturn,
    ParcelReturnCancelled,
    InitialStock,
    ManualAdjustment,
}

impl MovementReason {
    /// Direction implied by the reason.
    ///
    /// `ManualAdjustment` has no fixed direction and is reported as `In`;
    /// callers building an adjustment pick the kind from the sign.
    pub fn default_kind(&self) -> MovementKind {
        match self {
            MovementReason::Sale
            | MovementReason::SupplyCancelled
            | MovementReason::ParcelReturnCancelled => MovementKind::Out,
            MovementReason::SaleCancelled
            | MovementReason::SupplyReceived
            | MovementReason::ParcelReturn
            | MovementReason::InitialStock
            | MovementReason::ManualAdjustment => MovementKind::In,
        }
    }
}

/// How a customer paid or how a supplier was paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum PaymentMethod {
    Cash,
    Card,
    Cheque,
    Transfer,
}

// =============================================================================
// Catalog
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A product on the shelf.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub category_id: Option<String>,
    /// Shop reference, unique (printed on labels).
    pub reference: String,
    pub barcode: Option<String>,
    pub name: String,
    pub description: Option<String>,
    /// Last purchase cost in cents.
    pub purchase_price_cents: i64,
    /// Shelf price in cents, VAT included.
    pub sale_price_cents: i64,
    /// Running stock counter. Only the stock ledger writes it.
    pub stock: i64,
    /// Threshold for the low-stock list.
    pub min_stock: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn sale_price(&self) -> Money {
        Money::from_cents(self.sale_price_cents)
    }

    #[inline]
    pub fn purchase_price(&self) -> Money {
        Money::from_cents(self.purchase_price_cents)
    }

    /// At or under the restocking threshold.
    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.min_stock
    }
}

/// One row of the stock audit trail.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockMovement {
    pub id: String,
    pub product_id: String,
    pub kind: MovementKind,
    /// Always positive; `kind` carries the direction.
    pub quantity: i64,
    pub reason: MovementReason,
    /// Sale, supply order or return that caused the movement.
    pub reference_id: Option<String>,
    /// Product stock right after the movement.
    pub stock_after: i64,
    pub user_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl StockMovement {
    /// Signed change applied to the counter.
    pub fn delta(&self) -> i64 {
        match self.kind {
            MovementKind::In => self.quantity,
            MovementKind::Out => -self.quantity,
        }
    }
}

// =============================================================================
// Parties
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Client {
    pub id: String,
    pub first_name: Option<String>,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Client {
    /// "First Last", or just the last name.
    pub fn display_name(&self) -> String {
        match self.first_name.as_deref().map(str::trim) {
            Some(first) if !first.is_empty() => format!("{} {}", first, self.last_name),
            _ => self.last_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Supplier {
    pub id: String,
    pub name: String,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Supply Orders
// =============================================================================

/// A purchase from a supplier (approvisionnement).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SupplyOrder {
    pub id: String,
    pub supplier_id: String,
    /// Supplier's delivery note or order number.
    pub reference: String,
    #[ts(as = "String")]
    pub ordered_at: DateTime<Utc>,
    pub total_cents: i64,
    pub paid_cents: i64,
    pub payment_status: PaymentStatus,
    pub reception_status: ReceptionStatus,
    #[ts(as = "Option<String>")]
    pub received_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_by: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl SupplyOrder {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn paid(&self) -> Money {
        Money::from_cents(self.paid_cents)
    }

    /// Amount still owed to the supplier.
    pub fn remaining(&self) -> Money {
        crate::ledger::remaining(self.total(), self.paid())
    }

    pub fn is_received(&self) -> bool {
        self.reception_status == ReceptionStatus::Received
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SupplyOrderLine {
    pub id: String,
    pub supply_order_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub unit_cost_cents: i64,
    pub line_total_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SupplierPayment {
    pub id: String,
    pub supply_order_id: String,
    pub amount_cents: i64,
    pub method: PaymentMethod,
    #[ts(as = "String")]
    pub paid_at: DateTime<Utc>,
    pub notes: Option<String>,
}

/// A supply order with its lines and payments.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SupplyOrderDetail {
    #[serde(flatten)]
    pub order: SupplyOrder,
    pub remaining_cents: i64,
    pub lines: Vec<SupplyOrderLine>,
    pub payments: Vec<SupplierPayment>,
}

// =============================================================================
// Sales
// =============================================================================

/// A point-of-sale ticket (vente).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub invoice_number: String,
    pub client_id: Option<String>,
    pub user_id: Option<String>,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub payment_method: PaymentMethod,
    /// Cash handed over by the customer, if paid in cash.
    pub tendered_cents: Option<i64>,
    pub change_cents: i64,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub sold_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// A sale line. Product reference, name and price are frozen at sale time.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    pub reference_snapshot: String,
    pub name_snapshot: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleDetail {
    #[serde(flatten)]
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}

// =============================================================================
// Returns and Withdrawals
// =============================================================================

/// Goods sent back by a customer through Colissimo (retour).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ParcelReturn {
    pub id: String,
    pub tracking_number: String,
    pub product_id: String,
    pub sale_id: Option<String>,
    pub quantity: i64,
    pub reason: Option<String>,
    /// Whether the goods went back on the shelf.
    pub restocked: bool,
    pub created_by: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Cash taken out of the till (retrait).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Withdrawal {
    pub id: String,
    pub amount_cents: i64,
    pub reason: String,
    pub user_id: Option<String>,
    #[ts(as = "String")]
    pub withdrawn_at: DateTime<Utc>,
}

// =============================================================================
// Back Office
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    /// Argon2 PHC string. Never serialized.
    #[serde(skip_serializing, default)]
    #[ts(skip)]
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// One row of the action history (historique_actions).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct AuditEntry {
    pub id: String,
    pub user_id: Option<String>,
    pub user_name: Option<String>,
    /// `create`, `update`, `delete`, `login`, ...
    pub action: String,
    /// Table-level name of the entity (`product`, `sale`, ...).
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub details: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Colissimo account used by the tracking integration.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ParcelCredential {
    pub id: String,
    pub label: String,
    pub contract_number: String,
    /// base64(IV ‖ TAG ‖ CIPHERTEXT). Never serialized.
    #[serde(skip_serializing, default)]
    #[ts(skip)]
    pub encrypted_password: String,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Reports
// =============================================================================

/// Revenue figures for one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MonthlyRevenue {
    /// 1 = January.
    pub month: u32,
    pub sales_count: i64,
    pub revenue_cents: i64,
    pub withdrawals_cents: i64,
    /// revenue - withdrawals
    pub net_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DashboardSummary {
    pub today_revenue_cents: i64,
    pub today_sales_count: i64,
    pub low_stock_count: i64,
    /// Sum of what is still owed on all supply orders.
    pub supplier_balance_cents: i64,
}

// =============================================================================
// Inputs
// =============================================================================
// Deserialized from request bodies and handed to the repositories.

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CategoryInput {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductInput {
    pub category_id: Option<String>,
    pub reference: String,
    pub barcode: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub purchase_price_cents: i64,
    pub sale_price_cents: i64,
    /// Initial stock on create, target stock on update.
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub min_stock: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ClientInput {
    pub first_name: Option<String>,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SupplierInput {
    pub name: String,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SupplyLineInput {
    pub product_id: String,
    pub quantity: i64,
    pub unit_cost_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewSupplyOrder {
    pub supplier_id: String,
    pub reference: String,
    #[ts(as = "Option<String>")]
    pub ordered_at: Option<DateTime<Utc>>,
    pub lines: Vec<SupplyLineInput>,
    /// Paid up front when the order is recorded.
    #[serde(default)]
    pub paid_cents: i64,
    pub payment_method: Option<PaymentMethod>,
    /// Goods already on the shelf.
    #[serde(default)]
    pub received: bool,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SupplyOrderUpdate {
    pub supplier_id: String,
    pub reference: String,
    #[ts(as = "String")]
    pub ordered_at: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewSupplierPayment {
    pub amount_cents: i64,
    pub method: PaymentMethod,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleLineInput {
    pub product_id: String,
    pub quantity: i64,
    /// Overrides the shelf price for this line.
    pub unit_price_cents: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewSale {
    pub client_id: Option<String>,
    pub lines: Vec<SaleLineInput>,
    #[serde(default)]
    pub discount_cents: i64,
    pub payment_method: PaymentMethod,
    pub tendered_cents: Option<i64>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewParcelReturn {
    pub tracking_number: String,
    pub product_id: String,
    pub sale_id: Option<String>,
    pub quantity: i64,
    pub reason: Option<String>,
    #[serde(default = "default_true")]
    pub restock: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewWithdrawal {
    pub amount_cents: i64,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UserInput {
    pub name: String,
    pub email: String,
    pub role: Role,
    /// Required on create; on update, `None` keeps the current password.
    pub password: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CredentialInput {
    pub label: String,
    pub contract_number: String,
    /// Plain password; required on create, optional on update.
    pub password: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product(stock: i64, min_stock: i64) -> Product {
        let now = Utc::now();
        Product {
            id: "p1".to_string(),
            category_id: None,
            reference: "CAFE-250".to_string(),
            barcode: None,
            name: "Café moulu 250g".to_string(),
            description: None,
            purchase_price_cents: 250,
            sale_price_cents: 490,
            stock,
            min_stock,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_low_stock_threshold() {
        assert!(product(2, 2).is_low_stock());
        assert!(product(0, 0).is_low_stock());
        assert!(!product(3, 2).is_low_stock());
    }

    #[test]
    fn test_tax_rate_default_is_french_vat() {
        assert_eq!(TaxRate::default().bps(), 2000);
        assert!((TaxRate::from_bps(550).percentage() - 5.5).abs() < 0.001);
    }

    #[test]
    fn test_client_display_name() {
        let now = Utc::now();
        let mut client = Client {
            id: "c1".to_string(),
            first_name: Some("Lucie".to_string()),
            last_name: "Martin".to_string(),
            email: None,
            phone: None,
            address: None,
            notes: None,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(client.display_name(), "Lucie Martin");

        client.first_name = Some("  ".to_string());
        assert_eq!(client.display_name(), "Martin");
    }

    #[test]
    fn test_movement_delta_sign() {
        let movement = StockMovement {
            id: "m1".to_string(),
            product_id: "p1".to_string(),
            kind: MovementKind::Out,
            quantity: 4,
            reason: MovementReason::Sale,
            reference_id: None,
            stock_after: 6,
            user_id: None,
            created_at: Utc::now(),
        };
        assert_eq!(movement.delta(), -4);
        assert_eq!(MovementReason::Sale.default_kind(), MovementKind::Out);
        assert_eq!(MovementReason::ParcelReturn.default_kind(), MovementKind::In);
    }

    #[test]
    fn test_user_password_hash_not_serialized() {
        let now = Utc::now();
        let user = User {
            id: "u1".to_string(),
            name: "Admin".to_string(),
            email: "admin@boutique.fr".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            role: Role::Admin,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2"));
        assert!(json.contains("\"role\":\"admin\""));
    }
}
