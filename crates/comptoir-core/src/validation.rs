//! # Validation Module
//!
//! Field validators shared by the repositories and the HTTP layer.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Browser client                                               │
//! │  └── Required fields, input types                                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Repository / handler (Rust)                                  │
//! │  ├── Type validation (serde deserialization)                           │
//! │  └── THIS MODULE: field rules                                          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  ├── UNIQUE (produits.reference, utilisateurs.email, ...)              │
//! │  └── Foreign keys                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use comptoir_core::validation::{validate_reference, validate_quantity};
//!
//! validate_reference("CAFE-250").unwrap();
//! validate_quantity(5).unwrap();
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::{MAX_LINES, MAX_LINE_QUANTITY, MAX_PRICE_CENTS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a required text field and returns it trimmed.
pub fn validate_required_text(field: &str, value: &str, max: usize) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(value.to_string())
}

/// Trims an optional text field; blank becomes `None`.
pub fn normalize_optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Validates a product reference.
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Letters, digits, hyphens, underscores, dots
///
/// ## Example
/// ```rust
/// use comptoir_core::validation::validate_reference;
///
/// assert!(validate_reference("CAFE-250").is_ok());
/// assert!(validate_reference("").is_err());
/// assert!(validate_reference("has space").is_err());
/// ```
pub fn validate_reference(reference: &str) -> ValidationResult<()> {
    let reference = validate_required_text("reference", reference, 50)?;

    if !reference
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(ValidationError::invalid(
            "reference",
            "must contain only letters, numbers, hyphens, underscores and dots",
        ));
    }

    Ok(())
}

/// Validates a display name (product, category, client, supplier, user).
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    validate_required_text(field, name, 200).map(|_| ())
}

/// Validates an e-mail address.
///
/// Only the shape is checked: one `@`, a non-empty local part, and a domain
/// containing a dot that is neither first nor last.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = validate_required_text("email", email, 254)?;

    let Some((local, domain)) = email.split_once('@') else {
        return Err(ValidationError::invalid("email", "must contain '@'"));
    };

    let domain_ok = domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains('@');

    if local.is_empty() || !domain_ok || email.chars().any(char::is_whitespace) {
        return Err(ValidationError::invalid("email", "is not a valid address"));
    }

    Ok(())
}

/// Validates a phone number: digits with optional spaces, dots, dashes and a
/// leading `+`; 6 to 20 digits.
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    let phone = phone.trim();

    let body = phone.strip_prefix('+').unwrap_or(phone);
    if !body
        .chars()
        .all(|c| c.is_ascii_digit() || c == ' ' || c == '.' || c == '-')
    {
        return Err(ValidationError::invalid(
            "phone",
            "must contain only digits, spaces, dots and dashes",
        ));
    }

    let digits = body.chars().filter(char::is_ascii_digit).count();
    if !(6..=20).contains(&digits) {
        return Err(ValidationError::OutOfRange {
            field: "phone digits".to_string(),
            min: 6,
            max: 20,
        });
    }

    Ok(())
}

/// Validates a Colissimo tracking number (skybill number).
///
/// ## Rules
/// - 8 to 20 characters after trimming
/// - ASCII letters and digits only
///
/// ## Returns
/// The trimmed, upper-cased tracking number.
pub fn validate_tracking_number(tracking: &str) -> ValidationResult<String> {
    let tracking = tracking.trim();

    if tracking.is_empty() {
        return Err(ValidationError::required("tracking_number"));
    }

    if !tracking.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::invalid(
            "tracking_number",
            "must contain only letters and digits",
        ));
    }

    if !(8..=20).contains(&tracking.len()) {
        return Err(ValidationError::OutOfRange {
            field: "tracking_number length".to_string(),
            min: 8,
            max: 20,
        });
    }

    Ok(tracking.to_ascii_uppercase())
}

/// Validates a new password (at least 8 characters).
pub fn validate_password(password: &str) -> ValidationResult<()> {
    if password.chars().count() < 8 {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min: 8,
        });
    }

    if password.len() > 256 {
        return Err(ValidationError::TooLong {
            field: "password".to_string(),
            max: 256,
        });
    }

    Ok(())
}

/// Validates a search query.
///
/// ## Rules
/// - Can be empty (returns all results)
/// - Maximum 100 characters
///
/// ## Returns
/// The trimmed query string.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.chars().count() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_LINE_QUANTITY (9999)
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  POS: add a line                                                        │
/// │                                                                         │
/// │  Cashier types quantity: 5                                             │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_quantity(5) ← THIS FUNCTION                                  │
/// │       │                                                                 │
/// │       ├── qty <= 0?    → "quantity must be positive"                   │
/// │       ├── qty > 9999?  → "quantity must be between 1 and 9999"         │
/// │       └── OK → check_stock, then insert                                │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a stock level or threshold (>= 0).
pub fn validate_stock_level(field: &str, value: i64) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a price in cents.
///
/// ## Example
/// ```rust
/// use comptoir_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents(1099).is_ok());
/// assert!(validate_price_cents(0).is_ok());
/// assert!(validate_price_cents(-100).is_err());
/// assert!(validate_price_cents(100_000_001).is_err());
/// ```
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if !(0..=MAX_PRICE_CENTS).contains(&cents) {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: MAX_PRICE_CENTS,
        });
    }

    Ok(())
}

/// Total of a document line, `unit_price_cents * quantity`.
///
/// Fails instead of overflowing when the product does not fit in an `i64`.
pub fn line_total(unit_price_cents: i64, quantity: i64) -> ValidationResult<Money> {
    Money::from_cents(unit_price_cents)
        .checked_multiply_quantity(quantity)
        .ok_or_else(|| ValidationError::OutOfRange {
            field: "line_total".to_string(),
            min: 0,
            max: i64::MAX,
        })
}

/// Sum of line totals, failing instead of overflowing.
pub fn sum_line_totals(totals: impl IntoIterator<Item = Money>) -> ValidationResult<Money> {
    totals
        .into_iter()
        .try_fold(Money::zero(), |acc, total| acc.checked_add(total))
        .ok_or_else(|| ValidationError::OutOfRange {
            field: "subtotal".to_string(),
            min: 0,
            max: i64::MAX,
        })
}

/// Validates a payment or withdrawal amount in cents (> 0).
pub fn validate_payment_amount(cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }

    Ok(())
}

/// Validates a discount against the subtotal it applies to.
pub fn validate_discount(discount_cents: i64, subtotal_cents: i64) -> ValidationResult<()> {
    if discount_cents < 0 || discount_cents > subtotal_cents {
        return Err(ValidationError::OutOfRange {
            field: "discount".to_string(),
            min: 0,
            max: subtotal_cents.max(0),
        });
    }

    Ok(())
}

/// Validates a report year.
pub fn validate_year(year: i32) -> ValidationResult<()> {
    if !(2000..=2100).contains(&year) {
        return Err(ValidationError::OutOfRange {
            field: "year".to_string(),
            min: 2000,
            max: 2100,
        });
    }

    Ok(())
}

/// Validates a VAT rate in basis points (0% to 100%).
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10000 {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: 10000,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates the number of lines on a document.
pub fn validate_line_count(count: usize) -> ValidationResult<()> {
    if count == 0 || count > MAX_LINES {
        return Err(ValidationError::OutOfRange {
            field: "lines".to_string(),
            min: 1,
            max: MAX_LINES as i64,
        });
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string.
///
/// ## Example
/// ```rust
/// use comptoir_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::required("id"));
    }

    uuid::Uuid::parse_str(id)
        .map_err(|_| ValidationError::invalid("id", "must be a valid UUID"))?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_reference() {
        assert!(validate_reference("CAFE-250").is_ok());
        assert!(validate_reference("ABC123").is_ok());
        assert!(validate_reference("the_1.v2").is_ok());

        assert!(validate_reference("").is_err());
        assert!(validate_reference("   ").is_err());
        assert!(validate_reference("has space").is_err());
        assert!(validate_reference(&"A".repeat(51)).is_err());
    }

    #[test]
    fn test_validate_name_counts_characters() {
        assert!(validate_name("name", "Thé vert").is_ok());
        assert!(validate_name("name", "").is_err());
        // 200 accented characters are 400 bytes but still valid
        assert!(validate_name("name", &"é".repeat(200)).is_ok());
        assert!(validate_name("name", &"é".repeat(201)).is_err());
    }

    #[test]
    fn test_normalize_optional() {
        assert_eq!(normalize_optional(Some("  a ")), Some("a".to_string()));
        assert_eq!(normalize_optional(Some("   ")), None);
        assert_eq!(normalize_optional(None), None);
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("lucie.martin@example.fr").is_ok());
        assert!(validate_email("no-at-sign.fr").is_err());
        assert!(validate_email("@example.fr").is_err());
        assert!(validate_email("lucie@localhost").is_err());
        assert!(validate_email("lucie@.fr").is_err());
        assert!(validate_email("lu cie@example.fr").is_err());
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("06 12 34 56 78").is_ok());
        assert!(validate_phone("+33 6 12 34 56 78").is_ok());
        assert!(validate_phone("01.23.45.67.89").is_ok());
        assert!(validate_phone("12345").is_err());
        assert!(validate_phone("06 12 AB 56 78").is_err());
    }

    #[test]
    fn test_validate_tracking_number() {
        assert_eq!(
            validate_tracking_number(" 6a12345678901 ").unwrap(),
            "6A12345678901"
        );
        assert!(validate_tracking_number("1234567").is_err());
        assert!(validate_tracking_number(&"1".repeat(21)).is_err());
        assert!(validate_tracking_number("6A1234-5678").is_err());
        assert!(validate_tracking_number("").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("motdepasse").is_ok());
        assert!(validate_password("court").is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(9999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(10_000).is_err());
    }

    #[test]
    fn test_validate_amounts() {
        assert!(validate_price_cents(0).is_ok());
        assert!(validate_price_cents(MAX_PRICE_CENTS).is_ok());
        assert!(validate_price_cents(-1).is_err());
        assert!(validate_price_cents(MAX_PRICE_CENTS + 1).is_err());
        assert!(validate_price_cents(i64::MAX / 1000).is_err());
        assert!(validate_payment_amount(1).is_ok());
        assert!(validate_payment_amount(0).is_err());
        assert!(validate_discount(0, 1000).is_ok());
        assert!(validate_discount(1000, 1000).is_ok());
        assert!(validate_discount(1001, 1000).is_err());
        assert!(validate_discount(-5, 1000).is_err());
    }

    #[test]
    fn test_line_totals_do_not_overflow() {
        assert_eq!(line_total(490, 3).unwrap().cents(), 1_470);
        assert!(matches!(
            line_total(i64::MAX / 1000, 9999),
            Err(ValidationError::OutOfRange { .. })
        ));

        let lines = [Money::from_cents(1_000), Money::from_cents(470)];
        assert_eq!(sum_line_totals(lines).unwrap().cents(), 1_470);
        assert!(sum_line_totals([Money::from_cents(i64::MAX), Money::from_cents(1)]).is_err());
    }

    #[test]
    fn test_validate_year() {
        assert!(validate_year(2024).is_ok());
        assert!(validate_year(1999).is_err());
        assert!(validate_year(2101).is_err());
    }

    #[test]
    fn test_validate_line_count() {
        assert!(validate_line_count(1).is_ok());
        assert!(validate_line_count(0).is_err());
        assert!(validate_line_count(MAX_LINES + 1).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("123").is_err());
    }
}
