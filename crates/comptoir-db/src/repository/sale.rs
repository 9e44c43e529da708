//! # Sale Repository
//!
//! Point-of-sale tickets (ventes) and their lines.
//!
//! ## Sale Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         create(NewSale)                                 │
//! │                                                                         │
//! │  validate lines ──► BEGIN                                               │
//! │                      │                                                  │
//! │                      ├─ per line: load product, check_stock,            │
//! │                      │            snapshot reference/name/price         │
//! │                      ├─ subtotal, discount, total                       │
//! │                      ├─ cash: tendered >= total, change                 │
//! │                      ├─ next FAC-YYYYMM-NNNNN                           │
//! │                      ├─ INSERT ventes + details_vente                   │
//! │                      ├─ out/sale movement per line                      │
//! │                      ▼                                                  │
//! │                    COMMIT   (any error above: nothing was written)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use comptoir_core::invoice::{invoice_number, invoice_prefix_for};
use comptoir_core::ledger::{check_stock, StockDelta};
use comptoir_core::validation::{
    line_total, normalize_optional, sum_line_totals, validate_price_cents, validate_quantity,
};
use comptoir_core::{
    CoreError, Money, MovementReason, NewSale, PaymentMethod, Sale, SaleDetail, SaleItem,
    MAX_LINES,
};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use super::new_id;
use crate::error::{DbError, DbResult};
use crate::ledger::apply_movement;

pub(crate) const SALE_COLUMNS: &str = "id, invoice_number, client_id, user_id, subtotal_cents, \
     discount_cents, total_cents, payment_method, tendered_cents, change_cents, notes, sold_at";

const DOCUMENT: &str = "Sale";

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Sales, newest first.
    ///
    /// ## Arguments
    /// * `from` / `to` - Inclusive bounds on the sale time
    /// * `client_id` - Only this client's purchases
    pub async fn list(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        client_id: Option<&str>,
    ) -> DbResult<Vec<Sale>> {
        let sql = format!(
            r#"
            SELECT {SALE_COLUMNS}
            FROM ventes
            WHERE (?1 IS NULL OR sold_at >= ?1)
              AND (?2 IS NULL OR sold_at <= ?2)
              AND (?3 IS NULL OR client_id = ?3)
            ORDER BY sold_at DESC
            "#
        );

        let sales = sqlx::query_as::<_, Sale>(&sql)
            .bind(from)
            .bind(to)
            .bind(client_id)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = sales.len(), "Sales listed");
        Ok(sales)
    }

    /// Gets a sale by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sql = format!("SELECT {SALE_COLUMNS} FROM ventes WHERE id = ?1");
        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(sale)
    }

    /// Gets all lines of a sale.
    pub async fn get_items(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let mut conn = self.pool.acquire().await?;
        fetch_items(&mut conn, sale_id).await
    }

    /// The sale with its lines.
    pub async fn get_detail(&self, id: &str) -> DbResult<Option<SaleDetail>> {
        let Some(sale) = self.get_by_id(id).await? else {
            return Ok(None);
        };
        let items = self.get_items(id).await?;
        Ok(Some(SaleDetail { sale, items }))
    }

    /// Records a sale and takes its goods out of stock.
    ///
    /// ## Errors
    /// - `CoreError::InsufficientStock` when a line asks for more than the shelf holds
    /// - `CoreError::DiscountTooLarge` when the discount exceeds the subtotal
    /// - `CoreError::InsufficientTender` when cash handed over does not cover the total
    ///
    /// Nothing is written when any of these occur.
    pub async fn create(&self, input: &NewSale, user_id: Option<&str>) -> DbResult<SaleDetail> {
        check_line_count(input.lines.len())?;
        for line in &input.lines {
            validate_quantity(line.quantity)?;
            if let Some(price) = line.unit_price_cents {
                validate_price_cents(price)?;
            }
        }

        let id = new_id();
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        if let Some(client_id) = &input.client_id {
            let exists: Option<String> = sqlx::query_scalar("SELECT id FROM clients WHERE id = ?1")
                .bind(client_id)
                .fetch_optional(&mut *tx)
                .await?;
            if exists.is_none() {
                return Err(DbError::not_found("Client", client_id));
            }
        }

        // Build the lines from the current catalog.
        let mut requested: HashMap<&str, i64> = HashMap::new();
        let mut items = Vec::with_capacity(input.lines.len());

        for line in &input.lines {
            let row: Option<(String, String, i64, i64)> = sqlx::query_as(
                "SELECT reference, name, stock, sale_price_cents FROM produits WHERE id = ?1",
            )
            .bind(&line.product_id)
            .fetch_optional(&mut *tx)
            .await?;
            let (reference, name, stock, shelf_price) =
                row.ok_or_else(|| DbError::not_found("Product", &line.product_id))?;

            let already = requested.entry(line.product_id.as_str()).or_insert(0);
            check_stock(&reference, stock, *already + line.quantity)?;
            *already += line.quantity;

            let unit_price = line.unit_price_cents.unwrap_or(shelf_price);
            items.push(SaleItem {
                id: new_id(),
                sale_id: id.clone(),
                product_id: line.product_id.clone(),
                reference_snapshot: reference,
                name_snapshot: name,
                quantity: line.quantity,
                unit_price_cents: unit_price,
                line_total_cents: line_total(unit_price, line.quantity)?.cents(),
            });
        }

        let subtotal =
            sum_line_totals(items.iter().map(|i| Money::from_cents(i.line_total_cents)))?;
        let discount = Money::from_cents(input.discount_cents);
        if discount.is_negative() || discount > subtotal {
            return Err(CoreError::DiscountTooLarge {
                discount: discount.to_string(),
                subtotal: subtotal.to_string(),
            }
            .into());
        }
        let total = subtotal - discount;

        let (tendered, change) = settle(input.payment_method, input.tendered_cents, total)?;

        let number = next_invoice_number(&mut tx, now).await?;

        let sale = Sale {
            id: id.clone(),
            invoice_number: number,
            client_id: input.client_id.clone(),
            user_id: user_id.map(str::to_string),
            subtotal_cents: subtotal.cents(),
            discount_cents: discount.cents(),
            total_cents: total.cents(),
            payment_method: input.payment_method,
            tendered_cents: tendered.map(|t| t.cents()),
            change_cents: change.cents(),
            notes: normalize_optional(input.notes.as_deref()),
            sold_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO ventes (
                id, invoice_number, client_id, user_id, subtotal_cents, discount_cents,
                total_cents, payment_method, tendered_cents, change_cents, notes, sold_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.invoice_number)
        .bind(&sale.client_id)
        .bind(&sale.user_id)
        .bind(sale.subtotal_cents)
        .bind(sale.discount_cents)
        .bind(sale.total_cents)
        .bind(sale.payment_method)
        .bind(sale.tendered_cents)
        .bind(sale.change_cents)
        .bind(&sale.notes)
        .bind(sale.sold_at)
        .execute(&mut *tx)
        .await?;

        for item in &items {
            sqlx::query(
                r#"
                INSERT INTO details_vente (
                    id, sale_id, product_id, reference_snapshot, name_snapshot,
                    quantity, unit_price_cents, line_total_cents
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(&item.id)
            .bind(&item.sale_id)
            .bind(&item.product_id)
            .bind(&item.reference_snapshot)
            .bind(&item.name_snapshot)
            .bind(item.quantity)
            .bind(item.unit_price_cents)
            .bind(item.line_total_cents)
            .execute(&mut *tx)
            .await?;

            apply_movement(
                &mut tx,
                &item.product_id,
                StockDelta::outgoing(item.quantity, MovementReason::Sale),
                Some(&sale.id),
                user_id,
            )
            .await?;
        }

        tx.commit().await?;

        info!(
            id = %sale.id,
            invoice = %sale.invoice_number,
            total = %total,
            lines = items.len(),
            "Sale recorded"
        );

        Ok(SaleDetail { sale, items })
    }

    /// Cancels a sale: its goods go back on the shelf, returns lose their
    /// link to it, then the lines and the sale are removed.
    ///
    /// Units already put back by a restocked return of this sale are not
    /// restocked a second time.
    pub async fn delete(&self, id: &str, user_id: Option<&str>) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<String> = sqlx::query_scalar("SELECT id FROM ventes WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(DbError::not_found(DOCUMENT, id));
        }

        let mut restocked: HashMap<String, i64> = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT product_id, SUM(quantity)
            FROM retours
            WHERE sale_id = ?1 AND restocked = 1
            GROUP BY product_id
            "#,
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .collect();

        for item in fetch_items(&mut tx, id).await? {
            let already_back = restocked
                .get_mut(&item.product_id)
                .map(|left| {
                    let taken = (*left).min(item.quantity);
                    *left -= taken;
                    taken
                })
                .unwrap_or(0);

            let quantity = item.quantity - already_back;
            if quantity == 0 {
                debug!(sale = %id, product = %item.product_id, "Line already returned");
                continue;
            }

            apply_movement(
                &mut tx,
                &item.product_id,
                StockDelta::incoming(quantity, MovementReason::SaleCancelled),
                Some(id),
                user_id,
            )
            .await?;
        }

        sqlx::query("UPDATE retours SET sale_id = NULL WHERE sale_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM details_vente WHERE sale_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM ventes WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        info!(id = %id, "Sale cancelled");
        Ok(())
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn check_line_count(count: usize) -> DbResult<()> {
    if count == 0 {
        return Err(CoreError::EmptyDocument {
            document: DOCUMENT.to_string(),
        }
        .into());
    }
    if count > MAX_LINES {
        return Err(CoreError::TooManyLines {
            document: DOCUMENT.to_string(),
            max: MAX_LINES,
        }
        .into());
    }
    Ok(())
}

/// Amount tendered and change due.
///
/// Only cash has change. Cash without a tendered amount counts as the exact
/// amount.
fn settle(
    method: PaymentMethod,
    tendered_cents: Option<i64>,
    total: Money,
) -> DbResult<(Option<Money>, Money)> {
    match (method, tendered_cents) {
        (PaymentMethod::Cash, Some(cents)) => {
            let tendered = Money::from_cents(cents);
            if tendered < total {
                return Err(CoreError::InsufficientTender {
                    tendered: tendered.to_string(),
                    total: total.to_string(),
                }
                .into());
            }
            Ok((Some(tendered), tendered - total))
        }
        _ => Ok((None, Money::zero())),
    }
}

/// Next invoice number of the month of `at`.
///
/// The sequence is compared as a number: past 99999 the text no longer
/// sorts in sequence order.
async fn next_invoice_number(conn: &mut SqliteConnection, at: DateTime<Utc>) -> DbResult<String> {
    let prefix = invoice_prefix_for(at);

    let last: Option<i64> = sqlx::query_scalar(
        "SELECT MAX(CAST(substr(invoice_number, ?1) AS INTEGER)) FROM ventes WHERE invoice_number LIKE ?2",
    )
    .bind(prefix.len() as i64 + 2)
    .bind(format!("{prefix}-%"))
    .fetch_one(&mut *conn)
    .await?;

    let sequence = last.and_then(|n| u32::try_from(n).ok()).unwrap_or(0) + 1;
    Ok(invoice_number(sequence, at))
}

async fn fetch_items(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<Vec<SaleItem>> {
    let items = sqlx::query_as::<_, SaleItem>(
        r#"
        SELECT id, sale_id, product_id, reference_snapshot, name_snapshot,
               quantity, unit_price_cents, line_total_cents
        FROM details_vente
        WHERE sale_id = ?1
        ORDER BY rowid
        "#,
    )
    .bind(sale_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use comptoir_core::invoice::parse_sequence;
    use comptoir_core::{ProductInput, SaleLineInput, ValidationError};

    async fn setup(stock: i64) -> (Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db
            .products()
            .create(
                &ProductInput {
                    category_id: None,
                    reference: "CAFE-250".to_string(),
                    barcode: None,
                    name: "Café moulu 250g".to_string(),
                    description: None,
                    purchase_price_cents: 250,
                    sale_price_cents: 490,
                    stock,
                    min_stock: 0,
                },
                None,
            )
            .await
            .unwrap();
        (db, product.id)
    }

    fn sale(product_id: &str, quantity: i64) -> NewSale {
        NewSale {
            client_id: None,
            lines: vec![SaleLineInput {
                product_id: product_id.to_string(),
                quantity,
                unit_price_cents: None,
            }],
            discount_cents: 0,
            payment_method: PaymentMethod::Cash,
            tendered_cents: Some(5_000),
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_sale_snapshots_and_change() {
        let (db, product_id) = setup(10).await;
        let detail = db.sales().create(&sale(&product_id, 3), None).await.unwrap();

        assert_eq!(detail.sale.total_cents, 1_470);
        assert_eq!(detail.sale.change_cents, 3_530);
        assert_eq!(detail.items[0].reference_snapshot, "CAFE-250");
        assert_eq!(detail.items[0].unit_price_cents, 490);
        assert!(detail.sale.invoice_number.ends_with("-00001"));

        let product = db.products().get_by_id(&product_id).await.unwrap().unwrap();
        assert_eq!(product.stock, 7);
    }

    #[tokio::test]
    async fn test_invoice_numbers_increase() {
        let (db, product_id) = setup(10).await;
        let first = db.sales().create(&sale(&product_id, 1), None).await.unwrap();
        let second = db.sales().create(&sale(&product_id, 1), None).await.unwrap();

        assert_eq!(parse_sequence(&first.sale.invoice_number), Some(1));
        assert_eq!(parse_sequence(&second.sale.invoice_number), Some(2));
    }

    #[tokio::test]
    async fn test_invoice_sequence_past_five_digits() {
        let (db, product_id) = setup(10).await;
        let prefix = invoice_prefix_for(Utc::now());

        for (id, sequence) in [("a", 99_999), ("b", 100_000)] {
            sqlx::query(
                r#"
                INSERT INTO ventes (id, invoice_number, subtotal_cents, total_cents, payment_method, sold_at)
                VALUES (?1, ?2, 0, 0, 'card', ?3)
                "#,
            )
            .bind(id)
            .bind(format!("{prefix}-{sequence:05}"))
            .bind(Utc::now())
            .execute(db.pool())
            .await
            .unwrap();
        }

        let detail = db.sales().create(&sale(&product_id, 1), None).await.unwrap();
        assert_eq!(parse_sequence(&detail.sale.invoice_number), Some(100_001));
    }

    #[tokio::test]
    async fn test_line_total_overflow_is_rejected() {
        let (db, product_id) = setup(10_000).await;

        let mut input = sale(&product_id, 9_999);
        input.lines[0].unit_price_cents = Some(i64::MAX / 1000);
        input.payment_method = PaymentMethod::Card;

        let err = db.sales().create(&input, None).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));

        let product = db.products().get_by_id(&product_id).await.unwrap().unwrap();
        assert_eq!(product.stock, 10_000);
        assert!(db.sales().list(None, None, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_insufficient_stock_writes_nothing() {
        let (db, product_id) = setup(2).await;

        let err = db.sales().create(&sale(&product_id, 3), None).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::InsufficientStock { .. })));

        let product = db.products().get_by_id(&product_id).await.unwrap().unwrap();
        assert_eq!(product.stock, 2);
        assert_eq!(db.products().movements(&product_id).await.unwrap().len(), 1);
        assert!(db.sales().list(None, None, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_same_product_on_two_lines_counts_together() {
        let (db, product_id) = setup(4).await;
        let mut input = sale(&product_id, 3);
        input.lines.push(SaleLineInput {
            product_id: product_id.clone(),
            quantity: 2,
            unit_price_cents: None,
        });

        let err = db.sales().create(&input, None).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(CoreError::InsufficientStock { requested: 5, .. })
        ));
    }

    #[tokio::test]
    async fn test_tender_and_discount_rules() {
        let (db, product_id) = setup(10).await;

        let mut short = sale(&product_id, 3);
        short.tendered_cents = Some(1_000);
        assert!(matches!(
            db.sales().create(&short, None).await,
            Err(DbError::Core(CoreError::InsufficientTender { .. }))
        ));

        let mut discounted = sale(&product_id, 1);
        discounted.discount_cents = 491;
        assert!(matches!(
            db.sales().create(&discounted, None).await,
            Err(DbError::Core(CoreError::DiscountTooLarge { .. }))
        ));

        let mut card = sale(&product_id, 1);
        card.payment_method = PaymentMethod::Card;
        let detail = db.sales().create(&card, None).await.unwrap();
        assert_eq!(detail.sale.tendered_cents, None);
        assert_eq!(detail.sale.change_cents, 0);
    }

    #[tokio::test]
    async fn test_cancel_restores_stock() {
        let (db, product_id) = setup(10).await;
        let detail = db.sales().create(&sale(&product_id, 4), None).await.unwrap();

        db.sales().delete(&detail.sale.id, None).await.unwrap();

        let product = db.products().get_by_id(&product_id).await.unwrap().unwrap();
        assert_eq!(product.stock, 10);
        let movements = db.products().movements(&product_id).await.unwrap();
        assert_eq!(movements[0].reason, MovementReason::SaleCancelled);
        assert!(db.sales().get_by_id(&detail.sale.id).await.unwrap().is_none());
    }
}
