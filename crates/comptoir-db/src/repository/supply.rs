//! # Supply Order Repository
//!
//! Purchases from suppliers (approvisionnements), their lines and the
//! payments made against them.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   create ──────────► pending ───── mark_received ─────► received        │
//! │     │  (received=true) ─────────────────────────────────►  │            │
//! │     │                                                      │            │
//! │     │                        stock += line quantities ◄────┘            │
//! │     │                                                                   │
//! │   payments:  unpaid ──add_payment──► partial ──add_payment──► paid      │
//! │              ◄───────────delete_payment────────────                     │
//! │                                                                         │
//! │   delete:  received? stock -= line quantities (supply_cancelled)        │
//! │            then payments, lines and the order are removed               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use comptoir_core::ledger::{check_initial_payment, check_payment, payment_status, StockDelta};
use comptoir_core::validation::{
    line_total, normalize_optional, sum_line_totals, validate_name, validate_price_cents,
    validate_quantity,
};
use comptoir_core::{
    CoreError, Money, MovementReason, NewSupplierPayment, NewSupplyOrder, PaymentMethod,
    ReceptionStatus, SupplierPayment, SupplyOrder, SupplyOrderDetail, SupplyOrderLine,
    SupplyOrderUpdate, MAX_LINES,
};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use super::new_id;
use crate::error::{DbError, DbResult};
use crate::ledger::apply_movement;

const ORDER_COLUMNS: &str = "id, supplier_id, reference, ordered_at, total_cents, paid_cents, \
     payment_status, reception_status, received_at, notes, created_by, created_at, updated_at";

const DOCUMENT: &str = "Supply order";

#[derive(Debug, Clone)]
pub struct SupplyRepository {
    pool: SqlitePool,
}

impl SupplyRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SupplyRepository { pool }
    }

    /// Supply orders, newest first, optionally for one supplier.
    pub async fn list(&self, supplier_id: Option<&str>) -> DbResult<Vec<SupplyOrder>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM approvisionnements \
             WHERE ?1 IS NULL OR supplier_id = ?1 \
             ORDER BY ordered_at DESC, created_at DESC"
        );
        let orders = sqlx::query_as::<_, SupplyOrder>(&sql)
            .bind(supplier_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(orders)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<SupplyOrder>> {
        let mut conn = self.pool.acquire().await?;
        find_order(&mut conn, id).await
    }

    /// The order with its lines and payments.
    pub async fn get_detail(&self, id: &str) -> DbResult<Option<SupplyOrderDetail>> {
        let mut conn = self.pool.acquire().await?;

        let Some(order) = find_order(&mut conn, id).await? else {
            return Ok(None);
        };

        let lines = fetch_lines(&mut conn, id).await?;

        let payments = sqlx::query_as::<_, SupplierPayment>(
            r#"
            SELECT id, supply_order_id, amount_cents, method, paid_at, notes
            FROM paiements_fournisseurs
            WHERE supply_order_id = ?1
            ORDER BY paid_at
            "#,
        )
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(Some(SupplyOrderDetail {
            remaining_cents: order.remaining().cents(),
            order,
            lines,
            payments,
        }))
    }

    /// Records a supply order.
    ///
    /// ## What This Does
    /// 1. Totals the lines (quantity × unit cost)
    /// 2. Checks the up-front payment lies within `0..=total`
    /// 3. Inserts the order with its payment status, the lines, and the
    ///    up-front payment if any
    /// 4. If the goods arrived with the order, stocks every line
    pub async fn create(
        &self,
        input: &NewSupplyOrder,
        user_id: Option<&str>,
    ) -> DbResult<SupplyOrderDetail> {
        validate_name("reference", &input.reference)?;
        check_line_count(input.lines.len())?;
        for line in &input.lines {
            validate_quantity(line.quantity)?;
            validate_price_cents(line.unit_cost_cents)?;
        }

        let line_totals = input
            .lines
            .iter()
            .map(|l| line_total(l.unit_cost_cents, l.quantity))
            .collect::<Result<Vec<Money>, _>>()?;
        let total = sum_line_totals(line_totals.iter().copied())?;
        let paid = Money::from_cents(input.paid_cents);
        check_initial_payment(total, paid)?;

        let id = new_id();
        let now = Utc::now();
        let ordered_at = input.ordered_at.unwrap_or(now);
        let reception = if input.received {
            ReceptionStatus::Received
        } else {
            ReceptionStatus::Pending
        };

        let mut tx = self.pool.begin().await?;

        let supplier: Option<String> =
            sqlx::query_scalar("SELECT id FROM fournisseurs WHERE id = ?1")
                .bind(&input.supplier_id)
                .fetch_optional(&mut *tx)
                .await?;
        if supplier.is_none() {
            return Err(DbError::not_found("Supplier", &input.supplier_id));
        }

        sqlx::query(
            r#"
            INSERT INTO approvisionnements (
                id, supplier_id, reference, ordered_at, total_cents, paid_cents,
                payment_status, reception_status, received_at, notes, created_by,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)
            "#,
        )
        .bind(&id)
        .bind(&input.supplier_id)
        .bind(input.reference.trim())
        .bind(ordered_at)
        .bind(total.cents())
        .bind(paid.cents())
        .bind(payment_status(total, paid))
        .bind(reception)
        .bind(input.received.then_some(now))
        .bind(normalize_optional(input.notes.as_deref()))
        .bind(user_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        for (line, amount) in input.lines.iter().zip(&line_totals) {
            let exists: Option<String> =
                sqlx::query_scalar("SELECT id FROM produits WHERE id = ?1")
                    .bind(&line.product_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            if exists.is_none() {
                return Err(DbError::not_found("Product", &line.product_id));
            }

            sqlx::query(
                r#"
                INSERT INTO details_approvisionnement
                    (id, supply_order_id, product_id, quantity, unit_cost_cents, line_total_cents)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(new_id())
            .bind(&id)
            .bind(&line.product_id)
            .bind(line.quantity)
            .bind(line.unit_cost_cents)
            .bind(amount.cents())
            .execute(&mut *tx)
            .await?;
        }

        if paid.is_positive() {
            insert_payment(
                &mut tx,
                &id,
                paid,
                input.payment_method.unwrap_or(PaymentMethod::Cash),
                Some("Paiement à la commande"),
            )
            .await?;
        }

        if input.received {
            receive_lines(&mut tx, &id, user_id).await?;
        }

        tx.commit().await?;

        info!(
            id = %id,
            total = %total,
            paid = %paid,
            received = input.received,
            "Supply order created"
        );

        self.get_detail(&id)
            .await?
            .ok_or_else(|| DbError::not_found(DOCUMENT, &id))
    }

    /// Updates the header of an order. Lines and amounts are not editable.
    pub async fn update(&self, id: &str, input: &SupplyOrderUpdate) -> DbResult<SupplyOrder> {
        validate_name("reference", &input.reference)?;

        let result = sqlx::query(
            r#"
            UPDATE approvisionnements SET
                supplier_id = ?1, reference = ?2, ordered_at = ?3, notes = ?4, updated_at = ?5
            WHERE id = ?6
            "#,
        )
        .bind(&input.supplier_id)
        .bind(input.reference.trim())
        .bind(input.ordered_at)
        .bind(normalize_optional(input.notes.as_deref()))
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(DOCUMENT, id));
        }

        debug!(id = %id, "Supply order updated");
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found(DOCUMENT, id))
    }

    /// Records a payment to the supplier and recomputes the status.
    ///
    /// ## Errors
    /// `CoreError::Overpayment` when the payment exceeds what is still owed.
    pub async fn add_payment(
        &self,
        id: &str,
        input: &NewSupplierPayment,
    ) -> DbResult<SupplyOrder> {
        let mut tx = self.pool.begin().await?;

        let order = find_order(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::not_found(DOCUMENT, id))?;

        let amount = Money::from_cents(input.amount_cents);
        check_payment(order.total(), order.paid(), amount)?;

        insert_payment(
            &mut tx,
            id,
            amount,
            input.method,
            normalize_optional(input.notes.as_deref()).as_deref(),
        )
        .await?;
        set_paid(&mut tx, &order, order.paid() + amount).await?;

        tx.commit().await?;

        info!(id = %id, amount = %amount, "Supplier payment recorded");
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found(DOCUMENT, id))
    }

    /// Removes a payment and recomputes the status.
    pub async fn delete_payment(&self, id: &str, payment_id: &str) -> DbResult<SupplyOrder> {
        let mut tx = self.pool.begin().await?;

        let order = find_order(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::not_found(DOCUMENT, id))?;

        let amount: Option<i64> = sqlx::query_scalar(
            "SELECT amount_cents FROM paiements_fournisseurs WHERE id = ?1 AND supply_order_id = ?2",
        )
        .bind(payment_id)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let amount = amount
            .map(Money::from_cents)
            .ok_or_else(|| DbError::not_found("Payment", payment_id))?;

        sqlx::query("DELETE FROM paiements_fournisseurs WHERE id = ?1")
            .bind(payment_id)
            .execute(&mut *tx)
            .await?;
        set_paid(&mut tx, &order, (order.paid() - amount).non_negative()).await?;

        tx.commit().await?;

        info!(id = %id, payment = %payment_id, amount = %amount, "Supplier payment deleted");
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found(DOCUMENT, id))
    }

    /// Marks a pending order as received and stocks its lines.
    ///
    /// ## Errors
    /// `DbError::Conflict` if the order was already received.
    pub async fn mark_received(&self, id: &str, user_id: Option<&str>) -> DbResult<SupplyOrder> {
        let mut tx = self.pool.begin().await?;

        let order = find_order(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::not_found(DOCUMENT, id))?;

        if order.is_received() {
            return Err(DbError::conflict(
                CoreError::AlreadyReceived(order.reference).to_string(),
            ));
        }

        let now = Utc::now();
        sqlx::query(
            "UPDATE approvisionnements SET reception_status = ?1, received_at = ?2, updated_at = ?2 WHERE id = ?3",
        )
        .bind(ReceptionStatus::Received)
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        receive_lines(&mut tx, id, user_id).await?;

        tx.commit().await?;

        info!(id = %id, "Supply order received");
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found(DOCUMENT, id))
    }

    /// Deletes an order. Received goods are taken back out of stock.
    pub async fn delete(&self, id: &str, user_id: Option<&str>) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        Self::delete_in(&mut tx, id, user_id).await?;
        tx.commit().await?;

        info!(id = %id, "Supply order deleted");
        Ok(())
    }

    /// Delete routine shared with supplier deletion; runs on the caller's
    /// transaction.
    pub(crate) async fn delete_in(
        conn: &mut SqliteConnection,
        id: &str,
        user_id: Option<&str>,
    ) -> DbResult<()> {
        let order = find_order(conn, id)
            .await?
            .ok_or_else(|| DbError::not_found(DOCUMENT, id))?;

        if order.is_received() {
            for line in fetch_lines(conn, id).await? {
                apply_movement(
                    conn,
                    &line.product_id,
                    StockDelta::outgoing(line.quantity, MovementReason::SupplyCancelled),
                    Some(id),
                    user_id,
                )
                .await?;
            }
        }

        sqlx::query("DELETE FROM paiements_fournisseurs WHERE supply_order_id = ?1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        sqlx::query("DELETE FROM details_approvisionnement WHERE supply_order_id = ?1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        sqlx::query("DELETE FROM approvisionnements WHERE id = ?1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        debug!(id = %id, received = order.is_received(), "Supply order removed");
        Ok(())
    }
}

// =============================================================================
// Helpers (run on the caller's connection)
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

async fn find_order(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<SupplyOrder>> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM approvisionnements WHERE id = ?1");
    let order = sqlx::query_as::<_, SupplyOrder>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(order)
}

async fn fetch_lines(conn: &mut SqliteConnection, id: &str) -> DbResult<Vec<SupplyOrderLine>> {
    let lines = sqlx::query_as::<_, SupplyOrderLine>(
        r#"
        SELECT id, supply_order_id, product_id, quantity, unit_cost_cents, line_total_cents
        FROM details_approvisionnement
        WHERE supply_order_id = ?1
        ORDER BY rowid
        "#,
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(lines)
}

async fn receive_lines(conn: &mut SqliteConnection, id: &str, user_id: Option<&str>) -> DbResult<()> {
    for line in fetch_lines(conn, id).await? {
        apply_movement(
            conn,
            &line.product_id,
            StockDelta::incoming(line.quantity, MovementReason::SupplyReceived),
            Some(id),
            user_id,
        )
        .await?;

        // last purchase cost becomes the product's purchase price
        sqlx::query("UPDATE produits SET purchase_price_cents = ?1 WHERE id = ?2")
            .bind(line.unit_cost_cents)
            .bind(&line.product_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

async fn insert_payment(
    conn: &mut SqliteConnection,
    order_id: &str,
    amount: Money,
    method: PaymentMethod,
    notes: Option<&str>,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO paiements_fournisseurs (id, supply_order_id, amount_cents, method, paid_at, notes)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(new_id())
    .bind(order_id)
    .bind(amount.cents())
    .bind(method)
    .bind(Utc::now())
    .bind(notes)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn set_paid(conn: &mut SqliteConnection, order: &SupplyOrder, paid: Money) -> DbResult<()> {
    let status = payment_status(order.total(), paid);
    if paid > order.total() {
        warn!(id = %order.id, paid = %paid, total = %order.total(), "Supply order overpaid");
    }

    sqlx::query(
        "UPDATE approvisionnements SET paid_cents = ?1, payment_status = ?2, updated_at = ?3 WHERE id = ?4",
    )
    .bind(paid.cents())
    .bind(status)
    .bind(Utc::now())
    .bind(&order.id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use comptoir_core::{
        PaymentStatus, ProductInput, SupplierInput, SupplyLineInput, ValidationError,
    };

    struct Fixture {
        db: Database,
        supplier_id: String,
        product_id: String,
    }

    async fn fixture() -> Fixture {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let supplier = db
            .suppliers()
            .create(&SupplierInput {
                name: "Torréfaction Dupont".to_string(),
                contact_name: None,
                email: None,
                phone: None,
                address: None,
                notes: None,
            })
            .await
            .unwrap();
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
                    stock: 0,
                    min_stock: 0,
                },
                None,
            )
            .await
            .unwrap();

        Fixture {
            db,
            supplier_id: supplier.id,
            product_id: product.id,
        }
    }

    fn order(f: &Fixture, quantity: i64, paid_cents: i64, received: bool) -> NewSupplyOrder {
        NewSupplyOrder {
            supplier_id: f.supplier_id.clone(),
            reference: "BL-2024-001".to_string(),
            ordered_at: None,
            lines: vec![SupplyLineInput {
                product_id: f.product_id.clone(),
                quantity,
                unit_cost_cents: 300,
            }],
            paid_cents,
            payment_method: Some(PaymentMethod::Transfer),
            received,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_fully_paid_on_creation() {
        let f = fixture().await;
        let detail = f.db.supplies().create(&order(&f, 10, 3_000, false), None).await.unwrap();

        assert_eq!(detail.order.total_cents, 3_000);
        assert_eq!(detail.order.payment_status, PaymentStatus::Paid);
        assert_eq!(detail.remaining_cents, 0);
        assert_eq!(detail.payments.len(), 1);
        assert_eq!(detail.payments[0].method, PaymentMethod::Transfer);
    }

    #[tokio::test]
    async fn test_initial_payment_above_total_rejected() {
        let f = fixture().await;
        let err = f.db.supplies().create(&order(&f, 10, 3_001, false), None).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::InvalidPaidAmount { .. })));
        assert!(f.db.supplies().list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_oversized_cost_rejected() {
        let f = fixture().await;
        let mut input = order(&f, 9_999, 0, true);
        input.lines[0].unit_cost_cents = i64::MAX / 1000;

        let err = f.db.supplies().create(&input, None).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
        assert!(f.db.supplies().list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_payments_move_status() {
        let f = fixture().await;
        let detail = f.db.supplies().create(&order(&f, 10, 0, false), None).await.unwrap();
        assert_eq!(detail.order.payment_status, PaymentStatus::Unpaid);
        let id = detail.order.id;

        let pay = |amount_cents| NewSupplierPayment {
            amount_cents,
            method: PaymentMethod::Cheque,
            notes: None,
        };

        let partial = f.db.supplies().add_payment(&id, &pay(1_000)).await.unwrap();
        assert_eq!(partial.payment_status, PaymentStatus::Partial);

        let err = f.db.supplies().add_payment(&id, &pay(2_001)).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::Overpayment { .. })));

        let paid = f.db.supplies().add_payment(&id, &pay(2_000)).await.unwrap();
        assert_eq!(paid.payment_status, PaymentStatus::Paid);

        let detail = f.db.supplies().get_detail(&id).await.unwrap().unwrap();
        let first = detail.payments[0].id.clone();
        let back = f.db.supplies().delete_payment(&id, &first).await.unwrap();
        assert_eq!(back.paid_cents, 2_000);
        assert_eq!(back.payment_status, PaymentStatus::Partial);
    }

    #[tokio::test]
    async fn test_receive_stocks_lines_once() {
        let f = fixture().await;
        let detail = f.db.supplies().create(&order(&f, 10, 0, false), None).await.unwrap();
        let id = detail.order.id;

        let product = f.db.products().get_by_id(&f.product_id).await.unwrap().unwrap();
        assert_eq!(product.stock, 0);

        let received = f.db.supplies().mark_received(&id, None).await.unwrap();
        assert!(received.is_received());
        assert!(received.received_at.is_some());

        let product = f.db.products().get_by_id(&f.product_id).await.unwrap().unwrap();
        assert_eq!(product.stock, 10);
        assert_eq!(product.purchase_price_cents, 300);

        let err = f.db.supplies().mark_received(&id, None).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_delete_received_order_reverses_stock() {
        let f = fixture().await;
        let detail = f.db.supplies().create(&order(&f, 7, 500, true), None).await.unwrap();

        let product = f.db.products().get_by_id(&f.product_id).await.unwrap().unwrap();
        assert_eq!(product.stock, 7);

        f.db.supplies().delete(&detail.order.id, None).await.unwrap();

        let product = f.db.products().get_by_id(&f.product_id).await.unwrap().unwrap();
        assert_eq!(product.stock, 0);

        let movements = f.db.products().movements(&f.product_id).await.unwrap();
        assert_eq!(movements[0].reason, MovementReason::SupplyCancelled);
        assert_eq!(movements[0].quantity, 7);
        assert!(f.db.supplies().get_by_id(&detail.order.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_order_rejected() {
        let f = fixture().await;
        let mut input = order(&f, 1, 0, false);
        input.lines.clear();
        let err = f.db.supplies().create(&input, None).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::EmptyDocument { .. })));
    }
}
