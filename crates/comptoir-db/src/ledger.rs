//! # Stock Ledger
//!
//! The one place where `produits.stock` is written.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  apply_movement(&mut tx, product, delta, reference, user)               │
//! │                                                                         │
//! │   SELECT reference, stock FROM produits          current = 10           │
//! │        │                                                                │
//! │        ▼                                                                │
//! │   StockDelta::apply  ── below zero? ──► Err(NegativeStock)  (rollback)  │
//! │        │                                                                │
//! │        ▼                                                                │
//! │   UPDATE produits SET stock = 6                                         │
//! │   INSERT mouvements_stock (kind=out, qty=4, stock_after=6)              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Runs on the caller's connection so the record, the counter and the
//! movement row commit or roll back together.

use chrono::Utc;
use comptoir_core::ledger::StockDelta;
use comptoir_core::StockMovement;
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::new_id;

/// Applies `delta` to a product and appends the matching movement row.
pub async fn apply_movement(
    conn: &mut SqliteConnection,
    product_id: &str,
    delta: StockDelta,
    reference_id: Option<&str>,
    user_id: Option<&str>,
) -> DbResult<StockMovement> {
    let row: Option<(String, i64)> =
        sqlx::query_as("SELECT reference, stock FROM produits WHERE id = ?1")
            .bind(product_id)
            .fetch_optional(&mut *conn)
            .await?;

    let (reference, current) = row.ok_or_else(|| DbError::not_found("Product", product_id))?;
    let stock_after = delta.apply(&reference, current)?;
    let now = Utc::now();

    sqlx::query("UPDATE produits SET stock = ?1, updated_at = ?2 WHERE id = ?3")
        .bind(stock_after)
        .bind(now)
        .bind(product_id)
        .execute(&mut *conn)
        .await?;

    let movement = StockMovement {
        id: new_id(),
        product_id: product_id.to_string(),
        kind: delta.kind,
        quantity: delta.quantity,
        reason: delta.reason,
        reference_id: reference_id.map(str::to_string),
        stock_after,
        user_id: user_id.map(str::to_string),
        created_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO mouvements_stock
            (id, product_id, kind, quantity, reason, reference_id, stock_after, user_id, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&movement.id)
    .bind(&movement.product_id)
    .bind(movement.kind)
    .bind(movement.quantity)
    .bind(movement.reason)
    .bind(&movement.reference_id)
    .bind(movement.stock_after)
    .bind(&movement.user_id)
    .bind(movement.created_at)
    .execute(&mut *conn)
    .await?;

    debug!(
        product = %reference,
        delta = delta.signed(),
        stock_after,
        reason = ?delta.reason,
        "Stock movement applied"
    );

    Ok(movement)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use comptoir_core::{CoreError, MovementKind, MovementReason, ProductInput};

    async fn setup() -> (Database, String) {
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
                    stock: 10,
                    min_stock: 2,
                },
                None,
            )
            .await
            .unwrap();
        (db, product.id)
    }

    #[tokio::test]
    async fn test_movement_records_stock_after() {
        let (db, product_id) = setup().await;
        let mut tx = db.pool().begin().await.unwrap();

        let movement = apply_movement(
            &mut tx,
            &product_id,
            StockDelta::outgoing(4, MovementReason::Sale),
            Some("sale-1"),
            None,
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(movement.kind, MovementKind::Out);
        assert_eq!(movement.stock_after, 6);

        let product = db.products().get_by_id(&product_id).await.unwrap().unwrap();
        assert_eq!(product.stock, 6);
    }

    #[tokio::test]
    async fn test_negative_stock_rolls_back() {
        let (db, product_id) = setup().await;

        {
            let mut tx = db.pool().begin().await.unwrap();
            let err = apply_movement(
                &mut tx,
                &product_id,
                StockDelta::outgoing(11, MovementReason::Sale),
                None,
                None,
            )
            .await
            .unwrap_err();
            assert!(matches!(err, DbError::Core(CoreError::NegativeStock { .. })));
        }

        let product = db.products().get_by_id(&product_id).await.unwrap().unwrap();
        assert_eq!(product.stock, 10);
        // only the initial_stock movement exists
        assert_eq!(db.products().movements(&product_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_product() {
        let (db, _) = setup().await;
        let mut tx = db.pool().begin().await.unwrap();

        let err = apply_movement(
            &mut tx,
            "missing",
            StockDelta::incoming(1, MovementReason::ManualAdjustment),
            None,
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
