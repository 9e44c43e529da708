//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Key Operations
//! - Search on name, reference and barcode
//! - CRUD operations
//! - Stock changes routed through the stock ledger
//!
//! ## Stock Is Never Written Directly
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create  stock = 12        → INSERT stock 0, then  in/initial_stock 12  │
//! │  update  stock 12 → 9      → out/manual_adjustment 3                    │
//! │  update  stock 9 → 9       → no movement                                │
//! │                                                                         │
//! │  The product's history in mouvements_stock always sums to its stock.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use comptoir_core::ledger::StockDelta;
use comptoir_core::validation::{
    normalize_optional, validate_name, validate_price_cents, validate_reference,
    validate_search_query, validate_stock_level,
};
use comptoir_core::{MovementReason, Product, ProductInput, StockMovement};
use sqlx::SqlitePool;
use tracing::{debug, info};

use super::{like_pattern, new_id};
use crate::error::{DbError, DbResult};
use crate::ledger::apply_movement;

const PRODUCT_COLUMNS: &str = "id, category_id, reference, barcode, name, description, \
     purchase_price_cents, sale_price_cents, stock, min_stock, created_at, updated_at";

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = ProductRepository::new(pool);
///
/// let results = repo.list(Some("café"), None).await?;
/// let product = repo.get_by_id("uuid-here").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lists products by name.
    ///
    /// ## Arguments
    /// * `search` - Substring of the name, reference or barcode (case-insensitive)
    /// * `category_id` - Only products of this category
    pub async fn list(
        &self,
        search: Option<&str>,
        category_id: Option<&str>,
    ) -> DbResult<Vec<Product>> {
        let pattern = match search {
            Some(q) => {
                let q = validate_search_query(q)?;
                (!q.is_empty()).then(|| like_pattern(&q))
            }
            None => None,
        };

        debug!(search = ?pattern, category = ?category_id, "Listing products");

        let sql = format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM produits
            WHERE (?1 IS NULL
                   OR name LIKE ?1 ESCAPE '\'
                   OR reference LIKE ?1 ESCAPE '\'
                   OR barcode LIKE ?1 ESCAPE '\')
              AND (?2 IS NULL OR category_id = ?2)
            ORDER BY name
            "#
        );

        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(pattern)
            .bind(category_id)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = products.len(), "Products listed");
        Ok(products)
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM produits WHERE id = ?1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Gets a product by its shop reference.
    pub async fn get_by_reference(&self, reference: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM produits WHERE reference = ?1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(reference.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Creates a product. A positive initial stock is recorded as an
    /// `initial_stock` movement.
    pub async fn create(&self, input: &ProductInput, user_id: Option<&str>) -> DbResult<Product> {
        validate_input(input)?;

        let id = new_id();
        let now = Utc::now();
        let reference = input.reference.trim();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO produits (
                id, category_id, reference, barcode, name, description,
                purchase_price_cents, sale_price_cents, stock, min_stock,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, ?9, ?10, ?10)
            "#,
        )
        .bind(&id)
        .bind(normalize_optional(input.category_id.as_deref()))
        .bind(reference)
        .bind(normalize_optional(input.barcode.as_deref()))
        .bind(input.name.trim())
        .bind(normalize_optional(input.description.as_deref()))
        .bind(input.purchase_price_cents)
        .bind(input.sale_price_cents)
        .bind(input.min_stock)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| unique_reference(e, reference))?;

        if input.stock > 0 {
            apply_movement(
                &mut tx,
                &id,
                StockDelta::incoming(input.stock, MovementReason::InitialStock),
                None,
                user_id,
            )
            .await?;
        }

        tx.commit().await?;

        info!(id = %id, reference = %reference, stock = input.stock, "Product created");
        self.get_by_id(&id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", &id))
    }

    /// Updates a product. A different `stock` is applied as a
    /// `manual_adjustment` movement of the difference.
    pub async fn update(
        &self,
        id: &str,
        input: &ProductInput,
        user_id: Option<&str>,
    ) -> DbResult<Product> {
        validate_input(input)?;

        let reference = input.reference.trim();
        let mut tx = self.pool.begin().await?;

        let current: Option<i64> = sqlx::query_scalar("SELECT stock FROM produits WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let current = current.ok_or_else(|| DbError::not_found("Product", id))?;

        sqlx::query(
            r#"
            UPDATE produits SET
                category_id = ?1, reference = ?2, barcode = ?3, name = ?4, description = ?5,
                purchase_price_cents = ?6, sale_price_cents = ?7, min_stock = ?8, updated_at = ?9
            WHERE id = ?10
            "#,
        )
        .bind(normalize_optional(input.category_id.as_deref()))
        .bind(reference)
        .bind(normalize_optional(input.barcode.as_deref()))
        .bind(input.name.trim())
        .bind(normalize_optional(input.description.as_deref()))
        .bind(input.purchase_price_cents)
        .bind(input.sale_price_cents)
        .bind(input.min_stock)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| unique_reference(e, reference))?;

        if let Some(delta) =
            StockDelta::adjustment(current, input.stock, MovementReason::ManualAdjustment)
        {
            apply_movement(&mut tx, id, delta, None, user_id).await?;
        }

        tx.commit().await?;

        debug!(id = %id, "Product updated");
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Deletes a product that no sale or supply order refers to.
    ///
    /// Its movements and parcel returns go with it.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let references: i64 = sqlx::query_scalar(
            r#"
            SELECT (SELECT COUNT(*) FROM details_vente WHERE product_id = ?1)
                 + (SELECT COUNT(*) FROM details_approvisionnement WHERE product_id = ?1)
            "#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if references > 0 {
            return Err(DbError::conflict(
                "Product appears on sales or supply orders and cannot be deleted",
            ));
        }

        sqlx::query("DELETE FROM mouvements_stock WHERE product_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM retours WHERE product_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM produits WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        tx.commit().await?;
        info!(id = %id, "Product deleted");
        Ok(())
    }

    /// Products at or under their restocking threshold, emptiest first.
    pub async fn low_stock(&self) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM produits WHERE stock <= min_stock ORDER BY stock, name"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Stock history of one product, newest first.
    pub async fn movements(&self, product_id: &str) -> DbResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(
            r#"
            SELECT id, product_id, kind, quantity, reason, reference_id, stock_after, user_id, created_at
            FROM mouvements_stock
            WHERE product_id = ?1
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }
}

fn validate_input(input: &ProductInput) -> DbResult<()> {
    validate_reference(&input.reference)?;
    validate_name("name", &input.name)?;
    validate_price_cents(input.purchase_price_cents)?;
    validate_price_cents(input.sale_price_cents)?;
    validate_stock_level("stock", input.stock)?;
    validate_stock_level("min_stock", input.min_stock)?;
    Ok(())
}

/// Names the duplicated reference instead of the raw column.
fn unique_reference(err: sqlx::Error, reference: &str) -> DbError {
    match DbError::from(err) {
        DbError::UniqueViolation { .. } => DbError::duplicate("reference", reference),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use comptoir_core::MovementKind;

    fn input(reference: &str, stock: i64) -> ProductInput {
        ProductInput {
            category_id: None,
            reference: reference.to_string(),
            barcode: Some("3017620422003".to_string()),
            name: format!("Produit {reference}"),
            description: None,
            purchase_price_cents: 250,
            sale_price_cents: 490,
            stock,
            min_stock: 3,
        }
    }

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_records_initial_stock() {
        let db = db().await;
        let product = db.products().create(&input("CAFE-250", 12), None).await.unwrap();
        assert_eq!(product.stock, 12);

        let movements = db.products().movements(&product.id).await.unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].reason, MovementReason::InitialStock);
        assert_eq!(movements[0].stock_after, 12);
    }

    #[tokio::test]
    async fn test_create_without_stock_has_no_movement() {
        let db = db().await;
        let product = db.products().create(&input("CAFE-250", 0), None).await.unwrap();
        assert!(db.products().movements(&product.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_reference() {
        let db = db().await;
        db.products().create(&input("CAFE-250", 0), None).await.unwrap();

        let err = db.products().create(&input("CAFE-250", 0), None).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::UniqueViolation { ref field, ref value } if field == "reference" && value == "CAFE-250"
        ));
    }

    #[tokio::test]
    async fn test_update_adjusts_stock() {
        let db = db().await;
        let product = db.products().create(&input("CAFE-250", 12), None).await.unwrap();

        let updated = db
            .products()
            .update(&product.id, &input("CAFE-250", 9), Some("user-1"))
            .await
            .unwrap();
        assert_eq!(updated.stock, 9);

        let movements = db.products().movements(&product.id).await.unwrap();
        assert_eq!(movements.len(), 2);
        let adjustment = &movements[0];
        assert_eq!(adjustment.reason, MovementReason::ManualAdjustment);
        assert_eq!(adjustment.kind, MovementKind::Out);
        assert_eq!(adjustment.quantity, 3);
        assert_eq!(adjustment.user_id.as_deref(), Some("user-1"));

        // same stock, no new movement
        db.products().update(&product.id, &input("CAFE-250", 9), None).await.unwrap();
        assert_eq!(db.products().movements(&product.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_search_and_low_stock() {
        let db = db().await;
        db.products().create(&input("CAFE-250", 12), None).await.unwrap();
        db.products().create(&input("THE-VERT", 2), None).await.unwrap();

        let hits = db.products().list(Some("the"), None).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].reference, "THE-VERT");

        assert_eq!(db.products().list(Some("  "), None).await.unwrap().len(), 2);

        let low = db.products().low_stock().await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].reference, "THE-VERT");
    }

    #[tokio::test]
    async fn test_delete_unreferenced_product() {
        let db = db().await;
        let product = db.products().create(&input("CAFE-250", 5), None).await.unwrap();

        db.products().delete(&product.id).await.unwrap();
        assert!(db.products().get_by_id(&product.id).await.unwrap().is_none());
        assert!(db.products().movements(&product.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_input_rejected() {
        let db = db().await;
        let mut bad = input("CAFE 250", 0);
        assert!(matches!(
            db.products().create(&bad, None).await,
            Err(DbError::Core(_))
        ));

        bad = input("CAFE-250", -1);
        assert!(db.products().create(&bad, None).await.is_err());
    }
}
