//! # Parcel Return Repository
//!
//! Goods sent back by customers through Colissimo (retours). A restocked
//! return puts the goods back on the shelf; deleting it takes them out again.

use chrono::Utc;
use comptoir_core::ledger::StockDelta;
use comptoir_core::validation::{normalize_optional, validate_quantity, validate_tracking_number};
use comptoir_core::{CoreError, MovementReason, NewParcelReturn, ParcelReturn};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

use super::new_id;
use crate::error::{DbError, DbResult};
use crate::ledger::apply_movement;

const RETURN_COLUMNS: &str =
    "id, tracking_number, product_id, sale_id, quantity, reason, restocked, created_by, created_at";

#[derive(Debug, Clone)]
pub struct ReturnRepository {
    pool: SqlitePool,
}

impl ReturnRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReturnRepository { pool }
    }

    /// All returns, newest first.
    pub async fn list(&self) -> DbResult<Vec<ParcelReturn>> {
        let sql = format!("SELECT {RETURN_COLUMNS} FROM retours ORDER BY created_at DESC");
        let returns = sqlx::query_as::<_, ParcelReturn>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(returns)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<ParcelReturn>> {
        let sql = format!("SELECT {RETURN_COLUMNS} FROM retours WHERE id = ?1");
        let parcel_return = sqlx::query_as::<_, ParcelReturn>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(parcel_return)
    }

    /// Distinct tracking numbers known locally, most recent first.
    pub async fn tracking_numbers(&self) -> DbResult<Vec<String>> {
        let numbers = sqlx::query_scalar(
            r#"
            SELECT tracking_number
            FROM retours
            GROUP BY tracking_number
            ORDER BY MAX(created_at) DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(numbers)
    }

    pub async fn create(
        &self,
        input: &NewParcelReturn,
        user_id: Option<&str>,
    ) -> DbResult<ParcelReturn> {
        let tracking_number = validate_tracking_number(&input.tracking_number)?;
        validate_quantity(input.quantity)?;

        let id = new_id();
        let mut tx = self.pool.begin().await?;

        let parcel_return = ParcelReturn {
            id: id.clone(),
            tracking_number,
            product_id: input.product_id.clone(),
            sale_id: input.sale_id.clone(),
            quantity: input.quantity,
            reason: normalize_optional(input.reason.as_deref()),
            restocked: input.restock,
            created_by: user_id.map(str::to_string),
            created_at: Utc::now(),
        };

        let product: Option<String> = sqlx::query_scalar("SELECT id FROM produits WHERE id = ?1")
            .bind(&input.product_id)
            .fetch_optional(&mut *tx)
            .await?;
        if product.is_none() {
            return Err(DbError::not_found("Product", &input.product_id));
        }

        if let Some(sale_id) = &input.sale_id {
            check_against_sale(&mut tx, sale_id, &input.product_id, input.quantity).await?;
        }

        sqlx::query(
            r#"
            INSERT INTO retours (id, tracking_number, product_id, sale_id, quantity, reason, restocked, created_by, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&parcel_return.id)
        .bind(&parcel_return.tracking_number)
        .bind(&parcel_return.product_id)
        .bind(&parcel_return.sale_id)
        .bind(parcel_return.quantity)
        .bind(&parcel_return.reason)
        .bind(parcel_return.restocked)
        .bind(&parcel_return.created_by)
        .bind(parcel_return.created_at)
        .execute(&mut *tx)
        .await?;

        if parcel_return.restocked {
            apply_movement(
                &mut tx,
                &parcel_return.product_id,
                StockDelta::incoming(parcel_return.quantity, MovementReason::ParcelReturn),
                Some(&id),
                user_id,
            )
            .await?;
        }

        tx.commit().await?;

        info!(
            id = %id,
            tracking = %parcel_return.tracking_number,
            restocked = parcel_return.restocked,
            "Parcel return recorded"
        );
        Ok(parcel_return)
    }

    /// Deletes a return; restocked goods leave the shelf again.
    pub async fn delete(&self, id: &str, user_id: Option<&str>) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let sql = format!("SELECT {RETURN_COLUMNS} FROM retours WHERE id = ?1");
        let parcel_return = sqlx::query_as::<_, ParcelReturn>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DbError::not_found("Return", id))?;

        if parcel_return.restocked {
            apply_movement(
                &mut tx,
                &parcel_return.product_id,
                StockDelta::outgoing(parcel_return.quantity, MovementReason::ParcelReturnCancelled),
                Some(id),
                user_id,
            )
            .await?;
        }

        sqlx::query("DELETE FROM retours WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        info!(id = %id, "Parcel return deleted");
        Ok(())
    }
}

/// A return linked to a sale must be for a product of that sale, and all
/// returns of that product together cannot exceed the quantity sold.
async fn check_against_sale(
    conn: &mut SqliteConnection,
    sale_id: &str,
    product_id: &str,
    quantity: i64,
) -> DbResult<()> {
    let exists: Option<String> = sqlx::query_scalar("SELECT id FROM ventes WHERE id = ?1")
        .bind(sale_id)
        .fetch_optional(&mut *conn)
        .await?;
    if exists.is_none() {
        return Err(DbError::not_found("Sale", sale_id));
    }

    let (sold, returned): (i64, i64) = sqlx::query_as(
        r#"
        SELECT
            (SELECT COALESCE(SUM(quantity), 0) FROM details_vente WHERE sale_id = ?1 AND product_id = ?2),
            (SELECT COALESCE(SUM(quantity), 0) FROM retours WHERE sale_id = ?1 AND product_id = ?2)
        "#,
    )
    .bind(sale_id)
    .bind(product_id)
    .fetch_one(&mut *conn)
    .await?;

    if returned + quantity > sold {
        return Err(CoreError::ReturnExceedsSale {
            sale_id: sale_id.to_string(),
            product_id: product_id.to_string(),
            sold,
            returned,
            requested: quantity,
        }
        .into());
    }

    Ok(())
}
