//! # Supplier Repository
//!
//! Deleting a supplier deletes its supply orders one by one through
//! [`SupplyRepository::delete_in`], so received goods leave the stock again.

use chrono::Utc;
use comptoir_core::validation::{
    normalize_optional, validate_email, validate_name, validate_phone,
};
use comptoir_core::{Supplier, SupplierInput};
use sqlx::SqlitePool;
use tracing::{debug, info};

use super::new_id;
use super::supply::SupplyRepository;
use crate::error::{DbError, DbResult};

const SUPPLIER_COLUMNS: &str =
    "id, name, contact_name, email, phone, address, notes, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct SupplierRepository {
    pool: SqlitePool,
}

impl SupplierRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SupplierRepository { pool }
    }

    pub async fn list(&self) -> DbResult<Vec<Supplier>> {
        let sql = format!("SELECT {SUPPLIER_COLUMNS} FROM fournisseurs ORDER BY name");
        let suppliers = sqlx::query_as::<_, Supplier>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(suppliers)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Supplier>> {
        let sql = format!("SELECT {SUPPLIER_COLUMNS} FROM fournisseurs WHERE id = ?1");
        let supplier = sqlx::query_as::<_, Supplier>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(supplier)
    }

    pub async fn create(&self, input: &SupplierInput) -> DbResult<Supplier> {
        validate_input(input)?;

        let id = new_id();

        sqlx::query(
            r#"
            INSERT INTO fournisseurs (id, name, contact_name, email, phone, address, notes, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
            "#,
        )
        .bind(&id)
        .bind(input.name.trim())
        .bind(normalize_optional(input.contact_name.as_deref()))
        .bind(normalize_optional(input.email.as_deref()))
        .bind(normalize_optional(input.phone.as_deref()))
        .bind(normalize_optional(input.address.as_deref()))
        .bind(normalize_optional(input.notes.as_deref()))
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        info!(id = %id, name = %input.name.trim(), "Supplier created");
        self.get_by_id(&id)
            .await?
            .ok_or_else(|| DbError::not_found("Supplier", &id))
    }

    pub async fn update(&self, id: &str, input: &SupplierInput) -> DbResult<Supplier> {
        validate_input(input)?;

        let result = sqlx::query(
            r#"
            UPDATE fournisseurs SET
                name = ?1, contact_name = ?2, email = ?3, phone = ?4,
                address = ?5, notes = ?6, updated_at = ?7
            WHERE id = ?8
            "#,
        )
        .bind(input.name.trim())
        .bind(normalize_optional(input.contact_name.as_deref()))
        .bind(normalize_optional(input.email.as_deref()))
        .bind(normalize_optional(input.phone.as_deref()))
        .bind(normalize_optional(input.address.as_deref()))
        .bind(normalize_optional(input.notes.as_deref()))
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Supplier", id));
        }

        debug!(id = %id, "Supplier updated");
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Supplier", id))
    }

    /// Deletes a supplier and all of its supply orders.
    ///
    /// ## Returns
    /// The number of supply orders removed with it.
    pub async fn delete(&self, id: &str, user_id: Option<&str>) -> DbResult<usize> {
        let mut tx = self.pool.begin().await?;

        let order_ids: Vec<String> =
            sqlx::query_scalar("SELECT id FROM approvisionnements WHERE supplier_id = ?1")
                .bind(id)
                .fetch_all(&mut *tx)
                .await?;

        for order_id in &order_ids {
            SupplyRepository::delete_in(&mut tx, order_id, user_id).await?;
        }

        let result = sqlx::query("DELETE FROM fournisseurs WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Supplier", id));
        }

        tx.commit().await?;
        info!(id = %id, orders = order_ids.len(), "Supplier deleted");
        Ok(order_ids.len())
    }
}

fn validate_input(input: &SupplierInput) -> DbResult<()> {
    validate_name("name", &input.name)?;
    if let Some(email) = normalize_optional(input.email.as_deref()) {
        validate_email(&email)?;
    }
    if let Some(phone) = normalize_optional(input.phone.as_deref()) {
        validate_phone(&phone)?;
    }
    Ok(())
}
