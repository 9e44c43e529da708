//! # Colissimo Credential Repository
//!
//! Stores Colissimo accounts. Only the encrypted password ever reaches the
//! database; encryption happens in `comptoir-parcel` before calling in here.

use chrono::Utc;
use comptoir_core::validation::validate_name;
use comptoir_core::{ParcelCredential, ValidationError};
use sqlx::SqlitePool;
use tracing::info;

use super::new_id;
use crate::error::{DbError, DbResult};

const CREDENTIAL_COLUMNS: &str =
    "id, label, contract_number, encrypted_password, is_active, created_at, updated_at";

/// Credential fields with the password already encrypted.
#[derive(Debug, Clone)]
pub struct CredentialRecord {
    pub label: String,
    pub contract_number: String,
    /// `None` on update keeps the stored password.
    pub encrypted_password: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone)]
pub struct CredentialRepository {
    pool: SqlitePool,
}

impl CredentialRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CredentialRepository { pool }
    }

    pub async fn list(&self) -> DbResult<Vec<ParcelCredential>> {
        let sql = format!("SELECT {CREDENTIAL_COLUMNS} FROM colissimo_credentials ORDER BY label");
        let credentials = sqlx::query_as::<_, ParcelCredential>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(credentials)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<ParcelCredential>> {
        let sql = format!("SELECT {CREDENTIAL_COLUMNS} FROM colissimo_credentials WHERE id = ?1");
        let credential = sqlx::query_as::<_, ParcelCredential>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(credential)
    }

    /// The account used for tracking: the most recently updated active one.
    pub async fn get_active(&self) -> DbResult<Option<ParcelCredential>> {
        let sql = format!(
            "SELECT {CREDENTIAL_COLUMNS} FROM colissimo_credentials \
             WHERE is_active = 1 ORDER BY updated_at DESC LIMIT 1"
        );
        let credential = sqlx::query_as::<_, ParcelCredential>(&sql)
            .fetch_optional(&self.pool)
            .await?;
        Ok(credential)
    }

    pub async fn create(&self, record: &CredentialRecord) -> DbResult<ParcelCredential> {
        validate_record(record)?;
        let encrypted = record
            .encrypted_password
            .as_deref()
            .ok_or_else(|| ValidationError::required("password"))?;

        let id = new_id();

        sqlx::query(
            r#"
            INSERT INTO colissimo_credentials
                (id, label, contract_number, encrypted_password, is_active, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            "#,
        )
        .bind(&id)
        .bind(record.label.trim())
        .bind(record.contract_number.trim())
        .bind(encrypted)
        .bind(record.is_active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        info!(id = %id, label = %record.label.trim(), "Colissimo credential created");
        self.get_by_id(&id)
            .await?
            .ok_or_else(|| DbError::not_found("Credential", &id))
    }

    pub async fn update(&self, id: &str, record: &CredentialRecord) -> DbResult<ParcelCredential> {
        validate_record(record)?;

        let result = sqlx::query(
            r#"
            UPDATE colissimo_credentials SET
                label = ?1, contract_number = ?2,
                encrypted_password = COALESCE(?3, encrypted_password),
                is_active = ?4, updated_at = ?5
            WHERE id = ?6
            "#,
        )
        .bind(record.label.trim())
        .bind(record.contract_number.trim())
        .bind(record.encrypted_password.as_deref())
        .bind(record.is_active)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Credential", id));
        }

        info!(id = %id, "Colissimo credential updated");
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Credential", id))
    }

    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM colissimo_credentials WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Credential", id));
        }

        info!(id = %id, "Colissimo credential deleted");
        Ok(())
    }
}

fn validate_record(record: &CredentialRecord) -> DbResult<()> {
    validate_name("label", &record.label)?;
    validate_name("contract_number", &record.contract_number)?;
    if !record.contract_number.trim().chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::invalid("contract_number", "must contain only digits").into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    fn record(label: &str, active: bool) -> CredentialRecord {
        CredentialRecord {
            label: label.to_string(),
            contract_number: "123456".to_string(),
            encrypted_password: Some("c2VjcmV0".to_string()),
            is_active: active,
        }
    }

    #[tokio::test]
    async fn test_active_credential() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.credentials();

        assert!(repo.get_active().await.unwrap().is_none());

        repo.create(&record("Ancien compte", false)).await.unwrap();
        let current = repo.create(&record("Boutique", true)).await.unwrap();

        let active = repo.get_active().await.unwrap().unwrap();
        assert_eq!(active.id, current.id);
    }

    #[tokio::test]
    async fn test_update_keeps_password_when_absent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.credentials();
        let created = repo.create(&record("Boutique", true)).await.unwrap();

        let mut change = record("Boutique Paris", true);
        change.encrypted_password = None;
        let updated = repo.update(&created.id, &change).await.unwrap();

        assert_eq!(updated.label, "Boutique Paris");
        assert_eq!(updated.encrypted_password, "c2VjcmV0");
    }

    #[tokio::test]
    async fn test_contract_number_digits_only() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut bad = record("Boutique", true);
        bad.contract_number = "12AB".to_string();
        assert!(matches!(
            db.credentials().create(&bad).await,
            Err(DbError::Core(_))
        ));
    }
}
