//! # Client Repository

use chrono::Utc;
use comptoir_core::validation::{
    normalize_optional, validate_email, validate_name, validate_phone, validate_search_query,
};
use comptoir_core::{Client, ClientInput, Sale};
use sqlx::SqlitePool;
use tracing::{debug, info};

use super::{like_pattern, new_id};
use crate::error::{DbError, DbResult};
use crate::repository::sale::SALE_COLUMNS;

const CLIENT_COLUMNS: &str =
    "id, first_name, last_name, email, phone, address, notes, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct ClientRepository {
    pool: SqlitePool,
}

impl ClientRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ClientRepository { pool }
    }

    /// Clients by last name, optionally filtered on name, e-mail or phone.
    pub async fn list(&self, search: Option<&str>) -> DbResult<Vec<Client>> {
        let pattern = match search {
            Some(q) => {
                let q = validate_search_query(q)?;
                (!q.is_empty()).then(|| like_pattern(&q))
            }
            None => None,
        };

        let sql = format!(
            r#"
            SELECT {CLIENT_COLUMNS}
            FROM clients
            WHERE ?1 IS NULL
               OR last_name LIKE ?1 ESCAPE '\'
               OR first_name LIKE ?1 ESCAPE '\'
               OR email LIKE ?1 ESCAPE '\'
               OR phone LIKE ?1 ESCAPE '\'
            ORDER BY last_name, first_name
            "#
        );

        let clients = sqlx::query_as::<_, Client>(&sql)
            .bind(pattern)
            .fetch_all(&self.pool)
            .await?;

        Ok(clients)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Client>> {
        let sql = format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE id = ?1");
        let client = sqlx::query_as::<_, Client>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(client)
    }

    pub async fn create(&self, input: &ClientInput) -> DbResult<Client> {
        validate_input(input)?;

        let id = new_id();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO clients (id, first_name, last_name, email, phone, address, notes, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
            "#,
        )
        .bind(&id)
        .bind(normalize_optional(input.first_name.as_deref()))
        .bind(input.last_name.trim())
        .bind(normalize_optional(input.email.as_deref()))
        .bind(normalize_optional(input.phone.as_deref()))
        .bind(normalize_optional(input.address.as_deref()))
        .bind(normalize_optional(input.notes.as_deref()))
        .bind(now)
        .execute(&self.pool)
        .await?;

        info!(id = %id, "Client created");
        self.get_by_id(&id)
            .await?
            .ok_or_else(|| DbError::not_found("Client", &id))
    }

    pub async fn update(&self, id: &str, input: &ClientInput) -> DbResult<Client> {
        validate_input(input)?;

        let result = sqlx::query(
            r#"
            UPDATE clients SET
                first_name = ?1, last_name = ?2, email = ?3, phone = ?4,
                address = ?5, notes = ?6, updated_at = ?7
            WHERE id = ?8
            "#,
        )
        .bind(normalize_optional(input.first_name.as_deref()))
        .bind(input.last_name.trim())
        .bind(normalize_optional(input.email.as_deref()))
        .bind(normalize_optional(input.phone.as_deref()))
        .bind(normalize_optional(input.address.as_deref()))
        .bind(normalize_optional(input.notes.as_deref()))
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Client", id));
        }

        debug!(id = %id, "Client updated");
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Client", id))
    }

    /// Deletes a client. Past sales are kept and become anonymous.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE ventes SET client_id = NULL WHERE client_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM clients WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Client", id));
        }

        tx.commit().await?;
        info!(id = %id, "Client deleted");
        Ok(())
    }

    /// Purchase history of a client, newest first.
    pub async fn sales(&self, client_id: &str) -> DbResult<Vec<Sale>> {
        let sql = format!(
            "SELECT {SALE_COLUMNS} FROM ventes WHERE client_id = ?1 ORDER BY sold_at DESC"
        );
        let sales = sqlx::query_as::<_, Sale>(&sql)
            .bind(client_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(sales)
    }
}

fn validate_input(input: &ClientInput) -> DbResult<()> {
    validate_name("last_name", &input.last_name)?;
    if let Some(email) = normalize_optional(input.email.as_deref()) {
        validate_email(&email)?;
    }
    if let Some(phone) = normalize_optional(input.phone.as_deref()) {
        validate_phone(&phone)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    fn input(last_name: &str, email: Option<&str>) -> ClientInput {
        ClientInput {
            first_name: Some("Lucie".to_string()),
            last_name: last_name.to_string(),
            email: email.map(str::to_string),
            phone: Some("06 12 34 56 78".to_string()),
            address: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_crud_and_search() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.clients();

        let martin = repo.create(&input("Martin", Some("lucie@example.fr"))).await.unwrap();
        repo.create(&input("Bernard", None)).await.unwrap();

        assert_eq!(repo.list(None).await.unwrap().len(), 2);
        let hits = repo.list(Some("example.fr")).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, martin.id);

        let updated = repo.update(&martin.id, &input("Martin-Durand", None)).await.unwrap();
        assert_eq!(updated.last_name, "Martin-Durand");
        assert_eq!(updated.email, None);

        repo.delete(&martin.id).await.unwrap();
        assert!(repo.get_by_id(&martin.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalid_email_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db.clients().create(&input("Martin", Some("pas-un-email"))).await;
        assert!(matches!(err, Err(DbError::Core(_))));
    }
}
