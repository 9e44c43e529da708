//! # User Repository
//!
//! Back-office accounts (utilisateurs). Passwords arrive here already
//! hashed; hashing lives in the server next to the login handler.
//!
//! ## Last Administrator Rule
//! ```text
//!   delete / deactivate / demote an admin
//!        │
//!        ├── another active admin exists → OK
//!        └── it is the last one          → CoreError::LastAdministrator
//! ```

use chrono::Utc;
use comptoir_core::validation::{validate_email, validate_name};
use comptoir_core::{CoreError, Role, User};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use super::new_id;
use crate::error::{DbError, DbResult};

const USER_COLUMNS: &str = "id, name, email, password_hash, role, is_active, created_at, updated_at";

/// Account fields with the password already hashed.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    /// `None` on update keeps the current hash.
    pub password_hash: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    pub async fn list(&self) -> DbResult<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM utilisateurs ORDER BY name");
        let users = sqlx::query_as::<_, User>(&sql).fetch_all(&self.pool).await?;
        Ok(users)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM utilisateurs WHERE id = ?1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Looks a user up by e-mail for login (case-insensitive).
    pub async fn find_by_email(&self, email: &str) -> DbResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM utilisateurs WHERE email = ?1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email.trim().to_lowercase())
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM utilisateurs")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn create(&self, record: &UserRecord) -> DbResult<User> {
        validate_name("name", &record.name)?;
        validate_email(&record.email)?;
        let password_hash = record
            .password_hash
            .as_deref()
            .ok_or_else(|| comptoir_core::ValidationError::required("password"))?;

        let id = new_id();
        let email = record.email.trim().to_lowercase();

        sqlx::query(
            r#"
            INSERT INTO utilisateurs (id, name, email, password_hash, role, is_active, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
            "#,
        )
        .bind(&id)
        .bind(record.name.trim())
        .bind(&email)
        .bind(password_hash)
        .bind(record.role)
        .bind(record.is_active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| unique_email(e, &email))?;

        info!(id = %id, role = %record.role, "User created");
        self.get_by_id(&id)
            .await?
            .ok_or_else(|| DbError::not_found("User", &id))
    }

    /// Updates an account.
    ///
    /// ## Errors
    /// `CoreError::LastAdministrator` when the change would leave no active admin.
    pub async fn update(&self, id: &str, record: &UserRecord) -> DbResult<User> {
        validate_name("name", &record.name)?;
        validate_email(&record.email)?;

        let email = record.email.trim().to_lowercase();
        let mut tx = self.pool.begin().await?;

        let current = find(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("User", id))?;

        let loses_admin =
            is_active_admin(&current) && (record.role != Role::Admin || !record.is_active);
        if loses_admin && other_active_admins(&mut tx, id).await? == 0 {
            return Err(CoreError::LastAdministrator.into());
        }

        sqlx::query(
            r#"
            UPDATE utilisateurs SET
                name = ?1, email = ?2, role = ?3, is_active = ?4,
                password_hash = COALESCE(?5, password_hash), updated_at = ?6
            WHERE id = ?7
            "#,
        )
        .bind(record.name.trim())
        .bind(&email)
        .bind(record.role)
        .bind(record.is_active)
        .bind(record.password_hash.as_deref())
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| unique_email(e, &email))?;

        tx.commit().await?;

        debug!(id = %id, "User updated");
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("User", id))
    }

    /// Deletes an account. The action history keeps its rows.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let current = find(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("User", id))?;

        if is_active_admin(&current) && other_active_admins(&mut tx, id).await? == 0 {
            return Err(CoreError::LastAdministrator.into());
        }

        sqlx::query("DELETE FROM utilisateurs WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        info!(id = %id, "User deleted");
        Ok(())
    }
}

fn is_active_admin(user: &User) -> bool {
    user.role == Role::Admin && user.is_active
}

async fn find(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM utilisateurs WHERE id = ?1");
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(user)
}

async fn other_active_admins(conn: &mut SqliteConnection, id: &str) -> DbResult<i64> {
    let count = sqlx::query_scalar(
        "SELECT COUNT(*) FROM utilisateurs WHERE role = 'admin' AND is_active = 1 AND id != ?1",
    )
    .bind(id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(count)
}

fn unique_email(err: sqlx::Error, email: &str) -> DbError {
    match DbError::from(err) {
        DbError::UniqueViolation { .. } => DbError::duplicate("email", email),
        other => other,
    }
}
