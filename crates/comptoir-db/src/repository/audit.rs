//! # Action History Repository
//!
//! One row in `historique_actions` per mutating user action. Rows are never
//! updated; they survive the deletion of the user and of the entity.

use chrono::Utc;
use comptoir_core::AuditEntry;
use sqlx::SqlitePool;
use tracing::debug;

use super::new_id;
use crate::error::DbResult;

/// Default and maximum page size of [`AuditRepository::list`].
pub const DEFAULT_AUDIT_LIMIT: i64 = 100;
pub const MAX_AUDIT_LIMIT: i64 = 1_000;

/// What happened, by whom, to what.
#[derive(Debug, Clone, Default)]
pub struct AuditRecord {
    pub user_id: Option<String>,
    pub user_name: Option<String>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub details: Option<String>,
}

impl AuditRecord {
    pub fn new(action: impl Into<String>, entity_type: impl Into<String>) -> Self {
        AuditRecord {
            action: action.into(),
            entity_type: entity_type.into(),
            ..Default::default()
        }
    }

    pub fn by(mut self, user_id: impl Into<String>, user_name: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self.user_name = Some(user_name.into());
        self
    }

    pub fn entity(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Filters for [`AuditRepository::list`].
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub limit: Option<i64>,
    pub entity_type: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AuditRepository {
    pool: SqlitePool,
}

impl AuditRepository {
    pub fn new(pool: SqlitePool) -> Self {
        AuditRepository { pool }
    }

    /// Appends one entry.
    pub async fn record(&self, record: AuditRecord) -> DbResult<AuditEntry> {
        let entry = AuditEntry {
            id: new_id(),
            user_id: record.user_id,
            user_name: record.user_name,
            action: record.action,
            entity_type: record.entity_type,
            entity_id: record.entity_id,
            details: record.details,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO historique_actions
                (id, user_id, user_name, action, entity_type, entity_id, details, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.user_id)
        .bind(&entry.user_name)
        .bind(&entry.action)
        .bind(&entry.entity_type)
        .bind(&entry.entity_id)
        .bind(&entry.details)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        debug!(
            action = %entry.action,
            entity = %entry.entity_type,
            entity_id = ?entry.entity_id,
            "Action recorded"
        );
        Ok(entry)
    }

    /// Latest entries first.
    pub async fn list(&self, filter: &AuditFilter) -> DbResult<Vec<AuditEntry>> {
        let limit = filter
            .limit
            .unwrap_or(DEFAULT_AUDIT_LIMIT)
            .clamp(1, MAX_AUDIT_LIMIT);

        let entries = sqlx::query_as::<_, AuditEntry>(
            r#"
            SELECT id, user_id, user_name, action, entity_type, entity_id, details, created_at
            FROM historique_actions
            WHERE (?1 IS NULL OR entity_type = ?1)
              AND (?2 IS NULL OR user_id = ?2)
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?3
            "#,
        )
        .bind(filter.entity_type.as_deref())
        .bind(filter.user_id.as_deref())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}
