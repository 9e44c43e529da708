//! # Withdrawal Repository
//!
//! Cash taken out of the till (retraits). Withdrawals are deducted from the
//! month's revenue in the reports.

use chrono::Utc;
use comptoir_core::validation::{validate_name, validate_payment_amount, validate_year};
use comptoir_core::{NewWithdrawal, ValidationError, Withdrawal};
use sqlx::SqlitePool;
use tracing::info;

use super::new_id;
use crate::error::{DbError, DbResult};

const WITHDRAWAL_COLUMNS: &str = "id, amount_cents, reason, user_id, withdrawn_at";

#[derive(Debug, Clone)]
pub struct WithdrawalRepository {
    pool: SqlitePool,
}

impl WithdrawalRepository {
    pub fn new(pool: SqlitePool) -> Self {
        WithdrawalRepository { pool }
    }

    /// Withdrawals, newest first.
    ///
    /// `year` alone keeps that year; `year` and `month` keep that month.
    pub async fn list(&self, year: Option<i32>, month: Option<u32>) -> DbResult<Vec<Withdrawal>> {
        let period = period_prefix(year, month)?;

        let sql = format!(
            "SELECT {WITHDRAWAL_COLUMNS} FROM retraits \
             WHERE ?1 IS NULL OR substr(withdrawn_at, 1, length(?1)) = ?1 \
             ORDER BY withdrawn_at DESC"
        );
        let withdrawals = sqlx::query_as::<_, Withdrawal>(&sql)
            .bind(period)
            .fetch_all(&self.pool)
            .await?;

        Ok(withdrawals)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Withdrawal>> {
        let sql = format!("SELECT {WITHDRAWAL_COLUMNS} FROM retraits WHERE id = ?1");
        let withdrawal = sqlx::query_as::<_, Withdrawal>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(withdrawal)
    }

    pub async fn create(&self, input: &NewWithdrawal, user_id: Option<&str>) -> DbResult<Withdrawal> {
        validate_payment_amount(input.amount_cents)?;
        validate_name("reason", &input.reason)?;

        let withdrawal = Withdrawal {
            id: new_id(),
            amount_cents: input.amount_cents,
            reason: input.reason.trim().to_string(),
            user_id: user_id.map(str::to_string),
            withdrawn_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO retraits (id, amount_cents, reason, user_id, withdrawn_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&withdrawal.id)
        .bind(withdrawal.amount_cents)
        .bind(&withdrawal.reason)
        .bind(&withdrawal.user_id)
        .bind(withdrawal.withdrawn_at)
        .execute(&self.pool)
        .await?;

        info!(id = %withdrawal.id, amount_cents = withdrawal.amount_cents, "Cash withdrawal recorded");
        Ok(withdrawal)
    }

    /// Corrects the amount or reason; the withdrawal date stays.
    pub async fn update(&self, id: &str, input: &NewWithdrawal) -> DbResult<Withdrawal> {
        validate_payment_amount(input.amount_cents)?;
        validate_name("reason", &input.reason)?;

        let result = sqlx::query("UPDATE retraits SET amount_cents = ?1, reason = ?2 WHERE id = ?3")
            .bind(input.amount_cents)
            .bind(input.reason.trim())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Withdrawal", id));
        }

        info!(id = %id, amount_cents = input.amount_cents, "Cash withdrawal updated");
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Withdrawal", id))
    }

    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM retraits WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Withdrawal", id));
        }

        info!(id = %id, "Cash withdrawal deleted");
        Ok(())
    }
}

/// `YYYY` or `YYYY-MM` matching the start of an RFC 3339 timestamp.
fn period_prefix(year: Option<i32>, month: Option<u32>) -> DbResult<Option<String>> {
    match (year, month) {
        (None, None) => Ok(None),
        (Some(year), None) => {
            validate_year(year)?;
            Ok(Some(format!("{year:04}")))
        }
        (Some(year), Some(month)) => {
            validate_year(year)?;
            if !(1..=12).contains(&month) {
                return Err(ValidationError::OutOfRange {
                    field: "month".to_string(),
                    min: 1,
                    max: 12,
                }
                .into());
            }
            Ok(Some(format!("{year:04}-{month:02}")))
        }
        (None, Some(_)) => Err(ValidationError::required("year").into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::Datelike;

    #[test]
    fn test_period_prefix() {
        assert_eq!(period_prefix(None, None).unwrap(), None);
        assert_eq!(period_prefix(Some(2024), None).unwrap().as_deref(), Some("2024"));
        assert_eq!(period_prefix(Some(2024), Some(3)).unwrap().as_deref(), Some("2024-03"));
        assert!(period_prefix(Some(2024), Some(13)).is_err());
        assert!(period_prefix(None, Some(3)).is_err());
    }

    #[tokio::test]
    async fn test_create_list_delete() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.withdrawals();

        let w = repo
            .create(
                &NewWithdrawal {
                    amount_cents: 5_000,
                    reason: "Dépôt banque".to_string(),
                },
                Some("user-1"),
            )
            .await
            .unwrap();

        let now = Utc::now();
        let this_month = repo.list(Some(now.year()), Some(now.month())).await.unwrap();
        assert_eq!(this_month.len(), 1);
        assert!(repo.list(Some(2001), None).await.unwrap().is_empty());

        let corrected = repo
            .update(
                &w.id,
                &NewWithdrawal {
                    amount_cents: 4_500,
                    reason: "Dépôt banque".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(corrected.amount_cents, 4_500);
        assert_eq!(corrected.withdrawn_at, w.withdrawn_at);

        repo.delete(&w.id).await.unwrap();
        assert!(repo.list(None, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_amount_must_be_positive() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db
            .withdrawals()
            .create(
                &NewWithdrawal {
                    amount_cents: 0,
                    reason: "Erreur".to_string(),
                },
                None,
            )
            .await;
        assert!(matches!(err, Err(DbError::Core(_))));
    }
}
