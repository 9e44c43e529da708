//! # Report Repository
//!
//! Read-only aggregates over sales, withdrawals, products and supply orders.
//!
//! ## Monthly Revenue
//! ```text
//!   ventes   ──► GROUP BY month ──► sales_count, revenue ─┐
//!                                                         ├──► 12 rows, net = revenue - withdrawals
//!   retraits ──► GROUP BY month ──► withdrawals ──────────┘
//! ```
//! Months without activity are present with zeros.

use chrono::Utc;
use comptoir_core::validation::validate_year;
use comptoir_core::{DashboardSummary, MonthlyRevenue};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;

#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Revenue per month of `year`, January first, always twelve entries.
    pub async fn monthly_revenue(&self, year: i32) -> DbResult<Vec<MonthlyRevenue>> {
        validate_year(year)?;
        let prefix = format!("{year:04}");

        let sales: Vec<(i64, i64, i64)> = sqlx::query_as(
            r#"
            SELECT CAST(substr(sold_at, 6, 2) AS INTEGER) AS month,
                   COUNT(*), SUM(total_cents)
            FROM ventes
            WHERE substr(sold_at, 1, 4) = ?1
            GROUP BY month
            "#,
        )
        .bind(&prefix)
        .fetch_all(&self.pool)
        .await?;

        let withdrawals: Vec<(i64, i64)> = sqlx::query_as(
            r#"
            SELECT CAST(substr(withdrawn_at, 6, 2) AS INTEGER) AS month,
                   SUM(amount_cents)
            FROM retraits
            WHERE substr(withdrawn_at, 1, 4) = ?1
            GROUP BY month
            "#,
        )
        .bind(&prefix)
        .fetch_all(&self.pool)
        .await?;

        let mut months: Vec<MonthlyRevenue> = (1..=12u32)
            .map(|month| MonthlyRevenue {
                month,
                sales_count: 0,
                revenue_cents: 0,
                withdrawals_cents: 0,
                net_cents: 0,
            })
            .collect();

        for (month, count, revenue) in sales {
            if let Some(slot) = slot(&mut months, month) {
                slot.sales_count = count;
                slot.revenue_cents = revenue;
            }
        }
        for (month, amount) in withdrawals {
            if let Some(slot) = slot(&mut months, month) {
                slot.withdrawals_cents = amount;
            }
        }
        for m in &mut months {
            m.net_cents = m.revenue_cents - m.withdrawals_cents;
        }

        debug!(year, "Monthly revenue computed");
        Ok(months)
    }

    /// Figures for the home screen. "Today" is the current UTC date.
    pub async fn dashboard(&self) -> DbResult<DashboardSummary> {
        let today = Utc::now().format("%Y-%m-%d").to_string();

        let (today_sales_count, today_revenue_cents): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(total_cents), 0) FROM ventes WHERE substr(sold_at, 1, 10) = ?1",
        )
        .bind(&today)
        .fetch_one(&self.pool)
        .await?;

        let low_stock_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM produits WHERE stock <= min_stock")
                .fetch_one(&self.pool)
                .await?;

        let supplier_balance_cents: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(total_cents - paid_cents), 0) FROM approvisionnements WHERE paid_cents < total_cents",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(DashboardSummary {
            today_revenue_cents,
            today_sales_count,
            low_stock_count,
            supplier_balance_cents,
        })
    }
}

fn slot(months: &mut [MonthlyRevenue], month: i64) -> Option<&mut MonthlyRevenue> {
    usize::try_from(month)
        .ok()
        .and_then(|m| m.checked_sub(1))
        .and_then(|i| months.get_mut(i))
}
