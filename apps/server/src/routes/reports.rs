use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{Datelike, Utc};
use comptoir_core::{Area, DashboardSummary, MonthlyRevenue};
use serde::Deserialize;

use crate::error::ApiResult;
use crate::session::CurrentUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/reports/monthly-revenue", get(monthly_revenue))
        .route("/api/reports/dashboard", get(dashboard))
}

#[derive(Debug, Deserialize)]
pub struct YearQuery {
    pub year: Option<i32>,
}

/// Twelve entries, January first. Defaults to the current year.
async fn monthly_revenue(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<YearQuery>,
) -> ApiResult<Json<Vec<MonthlyRevenue>>> {
    user.require(Area::Reports)?;
    let year = query.year.unwrap_or_else(|| Utc::now().year());
    Ok(Json(state.db.reports().monthly_revenue(year).await?))
}

async fn dashboard(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<DashboardSummary>> {
    user.require(Area::Reports)?;
    Ok(Json(state.db.reports().dashboard().await?))
}
