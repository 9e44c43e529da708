//! Cash withdrawals (retraits).

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use comptoir_core::{Area, NewWithdrawal, Withdrawal};
use serde::Deserialize;

use super::created;
use crate::error::{ApiError, ApiResult};
use crate::session::CurrentUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/withdrawals", get(list).post(create))
        .route("/api/withdrawals/{id}", get(get_one).put(update).delete(delete))
}

#[derive(Debug, Deserialize)]
pub struct Period {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(period): Query<Period>,
) -> ApiResult<Json<Vec<Withdrawal>>> {
    user.require(Area::Withdrawals)?;
    Ok(Json(state.db.withdrawals().list(period.year, period.month).await?))
}

async fn get_one(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Withdrawal>> {
    user.require(Area::Withdrawals)?;
    let withdrawal = state
        .db
        .withdrawals()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Withdrawal", &id))?;
    Ok(Json(withdrawal))
}

async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<NewWithdrawal>,
) -> ApiResult<impl IntoResponse> {
    user.require(Area::Withdrawals)?;
    let withdrawal = state.db.withdrawals().create(&body, Some(&user.id)).await?;
    state
        .audit(
            &user,
            "create",
            "withdrawal",
            Some(&withdrawal.id),
            Some(format!("{} cents: {}", withdrawal.amount_cents, withdrawal.reason)),
        )
        .await;
    Ok(created(withdrawal))
}

async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(body): Json<NewWithdrawal>,
) -> ApiResult<Json<Withdrawal>> {
    user.require(Area::Withdrawals)?;
    let withdrawal = state.db.withdrawals().update(&id, &body).await?;
    state
        .audit(
            &user,
            "update",
            "withdrawal",
            Some(&id),
            Some(format!("{} cents", withdrawal.amount_cents)),
        )
        .await;
    Ok(Json(withdrawal))
}

async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    user.require(Area::Withdrawals)?;
    state.db.withdrawals().delete(&id).await?;
    state.audit(&user, "delete", "withdrawal", Some(&id), None).await;
    Ok(StatusCode::NO_CONTENT)
}
