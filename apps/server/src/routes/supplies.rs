//! Supply orders (approvisionnements) and their payments.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use comptoir_core::{
    Area, NewSupplierPayment, NewSupplyOrder, SupplyOrder, SupplyOrderDetail, SupplyOrderUpdate,
};
use serde::Deserialize;

use super::created;
use crate::error::{ApiError, ApiResult};
use crate::session::CurrentUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/supplies", get(list).post(create))
        .route(
            "/api/supplies/{id}",
            get(get_one).put(update).delete(delete_order),
        )
        .route("/api/supplies/{id}/payments", post(add_payment))
        .route(
            "/api/supplies/{id}/payments/{payment_id}",
            delete(delete_payment),
        )
        .route("/api/supplies/{id}/receive", post(receive))
}

#[derive(Debug, Deserialize)]
pub struct SupplyFilter {
    pub supplier_id: Option<String>,
}

async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(filter): Query<SupplyFilter>,
) -> ApiResult<Json<Vec<SupplyOrder>>> {
    user.require(Area::Supplies)?;
    Ok(Json(state.db.supplies().list(filter.supplier_id.as_deref()).await?))
}

async fn get_one(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<SupplyOrderDetail>> {
    user.require(Area::Supplies)?;
    let detail = state
        .db
        .supplies()
        .get_detail(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Supply order", &id))?;
    Ok(Json(detail))
}

async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<NewSupplyOrder>,
) -> ApiResult<impl IntoResponse> {
    user.require(Area::Supplies)?;
    let detail = state.db.supplies().create(&body, Some(&user.id)).await?;
    state
        .audit(
            &user,
            "create",
            "supply_order",
            Some(&detail.order.id),
            Some(format!(
                "{} ({} lines, received: {})",
                detail.order.reference,
                detail.lines.len(),
                detail.order.is_received()
            )),
        )
        .await;
    Ok(created(detail))
}

async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(body): Json<SupplyOrderUpdate>,
) -> ApiResult<Json<SupplyOrder>> {
    user.require(Area::Supplies)?;
    let order = state.db.supplies().update(&id, &body).await?;
    state.audit(&user, "update", "supply_order", Some(&id), None).await;
    Ok(Json(order))
}

async fn add_payment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(body): Json<NewSupplierPayment>,
) -> ApiResult<impl IntoResponse> {
    user.require(Area::Supplies)?;
    let order = state.db.supplies().add_payment(&id, &body).await?;
    state
        .audit(
            &user,
            "add_payment",
            "supply_order",
            Some(&id),
            Some(format!("{} cents ({})", body.amount_cents, order.payment_status.as_str())),
        )
        .await;
    Ok(created(order))
}

async fn delete_payment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((id, payment_id)): Path<(String, String)>,
) -> ApiResult<Json<SupplyOrder>> {
    user.require(Area::Supplies)?;
    let order = state.db.supplies().delete_payment(&id, &payment_id).await?;
    state
        .audit(&user, "delete_payment", "supply_order", Some(&id), Some(payment_id))
        .await;
    Ok(Json(order))
}

async fn receive(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<SupplyOrder>> {
    user.require(Area::Supplies)?;
    let order = state.db.supplies().mark_received(&id, Some(&user.id)).await?;
    state.audit(&user, "receive", "supply_order", Some(&id), None).await;
    Ok(Json(order))
}

async fn delete_order(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    user.require(Area::Supplies)?;
    state.db.supplies().delete(&id, Some(&user.id)).await?;
    state.audit(&user, "delete", "supply_order", Some(&id), None).await;
    Ok(StatusCode::NO_CONTENT)
}
