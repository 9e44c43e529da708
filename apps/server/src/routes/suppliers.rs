use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use comptoir_core::{Area, Supplier, SupplierInput};

use super::created;
use crate::error::{ApiError, ApiResult};
use crate::session::CurrentUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/suppliers", get(list).post(create))
        .route("/api/suppliers/{id}", get(get_one).put(update).delete(delete))
}

async fn list(State(state): State<AppState>, user: CurrentUser) -> ApiResult<Json<Vec<Supplier>>> {
    user.require(Area::Suppliers)?;
    Ok(Json(state.db.suppliers().list().await?))
}

async fn get_one(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Supplier>> {
    user.require(Area::Suppliers)?;
    let supplier = state
        .db
        .suppliers()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Supplier", &id))?;
    Ok(Json(supplier))
}

async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<SupplierInput>,
) -> ApiResult<impl IntoResponse> {
    user.require(Area::Suppliers)?;
    let supplier = state.db.suppliers().create(&body).await?;
    state
        .audit(&user, "create", "supplier", Some(&supplier.id), Some(supplier.name.clone()))
        .await;
    Ok(created(supplier))
}

async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(body): Json<SupplierInput>,
) -> ApiResult<Json<Supplier>> {
    user.require(Area::Suppliers)?;
    let supplier = state.db.suppliers().update(&id, &body).await?;
    state.audit(&user, "update", "supplier", Some(&id), None).await;
    Ok(Json(supplier))
}

/// Deletes the supplier and, one by one, its supply orders.
async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    user.require(Area::Suppliers)?;
    let orders = state.db.suppliers().delete(&id, Some(&user.id)).await?;
    state
        .audit(
            &user,
            "delete",
            "supplier",
            Some(&id),
            Some(format!("{orders} supply order(s) deleted")),
        )
        .await;
    Ok(StatusCode::NO_CONTENT)
}
