//! Point of sale.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use comptoir_core::invoice::Invoice;
use comptoir_core::{Area, NewSale, Sale, SaleDetail};
use serde::Deserialize;

use super::created;
use crate::error::{ApiError, ApiResult};
use crate::session::CurrentUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/sales", get(list).post(create))
        .route("/api/sales/{id}", get(get_one).delete(cancel))
        .route("/api/sales/{id}/invoice", get(invoice))
}

/// `from` / `to` are RFC 3339 timestamps.
#[derive(Debug, Deserialize)]
pub struct SaleFilter {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub client_id: Option<String>,
}

async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(filter): Query<SaleFilter>,
) -> ApiResult<Json<Vec<Sale>>> {
    user.require(Area::PointOfSale)?;
    let sales = state
        .db
        .sales()
        .list(filter.from, filter.to, filter.client_id.as_deref())
        .await?;
    Ok(Json(sales))
}

async fn get_one(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<SaleDetail>> {
    user.require(Area::PointOfSale)?;
    let detail = state
        .db
        .sales()
        .get_detail(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Sale", &id))?;
    Ok(Json(detail))
}

async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<NewSale>,
) -> ApiResult<impl IntoResponse> {
    user.require(Area::PointOfSale)?;
    let detail = state.db.sales().create(&body, Some(&user.id)).await?;
    state
        .audit(
            &user,
            "create",
            "sale",
            Some(&detail.sale.id),
            Some(format!("{} {}", detail.sale.invoice_number, detail.sale.total())),
        )
        .await;
    Ok(created(detail))
}

/// Cancels a sale; its goods go back on the shelf.
async fn cancel(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    user.require(Area::PointOfSale)?;
    state.db.sales().delete(&id, Some(&user.id)).await?;
    state.audit(&user, "delete", "sale", Some(&id), None).await;
    Ok(StatusCode::NO_CONTENT)
}

async fn invoice(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Invoice>> {
    user.require(Area::PointOfSale)?;
    let detail = state
        .db
        .sales()
        .get_detail(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Sale", &id))?;

    let client = match &detail.sale.client_id {
        Some(client_id) => state.db.clients().get_by_id(client_id).await?,
        None => None,
    };

    Ok(Json(Invoice::from_sale(
        &detail.sale,
        &detail.items,
        client.as_ref(),
        &state.config.shop,
        state.config.vat_rate,
    )))
}
