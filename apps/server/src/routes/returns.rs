//! Colissimo parcel returns (retours).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use comptoir_core::{Area, NewParcelReturn, ParcelReturn};

use super::created;
use crate::error::{ApiError, ApiResult};
use crate::session::CurrentUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/returns", get(list).post(create))
        .route("/api/returns/{id}", get(get_one).delete(delete))
}

async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<Vec<ParcelReturn>>> {
    user.require(Area::Parcels)?;
    Ok(Json(state.db.returns().list().await?))
}

async fn get_one(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<ParcelReturn>> {
    user.require(Area::Parcels)?;
    let parcel_return = state
        .db
        .returns()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Return", &id))?;
    Ok(Json(parcel_return))
}

async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<NewParcelReturn>,
) -> ApiResult<impl IntoResponse> {
    user.require(Area::Parcels)?;
    let parcel_return = state.db.returns().create(&body, Some(&user.id)).await?;
    state
        .audit(
            &user,
            "create",
            "return",
            Some(&parcel_return.id),
            Some(parcel_return.tracking_number.clone()),
        )
        .await;
    Ok(created(parcel_return))
}

async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    user.require(Area::Parcels)?;
    state.db.returns().delete(&id, Some(&user.id)).await?;
    state.audit(&user, "delete", "return", Some(&id), None).await;
    Ok(StatusCode::NO_CONTENT)
}
