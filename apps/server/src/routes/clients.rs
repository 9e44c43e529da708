use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use comptoir_core::{Area, Client, ClientInput, Sale};
use serde::Deserialize;

use super::created;
use crate::error::{ApiError, ApiResult};
use crate::session::CurrentUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/clients", get(list).post(create))
        .route("/api/clients/{id}", get(get_one).put(update).delete(delete))
        .route("/api/clients/{id}/sales", get(sales))
}

#[derive(Debug, Deserialize)]
pub struct ClientFilter {
    pub search: Option<String>,
}

async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(filter): Query<ClientFilter>,
) -> ApiResult<Json<Vec<Client>>> {
    user.require(Area::Clients)?;
    Ok(Json(state.db.clients().list(filter.search.as_deref()).await?))
}

async fn get_one(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Client>> {
    user.require(Area::Clients)?;
    let client = state
        .db
        .clients()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Client", &id))?;
    Ok(Json(client))
}

/// Purchase history.
async fn sales(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Sale>>> {
    user.require(Area::Clients)?;
    if state.db.clients().get_by_id(&id).await?.is_none() {
        return Err(ApiError::not_found("Client", &id));
    }
    Ok(Json(state.db.clients().sales(&id).await?))
}

async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<ClientInput>,
) -> ApiResult<impl IntoResponse> {
    user.require(Area::Clients)?;
    let client = state.db.clients().create(&body).await?;
    state
        .audit(&user, "create", "client", Some(&client.id), Some(client.display_name()))
        .await;
    Ok(created(client))
}

async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(body): Json<ClientInput>,
) -> ApiResult<Json<Client>> {
    user.require(Area::Clients)?;
    let client = state.db.clients().update(&id, &body).await?;
    state.audit(&user, "update", "client", Some(&id), None).await;
    Ok(Json(client))
}

async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    user.require(Area::Clients)?;
    state.db.clients().delete(&id).await?;
    state.audit(&user, "delete", "client", Some(&id), None).await;
    Ok(StatusCode::NO_CONTENT)
}
