//! Back-office accounts. Administrators only.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use comptoir_core::validation::validate_password;
use comptoir_core::{Area, User, UserInput, ValidationError};
use comptoir_db::UserRecord;

use super::created;
use crate::error::{ApiError, ApiResult};
use crate::password::hash_password;
use crate::session::CurrentUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(list).post(create))
        .route("/api/users/{id}", get(get_one).put(update).delete(delete))
}

/// Hashes the password when one is given.
fn record_from(input: &UserInput) -> ApiResult<UserRecord> {
    let password_hash = match input.password.as_deref() {
        Some(password) => {
            validate_password(password)?;
            Some(hash_password(password)?)
        }
        None => None,
    };

    Ok(UserRecord {
        name: input.name.clone(),
        email: input.email.clone(),
        role: input.role,
        is_active: input.is_active,
        password_hash,
    })
}

async fn list(State(state): State<AppState>, user: CurrentUser) -> ApiResult<Json<Vec<User>>> {
    user.require(Area::Users)?;
    Ok(Json(state.db.users().list().await?))
}

async fn get_one(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<User>> {
    user.require(Area::Users)?;
    let found = state
        .db
        .users()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("User", &id))?;
    Ok(Json(found))
}

async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<UserInput>,
) -> ApiResult<impl IntoResponse> {
    user.require(Area::Users)?;
    if body.password.is_none() {
        return Err(ValidationError::required("password").into());
    }

    let record = record_from(&body)?;
    let created_user = state.db.users().create(&record).await?;
    state
        .audit(
            &user,
            "create",
            "user",
            Some(&created_user.id),
            Some(format!("{} ({})", created_user.email, created_user.role)),
        )
        .await;
    Ok(created(created_user))
}

async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(body): Json<UserInput>,
) -> ApiResult<Json<User>> {
    user.require(Area::Users)?;
    let record = record_from(&body)?;
    let updated = state.db.users().update(&id, &record).await?;

    let details = match body.password {
        Some(_) => format!("{} (password changed)", updated.role),
        None => updated.role.to_string(),
    };
    state.audit(&user, "update", "user", Some(&id), Some(details)).await;
    Ok(Json(updated))
}

async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    user.require(Area::Users)?;
    state.db.users().delete(&id).await?;
    state.audit(&user, "delete", "user", Some(&id), None).await;
    Ok(StatusCode::NO_CONTENT)
}
