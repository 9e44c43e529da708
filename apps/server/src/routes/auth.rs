//! Login, logout and the current user.

use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use comptoir_core::Role;
use comptoir_db::AuditRecord;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::password::verify_password;
use crate::session::{CurrentUser, SessionKeys};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let invalid = || ApiError::unauthenticated("Email ou mot de passe incorrect");

    let user = state.db.users().find_by_email(&body.email).await?.ok_or_else(invalid)?;

    if !user.is_active || !verify_password(&body.password, &user.password_hash) {
        warn!(user = %user.id, "Failed login attempt");
        return Err(invalid());
    }

    let token = state.session.issue(&user)?;
    info!(user = %user.id, role = %user.role, "User logged in");

    if let Err(e) = state
        .db
        .audit()
        .record(AuditRecord::new("login", "user").by(&user.id, &user.name).entity(&user.id))
        .await
    {
        warn!(error = %e, "Failed to record login");
    }

    Ok((
        [(SET_COOKIE, state.session.cookie(&token))],
        Json(SessionUser {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
        }),
    ))
}

async fn logout() -> impl IntoResponse {
    (StatusCode::NO_CONTENT, [(SET_COOKIE, SessionKeys::clear_cookie())])
}

async fn me(user: CurrentUser) -> Json<SessionUser> {
    Json(SessionUser {
        id: user.id,
        name: user.name,
        email: user.email,
        role: user.role,
    })
}
