use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use comptoir_core::{Area, AuditEntry};
use comptoir_db::AuditFilter;
use serde::Deserialize;

use crate::error::ApiResult;
use crate::session::CurrentUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/audit", get(list))
}

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub limit: Option<i64>,
    pub entity_type: Option<String>,
    pub user_id: Option<String>,
}

/// Most recent actions first.
async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<AuditQuery>,
) -> ApiResult<Json<Vec<AuditEntry>>> {
    user.require(Area::AuditLog)?;
    let filter = AuditFilter {
        limit: query.limit,
        entity_type: query.entity_type,
        user_id: query.user_id,
    };
    Ok(Json(state.db.audit().list(&filter).await?))
}
