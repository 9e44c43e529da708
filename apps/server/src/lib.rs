//! # Comptoir Server
//!
//! JSON API of the shop back-office: catalog, point of sale, clients,
//! suppliers and supply orders, returns, cash withdrawals, users, action
//! history, Colissimo tracking and reports.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  request ─► TraceLayer ─► Router<AppState>                              │
//! │                              │                                          │
//! │                              ├─► CurrentUser (session cookie)          │
//! │                              ├─► user.require(Area)                    │
//! │                              ├─► state.db.<repository>()               │
//! │                              └─► state.audit(...) on mutations         │
//! │                                                                         │
//! │  errors ─► ApiError ─► {"error": code, "message": text}                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod password;
pub mod routes;
pub mod session;
pub mod state;

use axum::Router;
use comptoir_core::Role;
use comptoir_db::{Database, UserRecord};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::password::hash_password;
use crate::state::AppState;

/// The full application, ready to serve.
pub fn build_app(state: AppState) -> Router {
    routes::router()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Creates the first administrator when the user table is empty and
/// `COMPTOIR_ADMIN_EMAIL` / `COMPTOIR_ADMIN_PASSWORD` are set.
///
/// Returns whether an account was created.
pub async fn bootstrap_admin(db: &Database, config: &ServerConfig) -> Result<bool, ApiError> {
    let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
        return Ok(false);
    };

    if db.users().count().await? > 0 {
        return Ok(false);
    }

    comptoir_core::validation::validate_password(password)?;
    let admin = db
        .users()
        .create(&UserRecord {
            name: "Administrateur".to_string(),
            email: email.clone(),
            role: Role::Admin,
            is_active: true,
            password_hash: Some(hash_password(password)?),
        })
        .await?;

    info!(user = %admin.id, email = %admin.email, "Initial administrator created");
    Ok(true)
}
