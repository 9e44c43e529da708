//! # HTTP Routes
//!
//! One module per back-office section; each returns a router with its full
//! paths, merged here.
//!
//! ```text
//!   /health
//!   /api/auth/...            login, logout, me
//!   /api/categories          /api/products        /api/clients
//!   /api/suppliers           /api/supplies        /api/sales
//!   /api/returns             /api/withdrawals     /api/users
//!   /api/audit               /api/colissimo/...   /api/reports/...
//! ```

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Router;
use serde::Serialize;

use crate::state::AppState;

pub mod audit;
pub mod auth;
pub mod catalog;
pub mod clients;
pub mod colissimo;
pub mod health;
pub mod reports;
pub mod returns;
pub mod sales;
pub mod suppliers;
pub mod supplies;
pub mod users;
pub mod withdrawals;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(catalog::router())
        .merge(clients::router())
        .merge(suppliers::router())
        .merge(supplies::router())
        .merge(sales::router())
        .merge(returns::router())
        .merge(withdrawals::router())
        .merge(users::router())
        .merge(audit::router())
        .merge(colissimo::router())
        .merge(reports::router())
}

/// 201 with the created entity.
pub(crate) fn created<T: Serialize>(value: T) -> impl IntoResponse {
    (StatusCode::CREATED, axum::Json(value))
}
