//! # API Errors
//!
//! Every handler returns `Result<_, ApiError>`. The client always gets
//! `{"error": <code>, "message": <text>}`.
//!
//! ```text
//!   ValidationError ─────────────────────────► 400 validation_error
//!   (no / bad session) ──────────────────────► 401 unauthenticated
//!   Role cannot open Area ───────────────────► 403 forbidden
//!   DbError::NotFound ───────────────────────► 404 not_found
//!   DbError::UniqueViolation / Conflict ─────► 409 conflict
//!   CoreError (stock, payments, ...) ────────► 422 business_rule
//!   ParcelError::AuthFailed ─────────────────► 401 colissimo_auth_failed
//!   ParcelError (vendor, HTTP) ──────────────► 502 colissimo_error
//!   anything else ───────────────────────────► 500 internal_error (logged)
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use comptoir_core::{CoreError, ValidationError};
use comptoir_db::DbError;
use comptoir_parcel::{CipherError, ParcelError};
use serde_json::json;
use tracing::{error, warn};

pub const INTERNAL_MESSAGE: &str = "Une erreur interne est survenue";

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        ApiError {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "validation_error", message)
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthenticated", message)
    }

    pub fn forbidden() -> Self {
        Self::new(
            StatusCode::FORBIDDEN,
            "forbidden",
            "Vous n'avez pas accès à cette fonctionnalité",
        )
    }

    pub fn not_found(entity: &str, id: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", format!("{entity} not found: {id}"))
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, "conflict", message)
    }

    /// Logs `detail` and hides it from the client.
    pub fn internal(detail: impl std::fmt::Display) -> Self {
        error!(error = %detail, "Internal error");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", INTERNAL_MESSAGE)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({
                "error": self.code,
                "message": self.message,
            })),
        )
            .into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::Duplicate { .. } => ApiError::conflict(err.to_string()),
            other => ApiError::bad_request(other.to_string()),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(v) => v.into(),
            CoreError::EmptyDocument { .. } | CoreError::TooManyLines { .. } => {
                ApiError::bad_request(err.to_string())
            }
            CoreError::AlreadyReceived(_) | CoreError::LastAdministrator => {
                ApiError::conflict(err.to_string())
            }
            other => ApiError::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                "business_rule",
                other.to_string(),
            ),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Core(core) => core.into(),
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { .. } | DbError::Conflict(_) => {
                ApiError::conflict(err.to_string())
            }
            DbError::ForeignKeyViolation { .. } => {
                warn!(error = %err, "Foreign key violation");
                ApiError::conflict("L'élément est lié à d'autres données")
            }
            other => ApiError::internal(other),
        }
    }
}

impl From<ParcelError> for ApiError {
    fn from(err: ParcelError) -> Self {
        match err {
            ParcelError::AuthFailed => ApiError::new(
                StatusCode::UNAUTHORIZED,
                "colissimo_auth_failed",
                "Identifiants Colissimo invalides",
            ),
            ParcelError::NotFound(number) => ApiError::not_found("Parcel", &number),
            other => {
                warn!(error = %other, "Colissimo call failed");
                ApiError::new(StatusCode::BAD_GATEWAY, "colissimo_error", other.to_string())
            }
        }
    }
}

impl From<CipherError> for ApiError {
    fn from(err: CipherError) -> Self {
        ApiError::internal(format!("credential cipher: {err}"))
    }
}
