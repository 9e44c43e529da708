//! # Colissimo
//!
//! Account management and read-only tracking of the parcels known locally
//! (the tracking numbers of recorded returns).
//!
//! ```text
//!   GET /api/colissimo/parcels/search?q=...
//!        │
//!        ├── empty               → every known parcel
//!        ├── ≥ 10 alphanumerics  → direct carrier lookup, at most one result
//!        └── anything else       → substring filter over known parcels
//! ```
//!
//! Stored passwords are AES-256-GCM encrypted and never leave the server.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use comptoir_core::parcel::{ParcelQuery, ParcelStatus};
use comptoir_core::validation::validate_search_query;
use comptoir_core::{Area, CredentialInput, ParcelCredential, ValidationError};
use comptoir_db::CredentialRecord;
use comptoir_parcel::{ColissimoAccount, ParcelError};
use serde::Deserialize;
use tracing::{debug, warn};

use super::created;
use crate::error::{ApiError, ApiResult};
use crate::session::CurrentUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/colissimo/credentials",
            get(list_credentials).post(create_credential),
        )
        .route(
            "/api/colissimo/credentials/{id}",
            get(get_credential)
                .put(update_credential)
                .delete(delete_credential),
        )
        .route("/api/colissimo/parcels", get(list_parcels))
        .route("/api/colissimo/parcels/search", get(search_parcels))
}

// =============================================================================
// Credentials
// =============================================================================

fn record_from(state: &AppState, input: &CredentialInput) -> ApiResult<CredentialRecord> {
    let encrypted_password = match input.password.as_deref() {
        Some(password) if password.is_empty() => {
            return Err(ValidationError::required("password").into())
        }
        Some(password) => Some(state.cipher.encrypt(password)?),
        None => None,
    };

    Ok(CredentialRecord {
        label: input.label.clone(),
        contract_number: input.contract_number.clone(),
        encrypted_password,
        is_active: input.is_active,
    })
}

async fn list_credentials(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<Vec<ParcelCredential>>> {
    user.require(Area::ParcelCredentials)?;
    Ok(Json(state.db.credentials().list().await?))
}

async fn get_credential(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<ParcelCredential>> {
    user.require(Area::ParcelCredentials)?;
    let credential = state
        .db
        .credentials()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Credential", &id))?;
    Ok(Json(credential))
}

async fn create_credential(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<CredentialInput>,
) -> ApiResult<impl IntoResponse> {
    user.require(Area::ParcelCredentials)?;
    if body.password.is_none() {
        return Err(ValidationError::required("password").into());
    }

    let record = record_from(&state, &body)?;
    let credential = state.db.credentials().create(&record).await?;
    state
        .audit(
            &user,
            "create",
            "colissimo_credential",
            Some(&credential.id),
            Some(credential.label.clone()),
        )
        .await;
    Ok(created(credential))
}

async fn update_credential(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(body): Json<CredentialInput>,
) -> ApiResult<Json<ParcelCredential>> {
    user.require(Area::ParcelCredentials)?;
    let record = record_from(&state, &body)?;
    let credential = state.db.credentials().update(&id, &record).await?;
    state
        .audit(&user, "update", "colissimo_credential", Some(&id), None)
        .await;
    Ok(Json(credential))
}

async fn delete_credential(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    user.require(Area::ParcelCredentials)?;
    state.db.credentials().delete(&id).await?;
    state
        .audit(&user, "delete", "colissimo_credential", Some(&id), None)
        .await;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Parcels
// =============================================================================

/// The active account with its password decrypted, if one is configured.
async fn active_account(state: &AppState) -> ApiResult<Option<ColissimoAccount>> {
    let Some(credential) = state.db.credentials().get_active().await? else {
        return Ok(None);
    };

    let password = state.cipher.decrypt(&credential.encrypted_password)?;
    Ok(Some(ColissimoAccount {
        contract_number: credential.contract_number,
        password,
    }))
}

/// Tracks every locally known parcel.
///
/// A rejected account fails the whole listing; any other carrier failure
/// only leaves that parcel untracked.
async fn known_parcels(state: &AppState) -> ApiResult<Vec<ParcelStatus>> {
    let numbers = state.db.returns().tracking_numbers().await?;

    let Some(account) = active_account(state).await? else {
        debug!(count = numbers.len(), "No active Colissimo account, parcels untracked");
        return Ok(numbers.into_iter().map(ParcelStatus::untracked).collect());
    };

    let mut parcels = Vec::with_capacity(numbers.len());
    for number in numbers {
        match state.tracker.track(&account, &number).await {
            Ok(status) => parcels.push(status),
            Err(ParcelError::AuthFailed) => return Err(ParcelError::AuthFailed.into()),
            Err(e) => {
                warn!(tracking = %number, error = %e, "Parcel tracking failed");
                parcels.push(ParcelStatus::untracked(number));
            }
        }
    }

    Ok(parcels)
}

async fn list_parcels(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<Vec<ParcelStatus>>> {
    user.require(Area::Parcels)?;
    Ok(Json(known_parcels(&state).await?))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

async fn search_parcels(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(search): Query<SearchQuery>,
) -> ApiResult<Json<Vec<ParcelStatus>>> {
    user.require(Area::Parcels)?;
    let query = ParcelQuery::parse(&validate_search_query(&search.q)?);

    let parcels = match &query {
        ParcelQuery::TrackingNumber(number) => {
            let account = active_account(&state)
                .await?
                .ok_or_else(|| ApiError::conflict("Aucun compte Colissimo actif"))?;

            match state.tracker.track(&account, number).await {
                Ok(status) => query.filter(vec![status]),
                Err(ParcelError::NotFound(_)) => Vec::new(),
                Err(e) => return Err(e.into()),
            }
        }
        ParcelQuery::All | ParcelQuery::Filter(_) => query.filter(known_parcels(&state).await?),
    };

    Ok(Json(parcels))
}
