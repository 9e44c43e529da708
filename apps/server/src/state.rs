//! Shared application state.

use comptoir_db::{AuditRecord, Database};
use comptoir_parcel::{CredentialCipher, TrackingClient};
use std::sync::Arc;
use tracing::error;

use crate::config::ServerConfig;
use crate::session::{CurrentUser, SessionKeys};

/// Cloned into every handler; everything inside is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<ServerConfig>,
    pub session: SessionKeys,
    pub cipher: CredentialCipher,
    pub tracker: Arc<dyn TrackingClient>,
}

impl AppState {
    pub fn new(db: Database, config: ServerConfig, tracker: Arc<dyn TrackingClient>) -> Self {
        AppState {
            session: SessionKeys::new(&config.session_secret, config.session_lifetime_secs),
            cipher: CredentialCipher::new(&config.credentials_key),
            config: Arc::new(config),
            db,
            tracker,
        }
    }

    /// Records a user action in the history.
    ///
    /// Called once the action's own transaction has committed. History is
    /// best effort: a failure here is logged at error level and the action
    /// stands, so a committed change can lack its history row. Stock
    /// changes keep their own trail in `mouvements_stock`, written inside
    /// the action's transaction.
    pub async fn audit(
        &self,
        user: &CurrentUser,
        action: &str,
        entity_type: &str,
        entity_id: Option<&str>,
        details: Option<String>,
    ) {
        let mut record = AuditRecord::new(action, entity_type).by(&user.id, &user.name);
        if let Some(id) = entity_id {
            record = record.entity(id);
        }
        if let Some(details) = details {
            record = record.details(details);
        }

        if let Err(e) = self.db.audit().record(record).await {
            error!(error = %e, action, entity_type, "Failed to record action history");
        }
    }
}
