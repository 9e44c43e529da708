//! # Tracking Client
//!
//! ```text
//!   server handler
//!        │  Arc<dyn TrackingClient>
//!        ▼
//!   ColissimoClient::track(account, number)
//!        │  POST text/xml (SOAP 1.1)
//!        ▼
//!   Colissimo TrackingServiceWS ──► parse_track_response ──► ParcelStatus
//! ```

use async_trait::async_trait;
use comptoir_core::parcel::ParcelStatus;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{ParcelError, ParcelResult};
use crate::soap::{parse_track_response, track_envelope};

pub const DEFAULT_ENDPOINT: &str =
    "https://www.coliposte.fr/tracking-chargeur-cxf/TrackingServiceWS";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Decrypted Colissimo account used for one call.
#[derive(Clone)]
pub struct ColissimoAccount {
    pub contract_number: String,
    pub password: String,
}

impl std::fmt::Debug for ColissimoAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColissimoAccount")
            .field("contract_number", &self.contract_number)
            .field("password", &"***")
            .finish()
    }
}

/// Looks up the latest status of one parcel.
#[async_trait]
pub trait TrackingClient: Send + Sync {
    async fn track(&self, account: &ColissimoAccount, tracking_number: &str)
        -> ParcelResult<ParcelStatus>;
}

#[derive(Debug, Clone)]
pub struct ColissimoClient {
    http: reqwest::Client,
    endpoint: String,
}

impl ColissimoClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> ParcelResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()?;

        Ok(ColissimoClient {
            http,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl TrackingClient for ColissimoClient {
    async fn track(
        &self,
        account: &ColissimoAccount,
        tracking_number: &str,
    ) -> ParcelResult<ParcelStatus> {
        let envelope = track_envelope(&account.contract_number, &account.password, tracking_number);

        debug!(tracking = %tracking_number, endpoint = %self.endpoint, "Colissimo track request");

        let response = self
            .http
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "text/xml; charset=utf-8")
            .header("SOAPAction", "\"\"")
            .body(envelope)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        // SOAP faults come back as 500 with an envelope; parse those too.
        if !status.is_success() && !body.contains("Envelope") {
            warn!(status = %status, "Colissimo returned an HTTP error");
            return Err(ParcelError::Http(format!("status {status}")));
        }

        let parsed = parse_track_response(&body)?;
        if parsed.error_code != 0 {
            debug!(code = parsed.error_code, "Colissimo reported an error");
        }
        parsed.into_status(tracking_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soap::tests::{response_xml, DELIVERED};
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn account() -> ColissimoAccount {
        ColissimoAccount {
            contract_number: "123456".to_string(),
            password: "secret".to_string(),
        }
    }

    async fn client_for(server: &MockServer) -> ColissimoClient {
        ColissimoClient::new(format!("{}/tracking", server.uri()), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_track_delivered_parcel() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tracking"))
            .and(header("content-type", "text/xml; charset=utf-8"))
            .and(body_string_contains("<skybillNumber>6A12345678901</skybillNumber>"))
            .and(body_string_contains("<accountNumber>123456</accountNumber>"))
            .respond_with(ResponseTemplate::new(200).set_body_string(response_xml(0, DELIVERED)))
            .expect(1)
            .mount(&server)
            .await;

        let status = client_for(&server)
            .await
            .track(&account(), "6A12345678901")
            .await
            .unwrap();

        assert_eq!(status.tracking_number, "6A12345678901");
        assert_eq!(status.event.map(|e| e.code), Some("LIVCFM".to_string()));
    }

    #[tokio::test]
    async fn test_track_auth_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(response_xml(202, "")))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .await
            .track(&account(), "6A12345678901")
            .await
            .unwrap_err();
        assert!(matches!(err, ParcelError::AuthFailed));
    }

    #[tokio::test]
    async fn test_http_error_without_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .await
            .track(&account(), "6A12345678901")
            .await
            .unwrap_err();
        assert!(matches!(err, ParcelError::Http(_)));
    }

    #[test]
    fn test_account_debug_hides_password() {
        let shown = format!("{:?}", account());
        assert!(!shown.contains("secret"));
    }
}
