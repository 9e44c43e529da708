//! Session cookie handling.
//!
//! The cookie carries a signed HS256 token; the user is reloaded on every
//! request, so deactivating an account or changing its role applies at once.
//!
//! ```text
//!   POST /api/auth/login ──► Set-Cookie: comptoir_session=<jwt>; HttpOnly; SameSite=Lax; Path=/; Max-Age=N
//!
//!   any /api request
//!     │  Cookie: comptoir_session=<jwt>
//!     ▼
//!   CurrentUser extractor ──► verify signature + exp ──► load user ──► active?
//!     │                                                                 │
//!     ▼                                                                 ▼
//!   handler: user.require(Area::Supplies)?                        401 otherwise
//! ```

use axum::extract::FromRequestParts;
use axum::http::header::COOKIE;
use axum::http::request::Parts;
use chrono::Utc;
use comptoir_core::{Area, Role, User};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "comptoir_session";

/// Token payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub name: String,
    pub role: Role,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

/// Signs and verifies session tokens.
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime_secs: i64,
}

impl SessionKeys {
    pub fn new(secret: &str, lifetime_secs: i64) -> Self {
        SessionKeys {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            lifetime_secs,
        }
    }

    pub fn lifetime_secs(&self) -> i64 {
        self.lifetime_secs
    }

    pub fn issue(&self, user: &User) -> Result<String, ApiError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user.id.clone(),
            name: user.name.clone(),
            role: user.role,
            iat: now,
            exp: now + self.lifetime_secs,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ApiError::internal(format!("failed to sign session: {e}")))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, ApiError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(error = %e, "Session token rejected");
                ApiError::unauthenticated("Session invalide ou expirée")
            })
    }

    /// `Set-Cookie` value opening a session.
    pub fn cookie(&self, token: &str) -> String {
        format!(
            "{SESSION_COOKIE}={token}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
            self.lifetime_secs
        )
    }

    /// `Set-Cookie` value closing the session.
    pub fn clear_cookie() -> String {
        format!("{SESSION_COOKIE}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0")
    }
}

/// Finds the session token among the request cookies.
pub fn token_from_cookies(header: &str) -> Option<&str> {
    header
        .split(';')
        .map(str::trim)
        .find_map(|pair| pair.strip_prefix(SESSION_COOKIE)?.strip_prefix('='))
        .filter(|token| !token.is_empty())
}

/// The signed-in user, as stored right now.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl CurrentUser {
    /// 403 unless the role may open `area`.
    pub fn require(&self, area: Area) -> Result<(), ApiError> {
        if self.role.can(area) {
            Ok(())
        } else {
            debug!(user = %self.id, role = %self.role, ?area, "Access denied");
            Err(ApiError::forbidden())
        }
    }

    /// 403 unless the role may change products and categories.
    pub fn require_catalog_write(&self) -> Result<(), ApiError> {
        if self.role.can_write_catalog() {
            Ok(())
        } else {
            Err(ApiError::forbidden())
        }
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(token_from_cookies)
            .ok_or_else(|| ApiError::unauthenticated("Authentification requise"))?;

        let claims = state.session.verify(token)?;

        let user = state
            .db
            .users()
            .get_by_id(&claims.sub)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(|| ApiError::unauthenticated("Compte inconnu ou désactivé"))?;

        Ok(CurrentUser {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> User {
        User {
            id: "u1".to_string(),
            name: "Camille".to_string(),
            email: "camille@boutique.fr".to_string(),
            password_hash: String::new(),
            role,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_token_round_trip() {
        let keys = SessionKeys::new("secret", 3600);
        let token = keys.issue(&user(Role::Manager)).unwrap();
        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.role, Role::Manager);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_wrong_secret_and_tampering() {
        let token = SessionKeys::new("one", 3600).issue(&user(Role::Cashier)).unwrap();
        assert!(SessionKeys::new("two", 3600).verify(&token).is_err());

        let mut tampered = token.clone();
        tampered.push('x');
        assert!(SessionKeys::new("one", 3600).verify(&tampered).is_err());
    }

    #[test]
    fn test_expired_token() {
        let keys = SessionKeys::new("secret", -10);
        let token = keys.issue(&user(Role::Admin)).unwrap();
        assert!(keys.verify(&token).is_err());
    }

    #[test]
    fn test_cookie_attributes() {
        let keys = SessionKeys::new("secret", 28_800);
        let cookie = keys.cookie("abc");
        assert!(cookie.starts_with("comptoir_session=abc;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("Max-Age=28800"));
        assert!(SessionKeys::clear_cookie().contains("Max-Age=0"));
    }

    #[test]
    fn test_token_from_cookies() {
        assert_eq!(token_from_cookies("comptoir_session=abc"), Some("abc"));
        assert_eq!(
            token_from_cookies("theme=dark; comptoir_session=xyz; lang=fr"),
            Some("xyz")
        );
        assert_eq!(token_from_cookies("comptoir_sessionx=abc"), None);
        assert_eq!(token_from_cookies("comptoir_session="), None);
        assert_eq!(token_from_cookies("theme=dark"), None);
    }

    #[test]
    fn test_area_gating() {
        let cashier = CurrentUser {
            id: "u".to_string(),
            name: "Lucie".to_string(),
            email: "lucie@boutique.fr".to_string(),
            role: Role::Cashier,
        };
        assert!(cashier.require(Area::PointOfSale).is_ok());
        assert!(cashier.require(Area::Supplies).is_err());
        assert!(cashier.require_catalog_write().is_err());
    }
}
