//! Server configuration module.
//!
//! Configuration is loaded from `COMPTOIR_*` environment variables with
//! fallback to defaults.

use comptoir_core::invoice::ShopInfo;
use comptoir_core::TaxRate;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

const DEV_SESSION_SECRET: &str = "comptoir-dev-session-secret-change-in-production";
const DEV_CREDENTIALS_KEY: &str = "comptoir-dev-credentials-key-change-in-production";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address
    pub bind: SocketAddr,

    /// SQLite database file
    pub database_path: PathBuf,

    /// HS256 secret signing the session cookie
    pub session_secret: String,

    /// Session cookie lifetime in seconds
    pub session_lifetime_secs: i64,

    /// Secret the Colissimo password encryption key is derived from
    pub credentials_key: String,

    /// Colissimo tracking web service URL
    pub colissimo_endpoint: String,

    /// Colissimo request timeout
    pub colissimo_timeout: Duration,

    /// Seller block printed on invoices
    pub shop: ShopInfo,

    /// VAT rate included in sale prices
    pub vat_rate: TaxRate,

    /// First administrator, created when no user exists
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup` (tests pass a map here).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let config = ServerConfig {
            bind: parse(&var, "COMPTOIR_BIND", "0.0.0.0:8080")?,

            database_path: PathBuf::from(
                var("COMPTOIR_DATABASE_PATH").unwrap_or_else(|| "./comptoir.db".to_string()),
            ),

            session_secret: var("COMPTOIR_SESSION_SECRET").unwrap_or_else(|| {
                // Development only; production sets the variable
                DEV_SESSION_SECRET.to_string()
            }),

            session_lifetime_secs: parse(&var, "COMPTOIR_SESSION_LIFETIME_SECS", "28800")?, // 8 hours

            credentials_key: var("COMPTOIR_CREDENTIALS_KEY")
                .unwrap_or_else(|| DEV_CREDENTIALS_KEY.to_string()),

            colissimo_endpoint: var("COMPTOIR_COLISSIMO_ENDPOINT")
                .unwrap_or_else(|| comptoir_parcel::DEFAULT_ENDPOINT.to_string()),

            colissimo_timeout: Duration::from_secs(parse(
                &var,
                "COMPTOIR_COLISSIMO_TIMEOUT_SECS",
                "15",
            )?),

            shop: ShopInfo {
                name: var("COMPTOIR_SHOP_NAME").unwrap_or_else(|| "Comptoir".to_string()),
                address: var("COMPTOIR_SHOP_ADDRESS"),
                siret: var("COMPTOIR_SHOP_SIRET"),
            },

            vat_rate: TaxRate::from_bps(parse(&var, "COMPTOIR_VAT_BPS", "2000")?),

            admin_email: var("COMPTOIR_ADMIN_EMAIL"),
            admin_password: var("COMPTOIR_ADMIN_PASSWORD"),
        };

        if config.session_lifetime_secs <= 0 {
            return Err(ConfigError::InvalidValue(
                "COMPTOIR_SESSION_LIFETIME_SECS".to_string(),
            ));
        }
        if config.vat_rate.bps() > 10_000 {
            return Err(ConfigError::InvalidValue("COMPTOIR_VAT_BPS".to_string()));
        }
        if config.admin_email.is_some() != config.admin_password.is_some() {
            return Err(ConfigError::MissingRequired(
                "COMPTOIR_ADMIN_EMAIL and COMPTOIR_ADMIN_PASSWORD go together".to_string(),
            ));
        }

        Ok(config)
    }

    /// Whether the development secrets are still in use.
    pub fn uses_dev_secrets(&self) -> bool {
        self.session_secret == DEV_SESSION_SECRET || self.credentials_key == DEV_CREDENTIALS_KEY
    }
}

fn parse<T: std::str::FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: &str,
) -> Result<T, ConfigError> {
    var(key)
        .unwrap_or_else(|| default.to_string())
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(key.to_string()))
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.bind.port(), 8080);
        assert_eq!(config.session_lifetime_secs, 28_800);
        assert_eq!(config.colissimo_timeout, Duration::from_secs(15));
        assert_eq!(config.vat_rate.bps(), 2_000);
        assert_eq!(config.shop.name, "Comptoir");
        assert!(config.uses_dev_secrets());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("COMPTOIR_BIND", "127.0.0.1:3000"),
            ("COMPTOIR_VAT_BPS", "550"),
            ("COMPTOIR_SHOP_NAME", "Épicerie Martin"),
            ("COMPTOIR_SESSION_SECRET", "s"),
            ("COMPTOIR_CREDENTIALS_KEY", "k"),
        ])
        .unwrap();
        assert_eq!(config.bind.port(), 3000);
        assert_eq!(config.vat_rate.bps(), 550);
        assert_eq!(config.shop.name, "Épicerie Martin");
        assert!(!config.uses_dev_secrets());
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            load(&[("COMPTOIR_BIND", "nowhere")]),
            Err(ConfigError::InvalidValue(k)) if k == "COMPTOIR_BIND"
        ));
        assert!(load(&[("COMPTOIR_SESSION_LIFETIME_SECS", "0")]).is_err());
        assert!(load(&[("COMPTOIR_VAT_BPS", "20000")]).is_err());
        assert!(matches!(
            load(&[("COMPTOIR_ADMIN_EMAIL", "admin@boutique.fr")]),
            Err(ConfigError::MissingRequired(_))
        ));
    }
}
