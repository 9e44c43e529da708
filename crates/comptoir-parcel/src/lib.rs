//! # comptoir-parcel: Colissimo Integration
//!
//! Read-only tracking of parcels through the Colissimo SOAP service, and the
//! cipher protecting Colissimo passwords stored in the database.
//!
//! ## Module Organization
//! - [`client`] - `TrackingClient` trait and the reqwest implementation
//! - [`soap`] - Envelope building and response parsing (quick-xml)
//! - [`cipher`] - AES-256-GCM credential encryption
//! - [`error`] - `ParcelError`, `CipherError`
//!
//! ## Usage
//! ```rust,ignore
//! let cipher = CredentialCipher::new(&config.credentials_key);
//! let account = ColissimoAccount {
//!     contract_number: credential.contract_number,
//!     password: cipher.decrypt(&credential.encrypted_password)?,
//! };
//! let status = client.track(&account, "6A12345678901").await?;
//! ```

pub mod cipher;
pub mod client;
pub mod error;
pub mod soap;

pub use cipher::CredentialCipher;
pub use client::{ColissimoAccount, ColissimoClient, TrackingClient, DEFAULT_ENDPOINT, DEFAULT_TIMEOUT};
pub use error::{CipherError, ParcelError, ParcelResult};
