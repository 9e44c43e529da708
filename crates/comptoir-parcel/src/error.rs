//! # Parcel Errors

use thiserror::Error;

/// Errors from the Colissimo tracking service.
#[derive(Debug, Error)]
pub enum ParcelError {
    /// Vendor codes 201/202: account number or password refused.
    #[error("Colissimo rejected the account credentials")]
    AuthFailed,

    /// Vendor code 105: unknown tracking number.
    #[error("Parcel not found: {0}")]
    NotFound(String),

    /// Any other non-zero vendor code.
    #[error("Colissimo error {code}: {message}")]
    Vendor { code: i32, message: String },

    /// Transport failure or non-success HTTP status.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Response body is not the expected SOAP document.
    #[error("Invalid Colissimo response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for ParcelError {
    fn from(err: reqwest::Error) -> Self {
        ParcelError::Http(err.to_string())
    }
}

impl From<quick_xml::Error> for ParcelError {
    fn from(err: quick_xml::Error) -> Self {
        ParcelError::Parse(err.to_string())
    }
}

/// Errors from [`crate::CredentialCipher`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CipherError {
    #[error("Encrypted value is not valid base64")]
    Encoding,

    #[error("Encrypted value is too short")]
    TooShort,

    /// Wrong key or tampered data.
    #[error("Decryption failed")]
    Decrypt,

    #[error("Encryption failed")]
    Encrypt,

    #[error("Decrypted value is not valid UTF-8")]
    Utf8,
}

pub type ParcelResult<T> = Result<T, ParcelError>;
