//! # Credential Cipher
//!
//! AES-256-GCM encryption of Colissimo passwords at rest.
//!
//! ## Stored Format
//! ```text
//!   base64( IV (16 bytes) │ TAG (16 bytes) │ CIPHERTEXT )
//!
//!   key = SHA-256(COMPTOIR_CREDENTIALS_KEY)
//! ```
//! The aead crate appends the tag after the ciphertext; the bytes are
//! reordered on the way in and out so stored values keep the layout above.

use aes_gcm::aead::consts::U16;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::{AesGcm, Nonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::error::CipherError;

/// AES-256-GCM with a 16-byte IV.
type Aes256Gcm16 = AesGcm<Aes256, U16>;

const IV_LEN: usize = 16;
const TAG_LEN: usize = 16;

#[derive(Clone)]
pub struct CredentialCipher {
    cipher: Aes256Gcm16,
}

impl std::fmt::Debug for CredentialCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialCipher").finish_non_exhaustive()
    }
}

impl CredentialCipher {
    /// Derives the key from `secret` with SHA-256.
    pub fn new(secret: &str) -> Self {
        let key = Sha256::digest(secret.as_bytes());
        CredentialCipher {
            cipher: Aes256Gcm16::new(&key),
        }
    }

    pub fn encrypt(&self, plain: &str) -> Result<String, CipherError> {
        let mut iv = [0u8; IV_LEN];
        rand::thread_rng().fill_bytes(&mut iv);

        let sealed = self
            .cipher
            .encrypt(Nonce::<U16>::from_slice(&iv), plain.as_bytes())
            .map_err(|_| CipherError::Encrypt)?;
        let (ciphertext, tag) = sealed.split_at(sealed.len() - TAG_LEN);

        let mut out = Vec::with_capacity(IV_LEN + sealed.len());
        out.extend_from_slice(&iv);
        out.extend_from_slice(tag);
        out.extend_from_slice(ciphertext);

        Ok(STANDARD.encode(out))
    }

    pub fn decrypt(&self, encoded: &str) -> Result<String, CipherError> {
        let raw = STANDARD
            .decode(encoded.trim())
            .map_err(|_| CipherError::Encoding)?;
        if raw.len() < IV_LEN + TAG_LEN {
            return Err(CipherError::TooShort);
        }

        let (iv, rest) = raw.split_at(IV_LEN);
        let (tag, ciphertext) = rest.split_at(TAG_LEN);

        let mut sealed = Vec::with_capacity(rest.len());
        sealed.extend_from_slice(ciphertext);
        sealed.extend_from_slice(tag);

        let plain = self
            .cipher
            .decrypt(Nonce::<U16>::from_slice(iv), sealed.as_slice())
            .map_err(|_| CipherError::Decrypt)?;

        String::from_utf8(plain).map_err(|_| CipherError::Utf8)
    }
}
