//! Field encryption at the persistence boundary
//!
//! Sensitive record fields (lorry number, customer, product, driver)
//! are stored as AES-256-GCM ciphertext: a random 12-byte nonce
//! prepended to the ciphertext, the whole thing base64-encoded. The
//! key comes from the environment (or a `.env` keys file next to the
//! binary) and never leaves this module.
//!
//! A plaintext no-op mode exists so everything above the persistence
//! boundary can be exercised without cryptography.

use aes_gcm::aead::{Aead, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, KeyInit, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use weighbridge_types::StorageError;

/// Environment variable holding the AES key.
pub const KEY_ENV_VAR: &str = "WEIGHBRIDGE_SECURITY_KEY";

const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

pub struct FieldCipher {
    inner: Inner,
}

enum Inner {
    Aes256(Box<Aes256Gcm>),
    Plain,
}

impl FieldCipher {
    /// Cipher from a raw 32-byte key.
    pub fn new(key: &[u8]) -> Result<Self, StorageError> {
        if key.len() != KEY_LEN {
            return Err(StorageError::Crypto(format!(
                "invalid AES key length: {} bytes, expected {}",
                key.len(),
                KEY_LEN
            )));
        }
        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|e| StorageError::Crypto(e.to_string()))?;
        Ok(Self {
            inner: Inner::Aes256(Box::new(cipher)),
        })
    }

    /// Cipher keyed from `WEIGHBRIDGE_SECURITY_KEY`, loading a `.env`
    /// file first if one is present.
    pub fn from_env() -> Result<Self, StorageError> {
        dotenvy::dotenv().ok();
        let key = std::env::var(KEY_ENV_VAR).map_err(|_| {
            StorageError::Crypto(format!("missing environment variable: {KEY_ENV_VAR}"))
        })?;
        Self::new(key.as_bytes())
    }

    /// No-op cipher: values pass through unchanged.
    pub fn plaintext() -> Self {
        Self { inner: Inner::Plain }
    }

    pub fn encrypt(&self, value: &str) -> Result<String, StorageError> {
        if value.is_empty() {
            return Ok(String::new());
        }
        match &self.inner {
            Inner::Plain => Ok(value.to_string()),
            Inner::Aes256(cipher) => {
                let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
                let ciphertext = cipher
                    .encrypt(&nonce, value.as_bytes())
                    .map_err(|e| StorageError::Crypto(e.to_string()))?;

                let mut combined = Vec::with_capacity(NONCE_LEN + ciphertext.len());
                combined.extend_from_slice(&nonce);
                combined.extend_from_slice(&ciphertext);
                Ok(BASE64.encode(combined))
            }
        }
    }

    pub fn decrypt(&self, encoded: &str) -> Result<String, StorageError> {
        if encoded.is_empty() {
            return Ok(String::new());
        }
        match &self.inner {
            Inner::Plain => Ok(encoded.to_string()),
            Inner::Aes256(cipher) => {
                let combined = BASE64
                    .decode(encoded)
                    .map_err(|e| StorageError::Crypto(e.to_string()))?;
                if combined.len() <= NONCE_LEN {
                    return Err(StorageError::Crypto("ciphertext too short".to_string()));
                }
                let (nonce, ciphertext) = combined.split_at(NONCE_LEN);
                let plaintext = cipher
                    .decrypt(Nonce::from_slice(nonce), ciphertext)
                    .map_err(|e| StorageError::Crypto(e.to_string()))?;
                String::from_utf8(plaintext).map_err(|e| StorageError::Crypto(e.to_string()))
            }
        }
    }
}
