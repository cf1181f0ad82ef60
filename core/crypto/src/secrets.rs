//! Secret stores for credential values kept in the host settings.
//!
//! Sealed values are `base64(nonce || ciphertext || tag)`. An empty stored
//! value stands for "not configured" and decrypts to an empty string.

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::aead;
use crate::keys::SecretKey;
use mediabucket_common::{Error, Result};

/// Encrypts and decrypts single credential values.
pub trait SecretStore: Send + Sync {
    fn encrypt(&self, plaintext: &str) -> Result<String>;
    fn decrypt(&self, ciphertext: &str) -> Result<String>;
}

/// XChaCha20-Poly1305 sealed values, base64 encoded.
pub struct SealedSecretStore {
    key: SecretKey,
}

impl SealedSecretStore {
    pub fn new(key: SecretKey) -> Self {
        Self { key }
    }
}

impl SecretStore for SealedSecretStore {
    fn encrypt(&self, plaintext: &str) -> Result<String> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }
        let sealed = aead::encrypt(self.key.as_bytes(), plaintext.as_bytes())?;
        Ok(STANDARD.encode(sealed))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String> {
        if ciphertext.is_empty() {
            return Ok(String::new());
        }
        let sealed = STANDARD
            .decode(ciphertext.trim())
            .map_err(|e| Error::Crypto(format!("Invalid sealed value: {}", e)))?;
        let plaintext = aead::decrypt(self.key.as_bytes(), &sealed)?;
        String::from_utf8(plaintext)
            .map_err(|_| Error::Crypto("Sealed value is not valid UTF-8".to_string()))
    }
}

/// Pass-through store for hosts that keep credentials unencrypted.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainSecretStore;

impl SecretStore for PlainSecretStore {
    fn encrypt(&self, plaintext: &str) -> Result<String> {
        Ok(plaintext.to_string())
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String> {
        Ok(ciphertext.to_string())
    }
}
