//! Key types with secure memory handling.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chacha20poly1305::aead::{rand_core::RngCore, OsRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use mediabucket_common::{Error, Result};

/// Length of encryption keys in bytes (256-bit).
pub const KEY_LENGTH: usize = 32;

/// Key sealing the credential values held by the settings store.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey {
    key: [u8; KEY_LENGTH],
}

impl SecretKey {
    /// Create a key from raw bytes.
    pub fn from_bytes(key: [u8; KEY_LENGTH]) -> Self {
        Self { key }
    }

    /// Decode a base64 encoded key.
    ///
    /// # Errors
    /// - Input is not valid base64
    /// - Decoded length is not KEY_LENGTH
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let mut bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| Error::Crypto(format!("Invalid key encoding: {}", e)))?;

        if bytes.len() != KEY_LENGTH {
            let len = bytes.len();
            bytes.zeroize();
            return Err(Error::Crypto(format!(
                "Invalid key length: expected {}, got {}",
                KEY_LENGTH, len
            )));
        }

        let mut key = [0u8; KEY_LENGTH];
        key.copy_from_slice(&bytes);
        bytes.zeroize();
        Ok(Self { key })
    }

    /// Encode the key as base64 for the configuration file.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.key)
    }

    /// Generate a random key.
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_LENGTH];
        OsRng.fill_bytes(&mut key);
        Self { key }
    }

    /// Get the key bytes.
    ///
    /// # Security
    /// The returned slice should be used immediately and not stored.
    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.key
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey([REDACTED])")
    }
}

/// Salt for passphrase based key derivation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Salt(pub [u8; 32]);

impl Salt {
    /// Generate a random salt.
    pub fn generate() -> Self {
        let mut salt = [0u8; 32];
        OsRng.fill_bytes(&mut salt);
        Self(salt)
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Decode a base64 encoded salt.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| Error::Crypto(format!("Invalid salt encoding: {}", e)))?;
        let salt: [u8; 32] = bytes
            .try_into()
            .map_err(|_| Error::Crypto("Salt must be 32 bytes".to_string()))?;
        Ok(Self(salt))
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_key_base64_roundtrip() {
        let key = SecretKey::generate();
        let restored = SecretKey::from_base64(&key.to_base64()).unwrap();
        assert_eq!(key.as_bytes(), restored.as_bytes());
    }

    #[test]
    fn test_secret_key_wrong_length() {
        let encoded = STANDARD.encode([1u8; 16]);
        assert!(SecretKey::from_base64(&encoded).is_err());
        assert!(SecretKey::from_base64("not base64!").is_err());
    }

    #[test]
    fn test_secret_key_debug_redacted() {
        let key = SecretKey::from_bytes([7u8; KEY_LENGTH]);
        assert_eq!(format!("{:?}", key), "SecretKey([REDACTED])");
    }

    #[test]
    fn test_salt_generate() {
        let salt1 = Salt::generate();
        let salt2 = Salt::generate();
        assert_ne!(salt1.as_bytes(), salt2.as_bytes());

        let restored = Salt::from_base64(&salt1.to_base64()).unwrap();
        assert_eq!(restored.as_bytes(), salt1.as_bytes());
    }
}
