//! Secret sealing for stored platform credentials.
//!
//! This module provides:
//! - Authenticated encryption using XChaCha20-Poly1305
//! - Key derivation from a passphrase using Argon2id
//! - A `SecretStore` that seals credential values as base64 text
//!
//! # Security Guarantees
//! - Key material is zeroized on drop
//! - Plaintext credentials are never logged

pub mod aead;
pub mod kdf;
pub mod keys;
pub mod secrets;

pub use aead::{decrypt, encrypt};
pub use kdf::{derive_key, KdfParams};
pub use keys::{Salt, SecretKey};
pub use secrets::{PlainSecretStore, SealedSecretStore, SecretStore};
