//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use mediabucket_common::{Error, Result};
use mediabucket_crypto::{
    derive_key, KdfParams, PlainSecretStore, Salt, SealedSecretStore, SecretKey, SecretStore,
};
use mediabucket_platform::QueryMode;
use mediabucket_tree::{AllowAll, AllowList, MimeFilter};

/// Environment variable overriding the configuration file location.
pub const CONFIG_ENV: &str = "MEDIABUCKET_CONFIG";

/// Environment variable holding the passphrase sealed values are opened with.
pub const PASSPHRASE_ENV: &str = "MEDIABUCKET_PASSPHRASE";

const APP_DIRNAME: &str = "mediabucket";

/// Configuration of a mediabucket installation, stored as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Settings document with platform options and user meta.
    pub settings_path: PathBuf,
    /// SQLite database of export records.
    pub records_path: PathBuf,
    /// Base64 key sealing stored credentials.
    pub secret_key: Option<String>,
    /// Base64 salt for deriving the key from a passphrase instead.
    pub salt: Option<String>,
    /// Leave files of unsupported types out of listings.
    pub hide_unsupported_types: bool,
    /// Types shown when unsupported types are hidden, e.g. `image/*`.
    pub allowed_mime_types: Vec<String>,
    pub query_mode: QueryMode,
}

impl Default for AppConfig {
    fn default() -> Self {
        let base = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIRNAME);
        let data = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIRNAME);

        Self {
            settings_path: base.join("settings.json"),
            records_path: data.join("records.db"),
            secret_key: None,
            salt: None,
            hide_unsupported_types: false,
            allowed_mime_types: Vec::new(),
            query_mode: QueryMode::default(),
        }
    }
}

impl AppConfig {
    /// Location of the configuration file.
    ///
    /// `MEDIABUCKET_CONFIG` wins over the platform config directory.
    pub fn default_path() -> PathBuf {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return PathBuf::from(path);
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIRNAME)
            .join("config.json")
    }

    /// Load from a JSON file; a missing file gives the defaults.
    ///
    /// # Errors
    /// - `Error::Config` if the file is not a valid configuration
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No configuration file, using defaults");
            return Ok(Self::default());
        }
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("Invalid configuration: {}", e)))
    }

    /// Secret store for the stored credentials.
    ///
    /// A configured key is used as is. Otherwise a salt together with a
    /// passphrase derives the key. Without either, values are stored in
    /// plain text.
    ///
    /// # Errors
    /// - `Error::Crypto` if the key or salt cannot be decoded
    /// - `Error::Config` if a salt is configured but no passphrase given
    pub fn secret_store(&self, passphrase: Option<&str>) -> Result<Arc<dyn SecretStore>> {
        if let Some(encoded) = self.secret_key.as_deref() {
            let key = SecretKey::from_base64(encoded)?;
            return Ok(Arc::new(SealedSecretStore::new(key)));
        }

        match (self.salt.as_deref(), passphrase) {
            (Some(salt), Some(passphrase)) => {
                let salt = Salt::from_base64(salt)?;
                let key = derive_key(passphrase.as_bytes(), &salt, &KdfParams::default())?;
                Ok(Arc::new(SealedSecretStore::new(key)))
            }
            (Some(_), None) => Err(Error::Config(format!(
                "A passphrase is required, set {}",
                PASSPHRASE_ENV
            ))),
            (None, _) => Ok(Arc::new(PlainSecretStore)),
        }
    }

    /// Filter applied to listed files.
    pub fn mime_filter(&self) -> Box<dyn MimeFilter> {
        if !self.hide_unsupported_types {
            return Box::new(AllowAll);
        }
        if self.allowed_mime_types.is_empty() {
            Box::new(AllowList::media())
        } else {
            Box::new(AllowList::new(self.allowed_mime_types.iter()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = AppConfig::from_json(r#"{"query_mode":"prefix"}"#).unwrap();
        assert_eq!(config.query_mode, QueryMode::Prefix);
        assert!(!config.hide_unsupported_types);
        assert!(config.settings_path.ends_with("mediabucket/settings.json"));
        assert!(matches!(AppConfig::from_json("{"), Err(Error::Config(_))));
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("conf/config.json");
        assert_eq!(AppConfig::load(&path).unwrap(), AppConfig::default());

        let config = AppConfig {
            secret_key: Some(SecretKey::generate().to_base64()),
            ..AppConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(AppConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_secret_store_from_key() {
        let config = AppConfig {
            secret_key: Some(SecretKey::from_bytes([1u8; 32]).to_base64()),
            ..AppConfig::default()
        };
        let store = config.secret_store(None).unwrap();
        let sealed = store.encrypt("s3cr3t").unwrap();
        assert_ne!(sealed, "s3cr3t");
        assert_eq!(store.decrypt(&sealed).unwrap(), "s3cr3t");
    }

    #[test]
    fn test_secret_store_from_passphrase() {
        let config = AppConfig {
            salt: Some(Salt::from_bytes([2u8; 32]).to_base64()),
            ..AppConfig::default()
        };
        assert!(matches!(config.secret_store(None), Err(Error::Config(_))));

        let sealed = config
            .secret_store(Some("correct horse"))
            .unwrap()
            .encrypt("value")
            .unwrap();
        let reopened = config.secret_store(Some("correct horse")).unwrap();
        assert_eq!(reopened.decrypt(&sealed).unwrap(), "value");
    }

    #[test]
    fn test_plain_store_without_key() {
        let store = AppConfig::default().secret_store(None).unwrap();
        assert_eq!(store.encrypt("x").unwrap(), "x");
    }

    #[test]
    fn test_mime_filter() {
        let mut config = AppConfig::default();
        assert!(config.mime_filter().allows("a.bin", "application/octet-stream"));

        config.hide_unsupported_types = true;
        assert!(!config.mime_filter().allows("a.bin", "application/octet-stream"));
        assert!(config.mime_filter().allows("a.jpg", "image/jpeg"));

        config.allowed_mime_types = vec!["application/pdf".to_string()];
        assert!(config.mime_filter().allows("a.pdf", "application/pdf"));
        assert!(!config.mime_filter().allows("a.jpg", "image/jpeg"));
    }
}
