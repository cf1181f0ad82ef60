//! Host settings access.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use mediabucket_common::{Error, Result, UserId};

/// Read-only view of the host's stored settings.
pub trait SettingsStore: Send + Sync {
    /// A global option.
    fn option(&self, key: &str) -> Option<String>;

    /// Whether the host knows this user.
    fn user_exists(&self, user: &UserId) -> bool;

    /// A per-user meta value.
    fn user_meta(&self, user: &UserId, key: &str) -> Option<String>;
}

/// Settings held in a JSON document.
///
/// ```json
/// {
///   "options": { "eml_aws_s3_credentials_vault": "global" },
///   "users": { "42": { "eml_aws_s3_bucket": "media" } }
/// }
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsSnapshot {
    #[serde(default)]
    pub options: BTreeMap<String, String>,
    #[serde(default)]
    pub users: BTreeMap<String, BTreeMap<String, String>>,
}

impl SettingsSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a JSON file; a missing file is an empty snapshot.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Write as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Config(format!("Invalid settings: {}", e)))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn set_option(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.options.insert(key.into(), value.into());
    }

    pub fn set_user_meta(
        &mut self,
        user: &UserId,
        key: impl Into<String>,
        value: impl Into<String>,
    ) {
        self.users
            .entry(user.as_str().to_string())
            .or_default()
            .insert(key.into(), value.into());
    }
}

impl SettingsStore for SettingsSnapshot {
    fn option(&self, key: &str) -> Option<String> {
        self.options.get(key).cloned()
    }

    fn user_exists(&self, user: &UserId) -> bool {
        self.users.contains_key(user.as_str())
    }

    fn user_meta(&self, user: &UserId, key: &str) -> Option<String> {
        self.users.get(user.as_str())?.get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_options_and_meta() {
        let user = UserId::new("7").unwrap();
        let mut settings = SettingsSnapshot::new();
        settings.set_option("a", "1");
        settings.set_user_meta(&user, "b", "2");

        assert_eq!(settings.option("a").as_deref(), Some("1"));
        assert_eq!(settings.user_meta(&user, "b").as_deref(), Some("2"));
        assert!(settings.user_exists(&user));
        assert!(!settings.user_exists(&UserId::new("8").unwrap()));
    }

    #[test]
    fn test_partial_document() {
        let settings = SettingsSnapshot::from_json(r#"{"options":{"x":"y"}}"#).unwrap();
        assert!(settings.users.is_empty());
        assert!(SettingsSnapshot::from_json("[").is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/settings.json");

        assert_eq!(SettingsSnapshot::load(&path).unwrap(), SettingsSnapshot::new());

        let mut settings = SettingsSnapshot::new();
        settings.set_option("eml_aws_s3_credentials_vault", "global");
        settings.save(&path).unwrap();

        assert_eq!(SettingsSnapshot::load(&path).unwrap(), settings);
    }
}
