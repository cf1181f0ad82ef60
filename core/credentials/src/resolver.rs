//! Credential resolver.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::settings::SettingsStore;
use mediabucket_common::{Result, UserId};
use mediabucket_crypto::SecretStore;
use mediabucket_platform::{Field, FieldScope, FieldSpec, PlatformFields, ProviderDescriptor};

/// Where a platform's credentials are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialScope {
    /// One set shared by all users, in the global options.
    Global,
    /// One set per user, in the user's meta values.
    User,
}

impl CredentialScope {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "global" => Some(CredentialScope::Global),
            "user" => Some(CredentialScope::User),
            _ => None,
        }
    }
}

/// Resolves the fields of a platform from the host settings.
///
/// Nothing is cached: every call reads the settings and opens the sealed
/// values again.
pub struct CredentialResolver {
    settings: Arc<dyn SettingsStore>,
    secrets: Arc<dyn SecretStore>,
}

impl CredentialResolver {
    pub fn new(settings: Arc<dyn SettingsStore>, secrets: Arc<dyn SecretStore>) -> Self {
        Self { settings, secrets }
    }

    /// Configured scope of a provider, `None` if credentials are entered manually.
    pub fn scope(&self, descriptor: &ProviderDescriptor) -> Option<CredentialScope> {
        self.settings
            .option(&descriptor.scope_key())
            .and_then(|value| CredentialScope::parse(&value))
    }

    /// Resolve the fields of `descriptor`.
    ///
    /// Global scope opens only secret fields, user scope opens every stored
    /// field. Without a scope, or for an unknown user, the mapping is empty.
    /// Empty values fall back to the field default and are not readonly.
    ///
    /// # Errors
    /// - `Error::Crypto` if a sealed value cannot be opened
    pub fn resolve(
        &self,
        descriptor: &ProviderDescriptor,
        user: Option<&UserId>,
    ) -> Result<PlatformFields> {
        let Some(scope) = self.scope(descriptor) else {
            debug!(platform = %descriptor.name, "No credential scope configured");
            return Ok(PlatformFields::new());
        };

        let user = match (scope, user) {
            (CredentialScope::User, Some(user)) if self.settings.user_exists(user) => Some(user),
            (CredentialScope::User, _) => {
                debug!(platform = %descriptor.name, "User unavailable for per-user credentials");
                return Ok(PlatformFields::new());
            }
            (CredentialScope::Global, _) => None,
        };

        let mut fields = PlatformFields::new();
        for spec in descriptor.fields {
            let stored = self.read(descriptor, spec, user)?;
            fields.insert(spec.name, field_from(spec, stored));
        }

        debug!(
            platform = %descriptor.name,
            scope = ?scope,
            fields = fields.len(),
            "Credentials resolved"
        );
        Ok(fields)
    }

    fn read(
        &self,
        descriptor: &ProviderDescriptor,
        spec: &FieldSpec,
        user: Option<&UserId>,
    ) -> Result<String> {
        let key = descriptor.setting_key(spec.name);

        let (raw, sealed) = match (spec.scope, user) {
            (FieldScope::Credential, Some(user)) => (self.settings.user_meta(user, &key), true),
            (FieldScope::Credential, None) => (self.settings.option(&key), spec.is_secret()),
            (FieldScope::Setting, _) => (self.settings.option(&key), false),
        };

        let raw = raw.unwrap_or_default();
        if sealed {
            self.secrets.decrypt(&raw)
        } else {
            Ok(raw)
        }
    }
}

fn field_from(spec: &FieldSpec, stored: String) -> Field {
    let readonly = !stored.is_empty();
    let value = if stored.is_empty() {
        spec.default.unwrap_or_default().to_string()
    } else {
        stored
    };

    let field = if spec.credential {
        Field::credential(value)
    } else {
        Field::new(value)
    };
    field.readonly(readonly)
}
