//! Storing entered platform fields.

use tracing::info;

use crate::resolver::CredentialScope;
use crate::settings::SettingsSnapshot;
use mediabucket_common::{Error, Result, UserId};
use mediabucket_crypto::SecretStore;
use mediabucket_platform::{FieldScope, ProviderDescriptor};

/// Write `values` for `descriptor` in the layout the resolver reads.
///
/// The scope option is set as well. Secret values are sealed; in user
/// scope every credential value is sealed.
///
/// # Errors
/// - `Error::InvalidInput` for an unknown field or a user scope without user
/// - `Error::Crypto` if sealing fails
pub fn store_fields(
    snapshot: &mut SettingsSnapshot,
    descriptor: &ProviderDescriptor,
    scope: CredentialScope,
    user: Option<&UserId>,
    values: &[(String, String)],
    secrets: &dyn SecretStore,
) -> Result<()> {
    if scope == CredentialScope::User && user.is_none() {
        return Err(Error::InvalidInput(
            "Per-user credentials need a user".to_string(),
        ));
    }

    let scope_value = match scope {
        CredentialScope::Global => "global",
        CredentialScope::User => "user",
    };
    snapshot.set_option(descriptor.scope_key(), scope_value);

    for (name, value) in values {
        let spec = descriptor.field(name).ok_or_else(|| {
            Error::InvalidInput(format!("{} has no field '{}'", descriptor.label, name))
        })?;
        let key = descriptor.setting_key(spec.name);

        match (spec.scope, user, scope) {
            (FieldScope::Credential, Some(user), CredentialScope::User) => {
                snapshot.set_user_meta(user, key, secrets.encrypt(value)?);
            }
            (FieldScope::Credential, _, _) if spec.is_secret() => {
                snapshot.set_option(key, secrets.encrypt(value)?);
            }
            _ => snapshot.set_option(key, value.clone()),
        }
    }

    info!(platform = %descriptor.name, scope = scope_value, fields = values.len(), "Platform fields stored");
    Ok(())
}
