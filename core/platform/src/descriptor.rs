//! Static provider metadata.

use serde::Serialize;

/// Input kind of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    /// Stored sealed, shown masked.
    Secret,
    /// One value out of the provider's region list.
    Select,
    /// `"1"` or empty.
    Flag,
    Number,
}

/// Where a field's stored value lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldScope {
    /// Follows the configured credential scope (global options or user meta).
    Credential,
    /// Always a plain global option.
    Setting,
}

/// Declaration of one provider field.
#[derive(Debug, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub scope: FieldScope,
    /// Part of the access credential pair.
    pub credential: bool,
    /// Must be non-empty before a client can be built.
    pub required: bool,
    pub default: Option<&'static str>,
}

impl FieldSpec {
    pub const fn text(name: &'static str, label: &'static str) -> Self {
        Self {
            name,
            label,
            kind: FieldKind::Text,
            scope: FieldScope::Credential,
            credential: false,
            required: true,
            default: None,
        }
    }

    pub const fn secret(name: &'static str, label: &'static str) -> Self {
        Self {
            kind: FieldKind::Secret,
            credential: true,
            ..Self::text(name, label)
        }
    }

    pub const fn credential(mut self) -> Self {
        self.credential = true;
        self
    }

    pub const fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub const fn with_kind(mut self, kind: FieldKind) -> Self {
        self.kind = kind;
        self
    }

    pub const fn with_default(mut self, default: &'static str) -> Self {
        self.default = Some(default);
        self
    }

    pub const fn setting(mut self) -> Self {
        self.scope = FieldScope::Setting;
        self
    }

    pub fn is_secret(&self) -> bool {
        self.kind == FieldKind::Secret
    }
}

/// Static description of a storage vendor.
#[derive(Debug, Serialize)]
pub struct ProviderDescriptor {
    /// Registry name, e.g. `aws-s3`.
    pub name: &'static str,
    /// Human readable label.
    pub label: &'static str,
    /// Prefix of every stored setting of this provider.
    pub settings_prefix: &'static str,
    /// Public URL shape, `{…}` placeholders name fields.
    pub public_url_template: &'static str,
    pub fields: &'static [FieldSpec],
    pub regions: &'static [&'static str],
    /// Files per import batch.
    pub import_limit: usize,
}

impl ProviderDescriptor {
    /// Look up a field declaration.
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Name of the stored setting holding `field`.
    pub fn setting_key(&self, field: &str) -> String {
        format!("{}_{}", self.settings_prefix, field)
    }

    /// Name of the option selecting the credential scope.
    pub fn scope_key(&self) -> String {
        self.setting_key("credentials_vault")
    }

    /// Whether `region` is one of the provider's known regions.
    ///
    /// Providers without a region list accept anything.
    pub fn knows_region(&self, region: &str) -> bool {
        self.regions.is_empty() || self.regions.contains(&region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static FIELDS: &[FieldSpec] = &[
        FieldSpec::text("access_key", "Access key").credential(),
        FieldSpec::secret("secret", "Secret key"),
        FieldSpec::text("region", "Region")
            .with_kind(FieldKind::Select)
            .with_default("r1"),
    ];

    static DESCRIPTOR: ProviderDescriptor = ProviderDescriptor {
        name: "test",
        label: "Test",
        settings_prefix: "eml_test",
        public_url_template: "https://{bucket}.example.com/{key}",
        fields: FIELDS,
        regions: &["r1", "r2"],
        import_limit: 5,
    };

    #[test]
    fn test_setting_keys() {
        assert_eq!(DESCRIPTOR.setting_key("secret"), "eml_test_secret");
        assert_eq!(DESCRIPTOR.scope_key(), "eml_test_credentials_vault");
    }

    #[test]
    fn test_field_builders() {
        let secret = DESCRIPTOR.field("secret").unwrap();
        assert!(secret.is_secret() && secret.credential && secret.required);

        let region = DESCRIPTOR.field("region").unwrap();
        assert_eq!(region.default, Some("r1"));
        assert_eq!(region.scope, FieldScope::Credential);
        assert!(DESCRIPTOR.field("bucket").is_none());
    }

    #[test]
    fn test_regions() {
        assert!(DESCRIPTOR.knows_region("r2"));
        assert!(!DESCRIPTOR.knows_region("r9"));
    }
}
