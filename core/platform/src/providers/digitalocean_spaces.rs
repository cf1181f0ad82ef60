use crate::descriptor::{FieldKind, FieldSpec, ProviderDescriptor};
use crate::fields::PlatformFields;
use crate::platform::Platform;
use crate::providers::{host_matches, host_of, strip_any};
use mediabucket_storage::ClientConfig;

const SCHEME: &str = "digitalocean-spaces://";

static FIELDS: &[FieldSpec] = &[
    FieldSpec::text("access_key", "Access key").credential(),
    FieldSpec::secret("secret", "Secret key"),
    FieldSpec::text("bucket", "Space name"),
    FieldSpec::text("region", "Datacenter region")
        .with_kind(FieldKind::Select)
        .with_default("fra1"),
];

static DESCRIPTOR: ProviderDescriptor = ProviderDescriptor {
    name: "digitalocean-spaces",
    label: "DigitalOcean Spaces",
    settings_prefix: "eml_digitalocean_spaces",
    public_url_template: "https://{bucket}.{region}.digitaloceanspaces.com/{key}",
    fields: FIELDS,
    regions: &[
        "nyc3", "sfo2", "sfo3", "ams3", "sgp1", "lon1", "fra1", "tor1", "blr1", "syd1", "atl1",
    ],
    import_limit: 10,
};

/// DigitalOcean Spaces, addressed by datacenter region.
#[derive(Debug, Clone)]
pub struct DigitalOceanSpaces {
    fields: PlatformFields,
}

impl DigitalOceanSpaces {
    pub fn new(fields: PlatformFields) -> Self {
        Self { fields }
    }

    pub fn describe() -> &'static ProviderDescriptor {
        &DESCRIPTOR
    }

    fn public_prefix(fields: &PlatformFields) -> String {
        format!(
            "https://{}.{}.digitaloceanspaces.com/",
            fields.value("bucket"),
            fields.value("region")
        )
    }
}

impl Platform for DigitalOceanSpaces {
    fn descriptor(&self) -> &'static ProviderDescriptor {
        &DESCRIPTOR
    }

    fn fields(&self) -> &PlatformFields {
        &self.fields
    }

    fn url_mark(&self) -> String {
        format!("{}{}/", SCHEME, self.bucket_name())
    }

    fn client_config(&self) -> ClientConfig {
        let region = self.fields.value("region");
        ClientConfig {
            bucket: self.bucket_name().to_string(),
            region: region.to_string(),
            endpoint: Some(format!("https://{}.digitaloceanspaces.com", region)),
            path_style: false,
            access_key: self.fields.value("access_key").to_string(),
            secret_key: self.fields.value("secret").to_string(),
        }
    }

    fn public_url(&self, key: &str, fields: &PlatformFields) -> String {
        format!("{}{}", Self::public_prefix(fields), key)
    }

    fn extract_key_from_url(&self, url: &str) -> String {
        strip_any(url, &[Self::public_prefix(&self.fields), self.url_mark()]).to_string()
    }

    fn is_url_compatible(&self, url: &str) -> bool {
        url.starts_with(SCHEME) || host_matches(&host_of(url), "digitaloceanspaces.com")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn platform() -> DigitalOceanSpaces {
        DigitalOceanSpaces::new(
            PlatformFields::new()
                .with_credential("access_key", "DO00")
                .with_credential("secret", "s3cr3t")
                .with("bucket", "assets")
                .with("region", "ams3"),
        )
    }

    #[test]
    fn test_endpoint_and_public_url() {
        let platform = platform();
        assert_eq!(platform.directory(), "digitalocean-spaces://assets/");
        assert_eq!(
            platform.client_config().endpoint_url(),
            "https://ams3.digitaloceanspaces.com"
        );
        assert_eq!(
            platform.public_url("img/logo.svg", platform.fields()),
            "https://assets.ams3.digitaloceanspaces.com/img/logo.svg"
        );
    }

    #[test]
    fn test_url_compatibility() {
        let platform = platform();
        assert!(platform.is_url_compatible("https://assets.ams3.digitaloceanspaces.com/a.png"));
        assert!(platform.is_url_compatible("digitalocean-spaces://assets/a.png"));
        assert!(!platform.is_url_compatible("aws-s3://assets/a.png"));
    }

    proptest! {
        #[test]
        fn prop_key_roundtrip(key in "[a-zA-Z0-9_-]{1,8}(/[a-zA-Z0-9_. -]{1,12}){0,3}") {
            let platform = platform();
            let url = platform.public_url(&key, platform.fields());
            prop_assert_eq!(platform.extract_key_from_url(&url), key);
        }
    }
}
