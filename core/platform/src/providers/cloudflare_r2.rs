use async_trait::async_trait;

use crate::descriptor::{FieldKind, FieldSpec, ProviderDescriptor};
use crate::fields::PlatformFields;
use crate::platform::Platform;
use crate::providers::{host_matches, host_of, strip_any};
use mediabucket_storage::{ClientConfig, StorageClient};

const SCHEME: &str = "cloudflare-r2://";

static FIELDS: &[FieldSpec] = &[
    FieldSpec::text("account_id", "Account ID"),
    FieldSpec::text("eu", "Bucket in EU jurisdiction")
        .with_kind(FieldKind::Flag)
        .optional(),
    FieldSpec::text("bucket", "Bucket"),
    FieldSpec::text("access_key", "Access key").credential(),
    FieldSpec::secret("secret", "Secret key"),
];

static DESCRIPTOR: ProviderDescriptor = ProviderDescriptor {
    name: "cloudflare-r2",
    label: "Cloudflare R2",
    settings_prefix: "eml_cloudflare_r2",
    public_url_template: "https://{account_id}.r2.cloudflarestorage.com/{bucket}/{key}",
    fields: FIELDS,
    regions: &[],
    import_limit: 10,
};

/// Cloudflare R2.
///
/// Endpoints derive from the account id and the EU jurisdiction flag
/// instead of a region. Objects are never verified as publicly reachable,
/// so exports to R2 are always rejected after upload.
#[derive(Debug, Clone)]
pub struct CloudflareR2 {
    fields: PlatformFields,
}

impl CloudflareR2 {
    pub fn new(fields: PlatformFields) -> Self {
        Self { fields }
    }

    pub fn describe() -> &'static ProviderDescriptor {
        &DESCRIPTOR
    }

    fn endpoint(fields: &PlatformFields) -> String {
        let jurisdiction = if fields.flag("eu") { ".eu" } else { "" };
        format!(
            "https://{}{}.r2.cloudflarestorage.com",
            fields.value("account_id"),
            jurisdiction
        )
    }

    fn public_prefix(fields: &PlatformFields) -> String {
        format!("{}/{}/", Self::endpoint(fields), fields.value("bucket"))
    }

    /// Object page of the Cloudflare dashboard.
    fn dashboard_prefix(fields: &PlatformFields) -> String {
        let jurisdiction = if fields.flag("eu") { "eu/" } else { "" };
        format!(
            "https://dash.cloudflare.com/{}/r2/{}buckets/{}/objects/",
            fields.value("account_id"),
            jurisdiction,
            fields.value("bucket")
        )
    }
}

#[async_trait]
impl Platform for CloudflareR2 {
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
        ClientConfig {
            bucket: self.bucket_name().to_string(),
            region: "auto".to_string(),
            endpoint: Some(Self::endpoint(&self.fields)),
            path_style: true,
            access_key: self.fields.value("access_key").to_string(),
            secret_key: self.fields.value("secret").to_string(),
        }
    }

    fn public_url(&self, key: &str, fields: &PlatformFields) -> String {
        format!("{}{}", Self::public_prefix(fields), key)
    }

    async fn is_publicly_available(&self, _key: &str, _client: &dyn StorageClient) -> bool {
        false
    }

    fn extract_key_from_url(&self, url: &str) -> String {
        strip_any(
            url,
            &[
                Self::public_prefix(&self.fields),
                Self::dashboard_prefix(&self.fields),
                self.url_mark(),
            ],
        )
        .to_string()
    }

    fn is_url_compatible(&self, url: &str) -> bool {
        let host = host_of(url);
        url.starts_with(SCHEME)
            || host_matches(&host, "cloudflare.com")
            || host_matches(&host, "cloudflarestorage.com")
    }
}
