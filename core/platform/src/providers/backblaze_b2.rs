use crate::descriptor::{FieldKind, FieldSpec, ProviderDescriptor};
use crate::fields::PlatformFields;
use crate::platform::Platform;
use crate::providers::{host_matches, host_of, strip_any};
use mediabucket_storage::ClientConfig;

static FIELDS: &[FieldSpec] = &[
    FieldSpec::text("access_key", "Application key ID").credential(),
    FieldSpec::secret("secret", "Application key"),
    FieldSpec::text("bucket", "Bucket"),
    FieldSpec::text("region", "Region")
        .with_kind(FieldKind::Select)
        .with_default("us-west-004"),
    FieldSpec::text("import_limit", "Max. files to load during import per iteration")
        .with_kind(FieldKind::Number)
        .with_default("10")
        .optional()
        .setting(),
];

static DESCRIPTOR: ProviderDescriptor = ProviderDescriptor {
    name: "backblaze-b2",
    label: "Backblaze B2",
    settings_prefix: "eml_backblaze_b2",
    public_url_template: "https://{bucket}.s3.{region}.backblazeb2.com/{key}",
    fields: FIELDS,
    regions: &["us-west-004", "us-east-005", "eu-central-003", "ap-southeast-002"],
    import_limit: 10,
};

/// Backblaze B2 through its S3-compatible API.
///
/// The directory marker is the public bucket URL itself, so listings and
/// public URLs share one shape.
#[derive(Debug, Clone)]
pub struct BackblazeB2 {
    fields: PlatformFields,
}

impl BackblazeB2 {
    pub fn new(fields: PlatformFields) -> Self {
        Self { fields }
    }

    pub fn describe() -> &'static ProviderDescriptor {
        &DESCRIPTOR
    }

    fn public_prefix(fields: &PlatformFields) -> String {
        format!(
            "https://{}.s3.{}.backblazeb2.com/",
            fields.value("bucket"),
            fields.value("region")
        )
    }
}

impl Platform for BackblazeB2 {
    fn descriptor(&self) -> &'static ProviderDescriptor {
        &DESCRIPTOR
    }

    fn fields(&self) -> &PlatformFields {
        &self.fields
    }

    fn url_mark(&self) -> String {
        Self::public_prefix(&self.fields)
    }

    fn client_config(&self) -> ClientConfig {
        let region = self.fields.value("region");
        ClientConfig {
            bucket: self.bucket_name().to_string(),
            region: region.to_string(),
            endpoint: Some(format!("https://s3.{}.backblazeb2.com", region)),
            path_style: false,
            access_key: self.fields.value("access_key").to_string(),
            secret_key: self.fields.value("secret").to_string(),
        }
    }

    fn public_url(&self, key: &str, fields: &PlatformFields) -> String {
        format!("{}{}", Self::public_prefix(fields), key)
    }

    fn extract_key_from_url(&self, url: &str) -> String {
        strip_any(url, &[Self::public_prefix(&self.fields)]).to_string()
    }

    fn requested_url(&self, url: &str, _fields: &PlatformFields) -> String {
        url.replace(&self.url_mark(), "")
    }

    fn is_url_compatible(&self, url: &str) -> bool {
        host_matches(&host_of(url), "backblazeb2.com")
    }
}
