use crate::descriptor::{FieldKind, FieldSpec, ProviderDescriptor};
use crate::fields::PlatformFields;
use crate::platform::Platform;
use crate::providers::{host_matches, host_of, strip_any};
use mediabucket_storage::ClientConfig;

const SCHEME: &str = "aws-s3://";

static FIELDS: &[FieldSpec] = &[
    FieldSpec::text("access_key", "Access key").credential(),
    FieldSpec::secret("secret", "Secret key"),
    FieldSpec::text("bucket", "Bucket"),
    FieldSpec::text("region", "Region")
        .with_kind(FieldKind::Select)
        .with_default("us-east-1"),
];

static DESCRIPTOR: ProviderDescriptor = ProviderDescriptor {
    name: "aws-s3",
    label: "AWS S3",
    settings_prefix: "eml_aws_s3",
    public_url_template: "https://{bucket}.s3.{region}.amazonaws.com/{key}",
    fields: FIELDS,
    regions: &[
        "us-east-1",
        "us-east-2",
        "us-west-1",
        "us-west-2",
        "ca-central-1",
        "eu-central-1",
        "eu-west-1",
        "eu-west-2",
        "eu-west-3",
        "eu-north-1",
        "eu-south-1",
        "ap-south-1",
        "ap-northeast-1",
        "ap-northeast-2",
        "ap-southeast-1",
        "ap-southeast-2",
        "sa-east-1",
    ],
    import_limit: 10,
};

/// Amazon S3.
#[derive(Debug, Clone)]
pub struct AwsS3 {
    fields: PlatformFields,
}

impl AwsS3 {
    pub fn new(fields: PlatformFields) -> Self {
        Self { fields }
    }

    /// Provider metadata, available without resolved fields.
    pub fn describe() -> &'static ProviderDescriptor {
        &DESCRIPTOR
    }

    fn public_prefix(fields: &PlatformFields) -> String {
        format!(
            "https://{}.s3.{}.amazonaws.com/",
            fields.value("bucket"),
            fields.value("region")
        )
    }
}

impl Platform for AwsS3 {
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
            region: self.fields.value("region").to_string(),
            endpoint: None,
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
        url.starts_with(SCHEME) || host_matches(&host_of(url), "amazonaws.com")
    }
}
