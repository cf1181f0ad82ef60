//! S3-compatible storage client.
//!
//! Speaks the S3 wire protocol through `rust-s3`. Public reachability
//! probes go through a plain HTTP client since they must run without
//! request signing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use s3::bucket::Bucket;
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::serde_types::ListBucketResult;
use s3::Region;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::client::{ClientConfig, ClientFactory, ListQuery, StorageClient};
use mediabucket_common::{Error, ObjectEntry, Result};

const USER_AGENT: &str = concat!("mediabucket/", env!("CARGO_PKG_VERSION"));

/// Storage client for any S3-compatible endpoint.
pub struct S3Client {
    region: Region,
    credentials: Credentials,
    path_style: bool,
    http: reqwest::Client,
}

impl S3Client {
    /// Create a client from connection settings.
    ///
    /// # Errors
    /// - `Error::CredentialsMissing` if the credential pair is rejected
    /// - `Error::Transport` if the HTTP client cannot be built
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let credentials = Credentials::new(
            Some(&config.access_key),
            Some(&config.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| Error::CredentialsMissing(format!("Invalid credentials: {}", e)))?;

        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: config.endpoint_url(),
        };

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            region,
            credentials,
            path_style: config.path_style,
            http,
        })
    }

    fn bucket(&self, name: &str) -> Result<Box<Bucket>> {
        let bucket = Bucket::new(name, self.region.clone(), self.credentials.clone())
            .map_err(map_s3_error)?;

        Ok(if self.path_style {
            bucket.with_path_style()
        } else {
            bucket
        })
    }
}

/// Map a rust-s3 error to a transport error, keeping the status if known.
fn map_s3_error(err: S3Error) -> Error {
    match err {
        S3Error::HttpFailWithBody(status, body) => Error::Transport {
            status: Some(status),
            message: body,
        },
        other => Error::transport(other.to_string()),
    }
}

fn check_status(status: u16, action: &str, key: &str) -> Result<()> {
    if (200..300).contains(&status) {
        Ok(())
    } else {
        Err(Error::Transport {
            status: Some(status),
            message: format!("{} '{}' rejected", action, key),
        })
    }
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_default()
}

fn entries_from_page(page: ListBucketResult) -> Vec<ObjectEntry> {
    page.contents
        .into_iter()
        .map(|object| {
            let last_modified = parse_timestamp(&object.last_modified);
            ObjectEntry::new(object.key, object.size, last_modified)
        })
        .collect()
}

#[async_trait]
impl StorageClient for S3Client {
    /// One ListObjectsV2 request. The first page is authoritative; no
    /// continuation token is followed.
    async fn list(&self, query: &ListQuery) -> Result<Vec<ObjectEntry>> {
        let bucket = self.bucket(&query.bucket)?;
        let prefix = query.prefix.clone().unwrap_or_default();

        let (page, status) = bucket
            .list_page(prefix, query.delimiter.clone(), None, None, None)
            .await
            .map_err(map_s3_error)?;
        check_status(status, "ListObjectsV2", &query.bucket)?;

        if page.is_truncated {
            debug!(bucket = %query.bucket, "Listing truncated, using first page only");
        }

        let objects = entries_from_page(page);
        debug!(bucket = %query.bucket, count = objects.len(), "Listed objects");
        Ok(objects)
    }

    async fn put(&self, bucket: &str, key: &str, data: Vec<u8>) -> Result<()> {
        let size = data.len();
        let response = self
            .bucket(bucket)?
            .put_object(key, &data)
            .await
            .map_err(|e| match map_s3_error(e) {
                Error::Transport { status, message } => Error::UploadFailed { status, message },
                other => other,
            })?;

        let status = response.status_code();
        if !(200..300).contains(&status) {
            warn!(bucket = %bucket, key = %key, status, "PutObject rejected");
            return Err(Error::UploadFailed {
                status: Some(status),
                message: format!("PutObject '{}' rejected", key),
            });
        }

        debug!(bucket = %bucket, key = %key, size, "Object stored");
        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<()> {
        let response = self
            .bucket(bucket)?
            .delete_object(key)
            .await
            .map_err(map_s3_error)?;

        check_status(response.status_code(), "DeleteObject", key)?;
        debug!(bucket = %bucket, key = %key, "Object deleted");
        Ok(())
    }

    async fn head_status(&self, url: &str) -> Result<u16> {
        let response = self
            .http
            .head(url)
            .send()
            .await
            .map_err(|e| Error::transport(format!("HEAD {} failed: {}", url, e)))?;

        Ok(response.status().as_u16())
    }
}

/// Builds `S3Client`s.
#[derive(Debug, Default, Clone, Copy)]
pub struct S3ClientFactory;

impl ClientFactory for S3ClientFactory {
    fn build(&self, config: &ClientConfig) -> Result<Arc<dyn StorageClient>> {
        Ok(Arc::new(S3Client::new(config)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use s3::serde_types::Object;

    fn config() -> ClientConfig {
        ClientConfig {
            bucket: "media".to_string(),
            region: "auto".to_string(),
            endpoint: Some("https://acc.r2.cloudflarestorage.com".to_string()),
            path_style: true,
            access_key: "key".to_string(),
            secret_key: "secret".to_string(),
        }
    }

    #[test]
    fn test_client_uses_custom_endpoint() {
        let client = S3Client::new(&config()).unwrap();
        match &client.region {
            Region::Custom { region, endpoint } => {
                assert_eq!(region, "auto");
                assert_eq!(endpoint, "https://acc.r2.cloudflarestorage.com");
            }
            other => panic!("unexpected region {:?}", other),
        }
        assert!(client.path_style);
    }

    #[test]
    fn test_status_error_keeps_code() {
        let err = map_s3_error(S3Error::HttpFailWithBody(403, "AccessDenied".to_string()));
        assert_eq!(err.status(), Some(403));
    }

    #[test]
    fn test_check_status() {
        assert!(check_status(204, "DeleteObject", "a").is_ok());
        let err = check_status(500, "DeleteObject", "a").unwrap_err();
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn test_parse_timestamp() {
        let parsed = parse_timestamp("2024-03-01T10:00:00.000Z");
        assert_eq!(parsed.to_rfc3339(), "2024-03-01T10:00:00+00:00");
        assert_eq!(parse_timestamp("garbage"), DateTime::<Utc>::default());
    }

    #[test]
    fn test_truncated_page_is_taken_as_is() {
        let object = |key: &str| Object {
            last_modified: "2024-03-01T10:00:00.000Z".to_string(),
            e_tag: None,
            storage_class: None,
            key: key.to_string(),
            owner: None,
            size: 4,
        };
        let page = ListBucketResult {
            name: "media".to_string(),
            delimiter: None,
            max_keys: Some(2),
            prefix: None,
            continuation_token: None,
            encoding_type: None,
            is_truncated: true,
            next_continuation_token: Some("token".to_string()),
            contents: vec![object("a.jpg"), object("b/c.png")],
            common_prefixes: None,
        };

        let entries = entries_from_page(page);
        let keys: Vec<&str> = entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["a.jpg", "b/c.png"]);
        assert_eq!(entries[1].size, 4);
    }

    #[test]
    fn test_factory_builds_client() {
        assert!(S3ClientFactory.build(&config()).is_ok());
    }
}
