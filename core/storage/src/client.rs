//! Storage client trait definition.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use zeroize::Zeroize;

use mediabucket_common::{ObjectEntry, Result};

/// Parameters of one listing call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    pub bucket: String,
    pub prefix: Option<String>,
    pub delimiter: Option<String>,
}

impl ListQuery {
    /// Query for every object of a bucket.
    pub fn full(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            prefix: None,
            delimiter: None,
        }
    }

    /// Restrict the query to direct children of `prefix`.
    pub fn scoped(mut self, prefix: impl Into<String>, delimiter: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self.delimiter = Some(delimiter.into());
        self
    }
}

/// Connection settings for one storage endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub bucket: String,
    pub region: String,
    /// Custom endpoint URL; `None` means the AWS default for `region`.
    pub endpoint: Option<String>,
    /// Address buckets as `endpoint/bucket` instead of `bucket.endpoint`.
    pub path_style: bool,
    pub access_key: String,
    pub secret_key: String,
}

impl ClientConfig {
    /// Endpoint the client talks to.
    pub fn endpoint_url(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => format!("https://s3.{}.amazonaws.com", self.region),
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("path_style", &self.path_style)
            .field("access_key", &self.access_key)
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}

impl Drop for ClientConfig {
    fn drop(&mut self) {
        self.secret_key.zeroize();
    }
}

/// Client for an S3-compatible object store.
///
/// Implementations must not retry on their own; every call is a single
/// attempt and failures are reported as `Error::Transport` (or
/// `Error::UploadFailed` for `put`) with the HTTP status when available.
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// List the objects matching `query`.
    ///
    /// The returned sequence is treated as the authoritative content of the
    /// bucket for the duration of one request.
    async fn list(&self, query: &ListQuery) -> Result<Vec<ObjectEntry>>;

    /// Store `data` under `key`.
    async fn put(&self, bucket: &str, key: &str, data: Vec<u8>) -> Result<()>;

    /// Remove the object stored under `key`.
    async fn delete(&self, bucket: &str, key: &str) -> Result<()>;

    /// Issue a header-only request against a public URL and return the status.
    async fn head_status(&self, url: &str) -> Result<u16>;
}

/// Builds configured clients.
pub trait ClientFactory: Send + Sync {
    fn build(&self, config: &ClientConfig) -> Result<Arc<dyn StorageClient>>;
}
