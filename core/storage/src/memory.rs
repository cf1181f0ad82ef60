//! In-memory storage client for testing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::client::{ClientConfig, ClientFactory, ListQuery, StorageClient};
use mediabucket_common::{Error, ObjectEntry, Result};

/// In-memory stored object.
#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    last_modified: DateTime<Utc>,
}

/// A call observed by the memory client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List {
        bucket: String,
        prefix: Option<String>,
        delimiter: Option<String>,
    },
    Put {
        bucket: String,
        key: String,
    },
    Delete {
        bucket: String,
        key: String,
    },
    Head {
        url: String,
    },
}

/// In-memory storage client.
///
/// Buckets keep their keys sorted like an S3 listing does. Every call is
/// recorded so tests can assert which requests were (or were not) issued.
/// URLs below a published prefix answer `head_status` with 200, all other
/// URLs with 403.
pub struct MemoryClient {
    buckets: RwLock<HashMap<String, BTreeMap<String, StoredObject>>>,
    public_prefixes: RwLock<Vec<String>>,
    failure: RwLock<Option<u16>>,
    calls: RwLock<Vec<Call>>,
}

impl MemoryClient {
    /// Create a new empty client.
    pub fn new() -> Self {
        Self {
            buckets: RwLock::new(HashMap::new()),
            public_prefixes: RwLock::new(Vec::new()),
            failure: RwLock::new(None),
            calls: RwLock::new(Vec::new()),
        }
    }

    /// Store an object without recording a call.
    pub fn insert(&self, bucket: &str, key: &str, data: Vec<u8>) {
        self.insert_at(bucket, key, data, Utc::now());
    }

    /// Store an object with an explicit modification time.
    pub fn insert_at(&self, bucket: &str, key: &str, data: Vec<u8>, last_modified: DateTime<Utc>) {
        self.buckets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(bucket.to_string())
            .or_default()
            .insert(
                key.to_string(),
                StoredObject {
                    data,
                    last_modified,
                },
            );
    }

    /// Check whether an object exists.
    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        self.buckets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(bucket)
            .is_some_and(|objects| objects.contains_key(key))
    }

    /// Get a copy of an object's content.
    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.buckets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .map(|object| object.data.clone())
    }

    /// Make every URL starting with `prefix` publicly reachable.
    pub fn publish(&self, prefix: impl Into<String>) {
        self.public_prefixes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(prefix.into());
    }

    /// Fail every subsequent call with the given HTTP status.
    ///
    /// `None` restores normal operation.
    pub fn fail_with(&self, status: Option<u16>) {
        *self.failure.write().unwrap_or_else(PoisonError::into_inner) = status;
    }

    /// All calls observed so far.
    pub fn calls(&self) -> Vec<Call> {
        self.calls
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, call: Call) {
        self.calls
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }

    fn injected_failure(&self) -> Option<u16> {
        *self.failure.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageClient for MemoryClient {
    async fn list(&self, query: &ListQuery) -> Result<Vec<ObjectEntry>> {
        self.record(Call::List {
            bucket: query.bucket.clone(),
            prefix: query.prefix.clone(),
            delimiter: query.delimiter.clone(),
        });

        if let Some(status) = self.injected_failure() {
            return Err(Error::Transport {
                status: Some(status),
                message: format!("ListObjectsV2 on '{}' rejected", query.bucket),
            });
        }

        let buckets = self.buckets.read().unwrap_or_else(PoisonError::into_inner);
        let objects = buckets
            .get(&query.bucket)
            .ok_or_else(|| Error::Transport {
                status: Some(404),
                message: format!("Bucket not found: {}", query.bucket),
            })?;

        let prefix = query.prefix.as_deref().unwrap_or("");
        let mut results = Vec::new();
        for (key, object) in objects.iter() {
            let Some(rest) = key.strip_prefix(prefix) else {
                continue;
            };

            // With a delimiter only direct children are returned
            if let Some(delimiter) = query.delimiter.as_deref() {
                if rest.contains(delimiter) {
                    continue;
                }
            }

            results.push(ObjectEntry::new(
                key.clone(),
                object.data.len() as u64,
                object.last_modified,
            ));
        }

        Ok(results)
    }

    async fn put(&self, bucket: &str, key: &str, data: Vec<u8>) -> Result<()> {
        self.record(Call::Put {
            bucket: bucket.to_string(),
            key: key.to_string(),
        });

        if let Some(status) = self.injected_failure() {
            return Err(Error::UploadFailed {
                status: Some(status),
                message: format!("PutObject '{}' rejected", key),
            });
        }

        self.insert(bucket, key, data);
        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<()> {
        self.record(Call::Delete {
            bucket: bucket.to_string(),
            key: key.to_string(),
        });

        if let Some(status) = self.injected_failure() {
            return Err(Error::Transport {
                status: Some(status),
                message: format!("DeleteObject '{}' rejected", key),
            });
        }

        // S3 answers deletes of missing keys with success as well
        if let Some(objects) = self
            .buckets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(bucket)
        {
            objects.remove(key);
        }
        Ok(())
    }

    async fn head_status(&self, url: &str) -> Result<u16> {
        self.record(Call::Head {
            url: url.to_string(),
        });

        if let Some(status) = self.injected_failure() {
            return Ok(status);
        }

        let public = self
            .public_prefixes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|prefix| url.starts_with(prefix.as_str()));

        Ok(if public { 200 } else { 403 })
    }
}

/// Factory handing out one shared memory client.
///
/// Remembers every configuration it was asked to build a client for.
pub struct MemoryClientFactory {
    client: Arc<MemoryClient>,
    configs: Mutex<Vec<ClientConfig>>,
}

impl MemoryClientFactory {
    pub fn new(client: Arc<MemoryClient>) -> Self {
        Self {
            client,
            configs: Mutex::new(Vec::new()),
        }
    }

    /// The shared client.
    pub fn client(&self) -> Arc<MemoryClient> {
        self.client.clone()
    }

    /// Configurations passed to `build` so far.
    pub fn configs(&self) -> Vec<ClientConfig> {
        self.configs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ClientFactory for MemoryClientFactory {
    fn build(&self, config: &ClientConfig) -> Result<Arc<dyn StorageClient>> {
        self.configs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(config.clone());
        Ok(self.client.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> MemoryClient {
        let client = MemoryClient::new();
        client.insert("media", "a.txt", vec![1]);
        client.insert("media", "photos/b.jpg", vec![1, 2]);
        client.insert("media", "photos/2024/c.jpg", vec![1, 2, 3]);
        client
    }

    #[tokio::test]
    async fn test_full_listing_is_sorted() {
        let client = seeded();
        let objects = client.list(&ListQuery::full("media")).await.unwrap();

        let keys: Vec<_> = objects.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["a.txt", "photos/2024/c.jpg", "photos/b.jpg"]);
        assert_eq!(objects[1].size, 3);
    }

    #[tokio::test]
    async fn test_scoped_listing() {
        let client = seeded();
        let query = ListQuery::full("media").scoped("photos/", "/");
        let objects = client.list(&query).await.unwrap();

        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].key, "photos/b.jpg");
    }

    #[tokio::test]
    async fn test_missing_bucket_is_transport_error() {
        let client = MemoryClient::new();
        let err = client.list(&ListQuery::full("nope")).await.unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn test_put_delete() {
        let client = MemoryClient::new();
        client.put("media", "x.png", vec![9]).await.unwrap();
        assert!(client.contains("media", "x.png"));
        assert_eq!(client.object("media", "x.png"), Some(vec![9]));

        client.delete("media", "x.png").await.unwrap();
        assert!(!client.contains("media", "x.png"));
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let client = seeded();
        client.fail_with(Some(403));

        let err = client.list(&ListQuery::full("media")).await.unwrap_err();
        assert_eq!(err.status(), Some(403));

        let err = client.put("media", "y", vec![]).await.unwrap_err();
        assert!(matches!(err, Error::UploadFailed { status: Some(403), .. }));

        client.fail_with(None);
        assert!(client.list(&ListQuery::full("media")).await.is_ok());
    }

    #[tokio::test]
    async fn test_head_status_follows_published_prefixes() {
        let client = MemoryClient::new();
        client.publish("https://media.s3.eu-central-1.amazonaws.com/");

        let ok = client
            .head_status("https://media.s3.eu-central-1.amazonaws.com/a.jpg")
            .await
            .unwrap();
        let denied = client.head_status("https://other.example.com/a.jpg").await.unwrap();

        assert_eq!(ok, 200);
        assert_eq!(denied, 403);
    }

    #[tokio::test]
    async fn test_calls_are_recorded() {
        let client = seeded();
        client.list(&ListQuery::full("media")).await.unwrap();
        client.delete("media", "a.txt").await.unwrap();

        let calls = client.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(
            calls[1],
            Call::Delete {
                bucket: "media".to_string(),
                key: "a.txt".to_string()
            }
        );
    }
}
