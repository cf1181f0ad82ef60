//! Host facade tying credentials, platforms and the export bridge together.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::AppConfig;
use mediabucket_common::{
    AttachmentRef, Diagnostics, Error, Result, Severity, TracingDiagnostics, UserId,
};
use mediabucket_credentials::{CredentialResolver, SettingsSnapshot, SettingsStore};
use mediabucket_crypto::SecretStore;
use mediabucket_export::{
    ExportBridge, ExportRecords, ExportRequest, FsLocalFiles, ImportItem, ImportPlan, LocalFiles,
    SqliteRecords,
};
use mediabucket_platform::{
    create_default_registry, ListingRequest, Platform, PlatformRegistry, QueryMode,
};
use mediabucket_storage::{ClientFactory, S3ClientFactory, StorageClient};
use mediabucket_tree::{AllowAll, Located, MimeFilter};

/// Objects of one directory, ready to be imported batch by batch.
#[derive(Debug, Clone, Serialize)]
pub struct ImportJob {
    pub platform: &'static str,
    pub plan: ImportPlan,
    pub batch_size: usize,
}

impl ImportJob {
    pub fn batches(&self) -> impl Iterator<Item = &[ImportItem]> + '_ {
        self.plan.batches(self.batch_size)
    }
}

/// What a URL means to the platform it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedUrl {
    pub platform: &'static str,
    pub key: String,
    /// URL in the form handed to the storage client.
    pub requested: String,
    pub mime_type: Option<String>,
}

/// Entry point for a host.
///
/// Credentials are resolved on every call; nothing is cached between
/// requests.
pub struct MediaBucket {
    registry: PlatformRegistry,
    resolver: CredentialResolver,
    clients: Arc<dyn ClientFactory>,
    bridge: ExportBridge,
    diagnostics: Arc<dyn Diagnostics>,
    filter: Box<dyn MimeFilter>,
    query_mode: QueryMode,
}

impl MediaBucket {
    /// Create a facade over the built-in platforms.
    pub fn new(
        settings: Arc<dyn SettingsStore>,
        secrets: Arc<dyn SecretStore>,
        clients: Arc<dyn ClientFactory>,
        local: Arc<dyn LocalFiles>,
        records: Arc<dyn ExportRecords>,
        diagnostics: Arc<dyn Diagnostics>,
    ) -> Self {
        let bridge = ExportBridge::new(local, records, clients.clone(), diagnostics.clone());
        Self {
            registry: create_default_registry(),
            resolver: CredentialResolver::new(settings, secrets),
            clients,
            bridge,
            diagnostics,
            filter: Box::new(AllowAll),
            query_mode: QueryMode::default(),
        }
    }

    /// Create a facade talking to real endpoints, as configured.
    ///
    /// # Errors
    /// - `Error::Config` if the settings or the secret setup are invalid
    /// - `Error::Database` if the records database cannot be opened
    pub fn from_config(config: &AppConfig, passphrase: Option<&str>) -> Result<Self> {
        let settings = SettingsSnapshot::load(&config.settings_path)?;
        let secrets = config.secret_store(passphrase)?;
        if let Some(parent) = config.records_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let records = SqliteRecords::open(&config.records_path)?;

        debug!(
            settings = %config.settings_path.display(),
            records = %config.records_path.display(),
            "Media bucket configured"
        );

        Ok(Self::new(
            Arc::new(settings),
            secrets,
            Arc::new(S3ClientFactory),
            Arc::new(FsLocalFiles),
            Arc::new(records),
            Arc::new(TracingDiagnostics),
        )
        .with_filter(config.mime_filter())
        .with_query_mode(config.query_mode))
    }

    pub fn with_registry(mut self, registry: PlatformRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_filter(mut self, filter: Box<dyn MimeFilter>) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_query_mode(mut self, mode: QueryMode) -> Self {
        self.query_mode = mode;
        self
    }

    pub fn registry(&self) -> &PlatformRegistry {
        &self.registry
    }

    /// Platform `name` bound to the fields resolved for `user`.
    ///
    /// # Errors
    /// - `Error::NotFound` if no platform has this name
    /// - `Error::Crypto` if a stored secret cannot be opened
    pub fn platform(&self, name: &str, user: Option<&UserId>) -> Result<Arc<dyn Platform>> {
        let descriptor = self.registry.descriptor(name)?;
        let fields = self.resolver.resolve(descriptor, user)?;
        self.registry.resolve(name, fields)
    }

    /// List a directory of a platform's bucket.
    ///
    /// Without `path` the bucket root is listed.
    pub async fn list(
        &self,
        name: &str,
        path: Option<&str>,
        user: Option<&UserId>,
    ) -> Result<Located> {
        let platform = self.platform(name, user)?;
        let client = self.client_for(platform.as_ref())?;
        let directory = platform.directory();
        let path = path.unwrap_or(directory.as_str());

        let request = ListingRequest::new(path)
            .with_filter(self.filter.as_ref())
            .with_shaper(self.query_mode.shaper());

        platform
            .list_directory(client.as_ref(), &request, self.diagnostics.as_ref())
            .await
    }

    /// Check the stored credentials of a platform against its bucket.
    pub async fn login(&self, name: &str, user: Option<&UserId>) -> Result<()> {
        let platform = self.platform(name, user)?;
        let client = self.client_for(platform.as_ref())?;
        platform.login(client.as_ref(), self.diagnostics.as_ref()).await
    }

    /// Export an attachment to whichever configured platform owns the target.
    ///
    /// Platforms are tried in registration order. A platform whose stored
    /// fields cannot be read is skipped with a warning. Returns the platform
    /// name and the public URL of the object.
    ///
    /// # Errors
    /// - `Error::NotThisPlatform` if no configured platform owns the target
    /// - Any export error of the owning platform
    pub async fn export_file(
        &self,
        request: &ExportRequest,
        user: Option<&UserId>,
    ) -> Result<(&'static str, String)> {
        for name in self.registry.platforms() {
            let platform = match self.platform(name, user) {
                Ok(platform) => platform,
                Err(err) => {
                    self.diagnostics.record(
                        &format!("Skipping {} for export: {}", name, err),
                        Severity::Warning,
                        &request.target,
                    );
                    continue;
                }
            };
            if platform.bucket_name().is_empty() {
                continue;
            }

            match self.bridge.export_file(platform.as_ref(), request).await {
                Ok(url) => return Ok((name, url)),
                Err(err) if err.is_not_this_platform() => continue,
                Err(err) => return Err(err),
            }
        }

        self.diagnostics.record(
            "No configured platform accepts this target",
            Severity::Error,
            &request.target,
        );
        Err(Error::NotThisPlatform(request.target.clone()))
    }

    /// Delete the object an attachment was exported to.
    ///
    /// # Errors
    /// - `Error::NotThisPlatform` if no platform recognizes the URL
    /// - Any delete error of the owning platform
    pub async fn delete_exported_file(
        &self,
        url: &str,
        attachment: &AttachmentRef,
        user: Option<&UserId>,
    ) -> Result<()> {
        let Some(name) = self.platform_for_url(url) else {
            self.diagnostics
                .record("No platform recognizes this URL", Severity::Error, url);
            return Err(Error::NotThisPlatform(url.to_string()));
        };
        let platform = self.platform(name, user)?;
        self.bridge
            .delete_exported_file(platform.as_ref(), url, attachment)
            .await
    }

    /// Name of the platform a URL is addressed to.
    pub fn platform_for_url(&self, url: &str) -> Option<&'static str> {
        self.registry.platform_for_url(url)
    }

    /// Plan the import of a listed directory.
    ///
    /// Directories that do not exist are reported like listings and plan the
    /// whole bucket.
    pub async fn import_plan(
        &self,
        name: &str,
        path: Option<&str>,
        recursive: bool,
        user: Option<&UserId>,
    ) -> Result<ImportJob> {
        let platform = self.platform(name, user)?;
        let located = self.list(name, path, user).await?;
        let plan = ImportPlan::from_tree(&located.tree, recursive);

        info!(platform = %name, directory = %plan.directory, files = plan.len(), "Import planned");
        Ok(ImportJob {
            platform: platform.name(),
            plan,
            batch_size: platform.import_limit(),
        })
    }

    /// Key, requested form and mime type of a URL.
    ///
    /// # Errors
    /// - `Error::NotThisPlatform` if no platform recognizes the URL
    pub fn resolve_url(&self, url: &str, user: Option<&UserId>) -> Result<ResolvedUrl> {
        let name = self
            .platform_for_url(url)
            .ok_or_else(|| Error::NotThisPlatform(url.to_string()))?;
        let platform = self.platform(name, user)?;

        Ok(ResolvedUrl {
            platform: name,
            key: platform.extract_key_from_url(url),
            requested: platform.requested_url(url, platform.fields()),
            mime_type: platform.mime_type_for_url(url),
        })
    }

    fn client_for(&self, platform: &dyn Platform) -> Result<Arc<dyn StorageClient>> {
        platform.build_client(self.clients.as_ref()).map_err(|err| {
            self.diagnostics
                .record(&err.to_string(), Severity::Error, platform.name());
            err
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mediabucket_common::MemoryDiagnostics;
    use mediabucket_crypto::{PlainSecretStore, SealedSecretStore, SecretKey};
    use mediabucket_export::{MemoryLocalFiles, MemoryRecords, KEY_FIELD};
    use mediabucket_storage::{Call, MemoryClient, MemoryClientFactory};
    use mediabucket_tree::{AllowList, Lookup};

    struct Fixture {
        bucket: MediaBucket,
        client: Arc<MemoryClient>,
        records: Arc<MemoryRecords>,
        diagnostics: Arc<MemoryDiagnostics>,
    }

    fn settings() -> SettingsSnapshot {
        let mut settings = SettingsSnapshot::new();
        settings.set_option("eml_aws_s3_credentials_vault", "global");
        settings.set_option("eml_aws_s3_access_key", "AKIA");
        settings.set_option("eml_aws_s3_secret", "s3cr3t");
        settings.set_option("eml_aws_s3_bucket", "media");
        settings.set_option("eml_aws_s3_region", "eu-central-1");

        settings.set_option("eml_backblaze_b2_credentials_vault", "global");
        settings.set_option("eml_backblaze_b2_access_key", "0040");
        settings.set_option("eml_backblaze_b2_secret", "K004");
        settings.set_option("eml_backblaze_b2_bucket", "archive");
        settings.set_option("eml_backblaze_b2_import_limit", "2");
        settings
    }

    fn fixture() -> Fixture {
        let client = Arc::new(MemoryClient::new());
        for key in ["a.jpg", "dir1/b.png", "dir1/dir2/c.mp4", "dir1/notes.xyz1"] {
            client.insert_at("media", key, vec![0; 8], Utc::now());
        }
        for key in ["x.jpg", "y.jpg", "z.jpg"] {
            client.insert_at("archive", key, vec![0; 8], Utc::now());
        }

        let local = Arc::new(MemoryLocalFiles::new());
        local.insert("/uploads/photo.jpg", b"jpeg".to_vec());
        let records = Arc::new(MemoryRecords::new());
        let diagnostics = Arc::new(MemoryDiagnostics::new());

        let bucket = MediaBucket::new(
            Arc::new(settings()),
            Arc::new(PlainSecretStore),
            Arc::new(MemoryClientFactory::new(client.clone())),
            local,
            records.clone(),
            diagnostics.clone(),
        );

        Fixture {
            bucket,
            client,
            records,
            diagnostics,
        }
    }

    #[tokio::test]
    async fn test_list_root_and_subdirectory() {
        let f = fixture();

        let root = f.bucket.list("aws-s3", None, None).await.unwrap();
        assert_eq!(root.lookup, Lookup::Base);
        assert_eq!(root.tree.key, "aws-s3://media/");

        let sub = f
            .bucket
            .list("aws-s3", Some("aws-s3://media/dir1/"), None)
            .await
            .unwrap();
        assert_eq!(sub.lookup, Lookup::Found);
        assert_eq!(sub.tree.key, "aws-s3://media/dir1/");
        assert_eq!(sub.tree.files[0].title, "b.png");
    }

    #[tokio::test]
    async fn test_list_with_filter_and_prefix_mode() {
        let f = fixture();
        let bucket = f
            .bucket
            .with_filter(Box::new(AllowList::new(["image/*"])))
            .with_query_mode(QueryMode::Prefix);

        let located = bucket
            .list("aws-s3", Some("aws-s3://media/dir1/"), None)
            .await
            .unwrap();
        assert_eq!(located.tree.file_count(), 1);
        assert!(f.client.calls().iter().any(|call| matches!(
            call,
            Call::List { prefix: Some(prefix), .. } if prefix == "dir1/"
        )));
    }

    #[tokio::test]
    async fn test_unconfigured_platform() {
        let f = fixture();
        let err = f.bucket.login("digitalocean-spaces", None).await.unwrap_err();
        assert!(matches!(err, Error::CredentialsMissing(_)));
        assert!(f.diagnostics.has(Severity::Error));

        assert!(matches!(
            f.bucket.list("gcs", None, None).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_login() {
        let f = fixture();
        f.bucket.login("aws-s3", None).await.unwrap();
    }

    #[tokio::test]
    async fn test_export_and_delete() {
        let f = fixture();
        f.client.publish("https://media.s3.eu-central-1.amazonaws.com/");
        let attachment = AttachmentRef::new("77").unwrap();
        let request = ExportRequest::new(
            attachment.clone(),
            "/uploads/photo.jpg",
            "aws-s3://media/2024/",
        );

        let (platform, url) = f.bucket.export_file(&request, None).await.unwrap();
        assert_eq!(platform, "aws-s3");
        assert_eq!(url, "https://media.s3.eu-central-1.amazonaws.com/2024/photo.jpg");
        assert_eq!(
            f.records.get(&attachment, KEY_FIELD).unwrap().as_deref(),
            Some("2024/photo.jpg")
        );

        f.bucket
            .delete_exported_file(&url, &attachment, None)
            .await
            .unwrap();
        assert!(!f.client.contains("media", "2024/photo.jpg"));
    }

    #[tokio::test]
    async fn test_export_to_unknown_target() {
        let f = fixture();
        let request = ExportRequest::new(
            AttachmentRef::new("1").unwrap(),
            "/uploads/photo.jpg",
            "/var/www/uploads/",
        );

        let err = f.bucket.export_file(&request, None).await.unwrap_err();
        assert!(err.is_not_this_platform());
        assert!(f.client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_export_skips_unreadable_platform() {
        let secrets = SealedSecretStore::new(SecretKey::from_bytes([5u8; 32]));
        let mut settings = settings();
        settings.set_option("eml_aws_s3_secret", "not sealed");
        settings.set_option("eml_backblaze_b2_secret", secrets.encrypt("K004").unwrap());

        let client = Arc::new(MemoryClient::new());
        client.publish("https://archive.s3.us-west-004.backblazeb2.com/");
        let local = Arc::new(MemoryLocalFiles::new());
        local.insert("/uploads/photo.jpg", b"jpeg".to_vec());
        let diagnostics = Arc::new(MemoryDiagnostics::new());

        let bucket = MediaBucket::new(
            Arc::new(settings),
            Arc::new(secrets),
            Arc::new(MemoryClientFactory::new(client.clone())),
            local,
            Arc::new(MemoryRecords::new()),
            diagnostics.clone(),
        );
        let request = ExportRequest::new(
            AttachmentRef::new("5").unwrap(),
            "/uploads/photo.jpg",
            "https://archive.s3.us-west-004.backblazeb2.com/",
        );

        let (platform, url) = bucket.export_file(&request, None).await.unwrap();
        assert_eq!(platform, "backblaze-b2");
        assert_eq!(url, "https://archive.s3.us-west-004.backblazeb2.com/photo.jpg");
        assert!(client.contains("archive", "photo.jpg"));
        assert!(diagnostics.has(Severity::Warning));
    }

    #[tokio::test]
    async fn test_import_plan_uses_platform_limit() {
        let f = fixture();
        let job = f
            .bucket
            .import_plan("backblaze-b2", None, true, None)
            .await
            .unwrap();

        assert_eq!(job.platform, "backblaze-b2");
        assert_eq!(job.batch_size, 2);
        assert_eq!(job.plan.len(), 3);
        assert_eq!(job.batches().count(), 2);
    }

    #[test]
    fn test_resolve_url() {
        let f = fixture();
        let resolved = f
            .bucket
            .resolve_url("https://archive.s3.us-west-004.backblazeb2.com/x.jpg", None)
            .unwrap();

        assert_eq!(resolved.platform, "backblaze-b2");
        assert_eq!(resolved.key, "x.jpg");
        assert_eq!(resolved.requested, "x.jpg");
        assert_eq!(resolved.mime_type.as_deref(), Some("image/jpeg"));

        assert!(f.bucket.resolve_url("https://example.com/x.jpg", None).is_err());
    }
}
