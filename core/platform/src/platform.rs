//! Platform trait definition.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use crate::descriptor::ProviderDescriptor;
use crate::fields::PlatformFields;
use crate::query::{FullBucket, QueryShaper};
use mediabucket_common::{Diagnostics, Error, ObjectEntry, Result, Severity};
use mediabucket_storage::{ClientConfig, ClientFactory, ListQuery, StorageClient};
use mediabucket_tree::{directory_path, mime_for_name, reroot, AllowAll, Located, MimeFilter, TreeBuilder};

/// Parameters of one directory listing.
pub struct ListingRequest<'a> {
    /// Requested directory, in the platform's directory form.
    pub path: &'a str,
    pub filter: &'a dyn MimeFilter,
    pub shaper: &'a dyn QueryShaper,
}

impl<'a> ListingRequest<'a> {
    /// List `path` with every known mime type and one full-bucket call.
    pub fn new(path: &'a str) -> Self {
        Self {
            path,
            filter: &AllowAll,
            shaper: &FullBucket,
        }
    }

    pub fn with_filter(mut self, filter: &'a dyn MimeFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_shaper(mut self, shaper: &'a dyn QueryShaper) -> Self {
        self.shaper = shaper;
        self
    }
}

/// One S3-compatible storage provider bound to resolved fields.
///
/// Operations are stateless given the fields; nothing is cached between
/// calls. Every failure is recorded through the diagnostics sink before it
/// is returned.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Static description of the provider.
    fn descriptor(&self) -> &'static ProviderDescriptor;

    /// The resolved fields this platform works with.
    fn fields(&self) -> &PlatformFields;

    /// Directory marker for the configured bucket.
    fn url_mark(&self) -> String;

    /// Storage client settings derived from the fields.
    fn client_config(&self) -> ClientConfig;

    /// Public URL of an object.
    ///
    /// Pure string synthesis, no network call.
    fn public_url(&self, key: &str, fields: &PlatformFields) -> String;

    /// Recover the object key from a public URL.
    ///
    /// URLs of another shape come back unchanged; check `owns` or
    /// `is_url_compatible` first.
    fn extract_key_from_url(&self, url: &str) -> String;

    /// Whether `url` is addressed to this provider.
    fn is_url_compatible(&self, url: &str) -> bool;

    fn name(&self) -> &'static str {
        self.descriptor().name
    }

    fn label(&self) -> &'static str {
        self.descriptor().label
    }

    fn bucket_name(&self) -> &str {
        self.fields().value("bucket")
    }

    /// Root marker of this platform, `/` while no bucket is configured.
    fn directory(&self) -> String {
        if self.bucket_name().is_empty() {
            return "/".to_string();
        }
        self.url_mark()
    }

    /// Whether a path lies below this platform's directory.
    fn owns(&self, path: &str) -> bool {
        path.starts_with(self.directory().as_str())
    }

    /// Whether `url` lies below this platform's directory or its bucket's
    /// public URL.
    ///
    /// Other buckets on the same provider host are not owned.
    fn owns_url(&self, url: &str) -> bool {
        if self.owns(url) {
            return true;
        }
        !self.bucket_name().is_empty()
            && url.starts_with(self.public_url("", self.fields()).as_str())
    }

    /// URL in the form the storage client expects.
    fn requested_url(&self, url: &str, _fields: &PlatformFields) -> String {
        url.to_string()
    }

    /// Requested directory relative to the bucket root.
    ///
    /// `None` for the bucket root or for paths outside this platform.
    fn requested_prefix(&self, requested: &str) -> Option<String> {
        let directory = self.directory();
        let rest = requested.strip_prefix(directory.as_str())?;
        let rest = rest.trim_start_matches('/').replace("//", "/");
        if rest.is_empty() {
            return None;
        }
        Some(directory_path(&rest))
    }

    /// Mime type of the object behind a URL, guessed from its name.
    fn mime_type_for_url(&self, url: &str) -> Option<String> {
        let key = self.extract_key_from_url(url);
        let name = key.rsplit('/').next().unwrap_or_default();
        mime_for_name(name)
    }

    /// Files per import batch.
    fn import_limit(&self) -> usize {
        self.fields()
            .value("import_limit")
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|limit| *limit > 0)
            .unwrap_or(self.descriptor().import_limit)
    }

    /// Build a storage client for the configured endpoint.
    ///
    /// # Errors
    /// - `Error::CredentialsMissing` if a required field is empty
    fn build_client(&self, factory: &dyn ClientFactory) -> Result<Arc<dyn StorageClient>> {
        let missing: Vec<&str> = self
            .descriptor()
            .fields
            .iter()
            .filter(|spec| spec.required && self.fields().value(spec.name).is_empty())
            .map(|spec| spec.name)
            .collect();

        if !missing.is_empty() {
            return Err(Error::CredentialsMissing(format!(
                "{} requires {}",
                self.label(),
                missing.join(", ")
            )));
        }

        factory.build(&self.client_config())
    }

    /// Whether an object is reachable through its public URL.
    ///
    /// Issues one header-only request; only HTTP 200 counts.
    async fn is_publicly_available(&self, key: &str, client: &dyn StorageClient) -> bool {
        let url = self.public_url(key, self.fields());
        match client.head_status(&url).await {
            Ok(status) => {
                debug!(url = %url, status, "Public availability checked");
                status == 200
            }
            Err(err) => {
                debug!(url = %url, error = %err, "Public availability check failed");
                false
            }
        }
    }

    /// Check that the fields grant access to the bucket.
    ///
    /// # Errors
    /// - `Error::CredentialsMissing` if no fields are set
    /// - `Error::Transport` with the provider's status if the bucket cannot be listed
    async fn login(&self, client: &dyn StorageClient, diagnostics: &dyn Diagnostics) -> Result<()> {
        if self.fields().is_empty() || self.bucket_name().is_empty() {
            let message = format!("No credentials set for this {} connection", self.label());
            diagnostics.record(&message, Severity::Error, self.name());
            return Err(Error::CredentialsMissing(message));
        }

        match client.list(&ListQuery::full(self.bucket_name())).await {
            Ok(_) => {
                info!(platform = %self.name(), bucket = %self.bucket_name(), "Login succeeded");
                Ok(())
            }
            Err(err) => {
                diagnostics.record(
                    &rejection_message(self.label(), &err),
                    Severity::Error,
                    self.name(),
                );
                Err(err)
            }
        }
    }

    /// List the bucket and locate the requested directory.
    ///
    /// Issues exactly one list call whose result is taken as the complete
    /// bucket content. An empty bucket yields an empty tree.
    ///
    /// # Errors
    /// - `Error::CredentialsMissing` if no bucket is configured
    /// - `Error::Transport` if the list call fails
    async fn list_directory(
        &self,
        client: &dyn StorageClient,
        request: &ListingRequest<'_>,
        diagnostics: &dyn Diagnostics,
    ) -> Result<Located> {
        if self.bucket_name().is_empty() {
            let message = format!("No bucket configured for {}", self.label());
            diagnostics.record(&message, Severity::Error, self.name());
            return Err(Error::CredentialsMissing(message));
        }

        let query = request.shaper.shape(
            ListQuery::full(self.bucket_name()),
            self.requested_prefix(request.path).as_deref(),
        );

        let objects = match client.list(&query).await {
            Ok(objects) => objects,
            Err(err) => {
                diagnostics.record(
                    &rejection_message(self.label(), &err),
                    Severity::Error,
                    request.path,
                );
                return Err(err);
            }
        };

        if objects.is_empty() {
            diagnostics.record(
                &format!("No files returned from {}", self.label()),
                Severity::Info,
                request.path,
            );
        }

        let located = locate(self, &objects, request);
        if located.is_not_found() {
            diagnostics.record(
                "Requested directory not found, showing the whole bucket",
                Severity::Warning,
                request.path,
            );
        }
        Ok(located)
    }
}

fn rejection_message(label: &str, err: &Error) -> String {
    match err.status() {
        Some(status) => format!(
            "Credentials and/or bucket are not valid. {} returns with HTTP-Status {}",
            label, status
        ),
        None => format!("Credentials and/or bucket are not valid: {}", err),
    }
}

/// Build the tree of one listing and re-root it at the request.
fn locate<P: Platform + ?Sized>(
    platform: &P,
    objects: &[ObjectEntry],
    request: &ListingRequest<'_>,
) -> Located {
    let base = platform.directory();
    let fields = platform.fields();
    let public_url = |key: &str| platform.public_url(key, fields);

    let tree = TreeBuilder::new(&base, &public_url, request.filter).build(objects);
    reroot(tree, request.path, &base)
}
