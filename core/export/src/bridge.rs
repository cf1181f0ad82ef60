//! Export of local attachments into a bucket and their removal.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use crate::local::LocalFiles;
use crate::records::{ExportRecords, KEY_FIELD};
use mediabucket_common::{AttachmentRef, Diagnostics, Error, Result, Severity};
use mediabucket_platform::Platform;
use mediabucket_storage::ClientFactory;

/// One attachment to export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    pub attachment: AttachmentRef,
    /// File on the local disk holding the attachment's bytes.
    pub local_path: PathBuf,
    /// Target the host wants the file exported to.
    pub target: String,
    /// Directory marker the object key is derived from.
    pub directory: String,
}

impl ExportRequest {
    /// Export into `target`, which also serves as the key directory.
    pub fn new(
        attachment: AttachmentRef,
        local_path: impl Into<PathBuf>,
        target: impl Into<String>,
    ) -> Self {
        let target = target.into();
        Self {
            attachment,
            local_path: local_path.into(),
            directory: target.clone(),
            target,
        }
    }

    pub fn with_directory(mut self, directory: impl Into<String>) -> Self {
        self.directory = directory.into();
        self
    }

    /// Object key for this request on `platform`.
    ///
    /// The platform directory is removed from the request directory and the
    /// local file's name is appended.
    ///
    /// # Errors
    /// - `Error::InvalidInput` if the local path has no file name
    pub fn object_key(&self, platform: &dyn Platform) -> Result<String> {
        let basename = self
            .local_path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                Error::InvalidInput(format!(
                    "No file name in {}",
                    self.local_path.display()
                ))
            })?;

        let root = platform.directory();
        let relative = match self.directory.strip_prefix(root.as_str()) {
            Some(rest) => rest.to_string(),
            None => self.directory.replacen(root.as_str(), "", 1),
        };
        let relative = relative.trim_start_matches('/');

        if relative.is_empty() {
            Ok(basename.to_string())
        } else if relative.ends_with('/') {
            Ok(format!("{}{}", relative, basename))
        } else {
            Ok(format!("{}/{}", relative, basename))
        }
    }
}

/// Moves attachments between the host and a bucket.
///
/// Every failure is recorded through the diagnostics sink before it is
/// returned. `NotThisPlatform` is recorded at debug level only, since the
/// caller is expected to try the next platform.
pub struct ExportBridge {
    local: Arc<dyn LocalFiles>,
    records: Arc<dyn ExportRecords>,
    clients: Arc<dyn ClientFactory>,
    diagnostics: Arc<dyn Diagnostics>,
}

impl ExportBridge {
    pub fn new(
        local: Arc<dyn LocalFiles>,
        records: Arc<dyn ExportRecords>,
        clients: Arc<dyn ClientFactory>,
        diagnostics: Arc<dyn Diagnostics>,
    ) -> Self {
        Self {
            local,
            records,
            clients,
            diagnostics,
        }
    }

    /// Upload a local attachment and return its public URL.
    ///
    /// # Preconditions
    /// - `request.target` lies below the platform directory
    /// - The local file exists
    ///
    /// # Postconditions
    /// - The object is stored under the derived key
    /// - The key is recorded under `s3_key` only if the object is public
    ///
    /// # Errors
    /// - `Error::NotThisPlatform` if the target belongs elsewhere; nothing is read or sent
    /// - `Error::LocalFileMissing` if the local file does not exist
    /// - `Error::CredentialsMissing` if the platform cannot build a client
    /// - `Error::UploadFailed` if the upload is rejected
    /// - `Error::NotPublic` if the object is not reachable through its public URL;
    ///   the uploaded object is left in place
    pub async fn export_file(
        &self,
        platform: &dyn Platform,
        request: &ExportRequest,
    ) -> Result<String> {
        if !platform.owns(&request.target) {
            self.diagnostics.record(
                &format!("Given path is not a {} URL", platform.label()),
                Severity::Debug,
                &request.target,
            );
            return Err(Error::NotThisPlatform(request.target.clone()));
        }

        let local_path = request.local_path.display().to_string();
        if !self.local.exists(&request.local_path).await {
            self.diagnostics.record(
                "Local file for export does not exist",
                Severity::Error,
                &local_path,
            );
            return Err(Error::LocalFileMissing(local_path));
        }

        let key = self.reported(request.object_key(platform), &local_path)?;
        let client = self.reported(platform.build_client(self.clients.as_ref()), platform.name())?;
        let data = self.reported(self.local.read(&request.local_path).await, &local_path)?;

        debug!(
            platform = %platform.name(),
            bucket = %platform.bucket_name(),
            key = %key,
            size = data.len(),
            "Uploading attachment"
        );

        if let Err(err) = client.put(platform.bucket_name(), &key, data).await {
            let err = match err {
                Error::UploadFailed { .. } => err,
                other => Error::UploadFailed {
                    status: other.status(),
                    message: other.to_string(),
                },
            };
            self.diagnostics.record(
                &format!("Error during upload of file to {}: {}", platform.label(), err),
                Severity::Error,
                &key,
            );
            return Err(err);
        }

        if !platform.is_publicly_available(&key, client.as_ref()).await {
            let url = platform.public_url(&key, platform.fields());
            self.diagnostics.record(
                &format!(
                    "File has been uploaded to {} but would not be public available. Check the bucket permissions.",
                    platform.label()
                ),
                Severity::Error,
                &url,
            );
            return Err(Error::NotPublic(url));
        }

        self.reported(
            self.records.set(&request.attachment, KEY_FIELD, &key),
            request.attachment.as_str(),
        )?;

        let url = platform.public_url(&key, platform.fields());
        info!(
            platform = %platform.name(),
            attachment = %request.attachment,
            url = %url,
            "Attachment exported"
        );
        Ok(url)
    }

    /// Delete the object an attachment was exported to.
    ///
    /// # Postconditions
    /// - One delete call for the recorded key; the record itself is kept
    ///
    /// # Errors
    /// - `Error::NotThisPlatform` if `url` belongs elsewhere
    /// - `Error::NotFound` if the attachment has no recorded key; nothing is deleted
    /// - `Error::CredentialsMissing` if the platform cannot build a client
    /// - `Error::Transport` if the storage rejects the delete
    pub async fn delete_exported_file(
        &self,
        platform: &dyn Platform,
        url: &str,
        attachment: &AttachmentRef,
    ) -> Result<()> {
        if !platform.owns_url(url) {
            self.diagnostics.record(
                &format!("Given URL is not a {} URL", platform.label()),
                Severity::Debug,
                url,
            );
            return Err(Error::NotThisPlatform(url.to_string()));
        }

        let key = self.reported(self.records.get(attachment, KEY_FIELD), attachment.as_str())?;
        let Some(key) = key.filter(|key| !key.is_empty()) else {
            let message = format!("No exported object recorded for attachment {}", attachment);
            self.diagnostics.record(&message, Severity::Error, url);
            return Err(Error::NotFound(message));
        };

        let client = self.reported(platform.build_client(self.clients.as_ref()), platform.name())?;

        if let Err(err) = client.delete(platform.bucket_name(), &key).await {
            self.diagnostics.record(
                &format!("Error during deleting of file on {}: {}", platform.label(), err),
                Severity::Error,
                &key,
            );
            return Err(match err {
                Error::Transport { .. } => err,
                other => Error::Transport {
                    status: other.status(),
                    message: other.to_string(),
                },
            });
        }

        info!(platform = %platform.name(), attachment = %attachment, key = %key, "Exported object deleted");
        Ok(())
    }

    /// Record a failed step before handing the error back.
    fn reported<T>(&self, result: Result<T>, context: &str) -> Result<T> {
        result.map_err(|err| {
            self.diagnostics
                .record(&err.to_string(), Severity::Error, context);
            err
        })
    }
}
