//! Upload capture
//!
//! Drains an incoming upload into a durable file so the request stream can be
//! closed right away. The durable copy backs a `PendingUpload` until an import
//! attempt consumes it or the session is disposed.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tracing::{debug, warn};
use uuid::Uuid;

const TMPFILE_PREFIX: &str = "siteport-larimport";
const TMPFILE_SUFFIX: &str = ".lar";

/// Why a capture failed
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Upload exceeds the limit of {limit} bytes")]
    SizeExceeded { limit: u64 },

    #[error("Upload truncated: expected {expected} bytes, received {received}")]
    Truncated { expected: u64, received: u64 },

    #[error("Failed to read upload: {0}")]
    ReadError(#[from] std::io::Error),
}

/// A captured upload waiting for an import attempt.
///
/// Dropping an upload that was never released deletes the durable copy.
#[derive(Debug)]
pub struct PendingUpload {
    filename: String,
    content_type: String,
    path: PathBuf,
    durable_name: String,
    size_bytes: u64,
    size_limit_bytes: u64,
    released: bool,
}

impl PendingUpload {
    /// Name the upload was submitted under
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Content type declared by the client
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name of the durable copy, always a valid store entry name
    pub fn durable_name(&self) -> &str {
        &self.durable_name
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn size_limit_bytes(&self) -> u64 {
        self.size_limit_bytes
    }

    /// Delete the durable copy. Consumes the upload so it cannot be released twice.
    pub async fn release(mut self) {
        match fs::remove_file(&self.path).await {
            Ok(()) => debug!("Released upload {}", self.path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to delete upload {}: {}", self.path.display(), e),
        }
        self.released = true;
    }
}

impl Drop for PendingUpload {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed unreleased upload {}", self.path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Failed to delete unreleased upload {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

/// Writes uploads to durable files under a directory, enforcing a size limit
#[derive(Debug, Clone)]
pub struct UploadCapture {
    upload_dir: PathBuf,
    max_upload_bytes: u64,
}

impl UploadCapture {
    pub fn new(upload_dir: impl Into<PathBuf>, max_upload_bytes: u64) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            max_upload_bytes,
        }
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
    }

    /// Capture `source` into a durable file.
    ///
    /// `expected_len` is the length the client declared, if any; receiving fewer
    /// bytes than declared fails instead of keeping a partial copy. On every error
    /// the partial file is removed before returning.
    pub async fn capture<R>(
        &self,
        filename: &str,
        content_type: &str,
        source: R,
        expected_len: Option<u64>,
    ) -> Result<PendingUpload, CaptureError>
    where
        R: AsyncRead + Unpin + Send,
    {
        if let Some(expected) = expected_len {
            if expected > self.max_upload_bytes {
                return Err(CaptureError::SizeExceeded {
                    limit: self.max_upload_bytes,
                });
            }
        }

        fs::create_dir_all(&self.upload_dir).await?;
        let durable_name = format!(
            "{}-{}{}",
            TMPFILE_PREFIX,
            Uuid::new_v4().simple(),
            TMPFILE_SUFFIX
        );
        let path = self.upload_dir.join(&durable_name);

        match self.write_limited(&path, source).await {
            Ok(received) => {
                if let Some(expected) = expected_len {
                    if received != expected {
                        discard(&path).await;
                        return Err(CaptureError::Truncated { expected, received });
                    }
                }

                // Some clients send the full client-side path
                let basename = filename.rsplit(['/', '\\']).next().unwrap_or_default().trim();
                let filename = if basename.is_empty() {
                    durable_name.clone()
                } else {
                    basename.to_string()
                };

                debug!(
                    "Captured upload {} ({} bytes) at {}",
                    filename,
                    received,
                    path.display()
                );

                Ok(PendingUpload {
                    filename,
                    content_type: content_type.to_string(),
                    path,
                    durable_name,
                    size_bytes: received,
                    size_limit_bytes: self.max_upload_bytes,
                    released: false,
                })
            }
            Err(e) => {
                discard(&path).await;
                Err(e)
            }
        }
    }

    async fn write_limited<R>(&self, path: &Path, source: R) -> Result<u64, CaptureError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let mut file = fs::File::create(path).await?;
        // One byte past the limit is enough to tell an oversized upload apart
        let mut limited = source.take(self.max_upload_bytes.saturating_add(1));
        let received = tokio::io::copy(&mut limited, &mut file).await?;
        if received > self.max_upload_bytes {
            return Err(CaptureError::SizeExceeded {
                limit: self.max_upload_bytes,
            });
        }
        file.flush().await?;
        file.sync_all().await?;
        Ok(received)
    }
}

async fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != ErrorKind::NotFound {
            warn!("Failed to discard partial upload {}: {}", path.display(), e);
        }
    }
}
