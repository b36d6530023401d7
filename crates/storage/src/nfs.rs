use crate::error::StorageError;
use crate::local::LocalStorage;
use crate::traits::StorageBackend;
use std::path::PathBuf;

/// Document artifacts on a mounted NFS/SMB share, shared across several
/// server instances the way a single local disk couldn't be.
///
/// An artifact store on a network share is still a directory tree keyed
/// by content hash, so this is [`LocalStorage`] rooted at the mount point
/// plus one check that the deployment actually mounted it before the
/// first write is attempted.
pub struct NfsStorage {
    inner: LocalStorage,
}

impl NfsStorage {
    /// `mount_point` must already be mounted; `base_url` is the URL the
    /// server serves artifacts from the share under.
    pub fn new(mount_point: PathBuf, base_url: String) -> Result<Self, StorageError> {
        if !mount_point.exists() || !mount_point.is_dir() {
            return Err(StorageError::Config(format!(
                "NFS mount point does not exist or is not a directory: {}",
                mount_point.display()
            )));
        }
        Ok(Self { inner: LocalStorage::new(mount_point, base_url) })
    }
}

#[async_trait::async_trait]
impl StorageBackend for NfsStorage {
    async fn write_bytes(&self, path: &str, data: &[u8]) -> Result<(), StorageError> {
        self.inner.write_bytes(path, data).await
    }

    async fn write_text(&self, path: &str, text: &str) -> Result<(), StorageError> {
        self.inner.write_text(path, text).await
    }

    async fn read_bytes(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        self.inner.read_bytes(path).await
    }

    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        self.inner.exists(path).await
    }

    async fn create_dir(&self, path: &str) -> Result<(), StorageError> {
        self.inner.create_dir(path).await
    }

    fn public_url(&self, path: &str) -> String {
        self.inner.public_url(path)
    }

    fn backend_name(&self) -> &str {
        "nfs"
    }
}
