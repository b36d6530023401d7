//! Errors raised writing/reading document artifacts and derived page
//! images through a [`crate::traits::StorageBackend`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("S3 error: {0}")]
    S3(String),

    #[error("storage backend config error: {0}")]
    Config(String),
}
