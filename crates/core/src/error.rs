use thiserror::Error;

/// Result type alias using [`CoreError`].
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised by preprocessing, vision extraction, or post-processing.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("input rejected: {0}")]
    InputRejected(String),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("image error: {0}")]
    Image(String),

    #[error("pdfium error: {0}")]
    Pdfium(String),

    #[error("vision provider error: {0}")]
    Provider(#[from] crate::vision::ClassifiedError),

    #[error("extracted payload failed validation: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),
}
