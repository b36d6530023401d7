use thiserror::Error;

/// The six error kinds from the error-handling design, each carrying
/// enough to build the HTTP response at the server boundary without
/// leaking upstream detail past this layer.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("input rejected: {0}")]
    InputRejected(String),

    #[error(transparent)]
    TransientUpstream(#[from] docscan_core::ClassifiedError),

    #[error("configuration fault: {0}")]
    ConfigurationFault(String),

    #[error("extracted payload failed validation: {0}")]
    ValidationFault(String),

    #[error("persistence conflict: {0}")]
    PersistenceConflict(String),

    #[error("a parse request for this content is already in progress")]
    DuplicateInProgress,

    #[error("document not found: {0}")]
    NotFound(uuid::Uuid),
}

impl OrchestratorError {
    /// The stable `E0xx` code for operator-serviceable classes, or
    /// `None` for kinds with no upstream error code.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            Self::TransientUpstream(e) => Some(e.code.as_str()),
            Self::ValidationFault(_) => Some("E099"),
            Self::PersistenceConflict(_) => Some("E099"),
            _ => None,
        }
    }

    /// The bland, client-safe message; full detail stays in the log via
    /// `Display`/`tracing::error!`.
    pub fn public_message(&self) -> String {
        match self {
            Self::InputRejected(msg) => msg.clone(),
            Self::TransientUpstream(e) => e.public_message().to_string(),
            Self::ConfigurationFault(_) => "Service configuration error".to_string(),
            Self::ValidationFault(_) => "Unable to process document [E099]".to_string(),
            Self::PersistenceConflict(_) => "Unable to process document [E099]".to_string(),
            Self::DuplicateInProgress => "A matching upload is already being processed".to_string(),
            Self::NotFound(_) => "Document not found".to_string(),
        }
    }
}

impl From<docscan_persistence::PersistenceError> for OrchestratorError {
    fn from(e: docscan_persistence::PersistenceError) -> Self {
        match e {
            docscan_persistence::PersistenceError::NotFound(_) => {
                Self::PersistenceConflict(e.to_string())
            }
            other => Self::PersistenceConflict(other.to_string()),
        }
    }
}

impl From<docscan_core::CoreError> for OrchestratorError {
    fn from(e: docscan_core::CoreError) -> Self {
        match e {
            docscan_core::CoreError::InputRejected(msg) => Self::InputRejected(msg),
            docscan_core::CoreError::Validation(msg) => Self::ValidationFault(msg),
            docscan_core::CoreError::Provider(classified) => Self::TransientUpstream(classified),
            other => Self::ConfigurationFault(other.to_string()),
        }
    }
}
