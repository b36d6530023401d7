use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use docscan_orchestrator::error::OrchestratorError;
use serde::Serialize;

/// The HTTP adapter's own error type; everything handlers return funnels
/// through here so the JSON error shape is consistent across routes.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Persistence(#[from] docscan_persistence::PersistenceError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error_code: Option<&'static str>,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            ApiError::Orchestrator(e) => (status_for(e), e.code(), e.public_message()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, None, msg.clone()),
            ApiError::Persistence(e) => {
                tracing::error!(error = %e, "persistence error at the HTTP boundary");
                (StatusCode::INTERNAL_SERVER_ERROR, Some("E099"), "Unable to process document [E099]".to_string())
            }
            ApiError::Io(e) => {
                tracing::error!(error = %e, "io error at the HTTP boundary");
                (StatusCode::INTERNAL_SERVER_ERROR, None, "Internal error".to_string())
            }
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = axum::Json(ErrorBody { success: false, error_code, message });
        (status, body).into_response()
    }
}

fn status_for(e: &OrchestratorError) -> StatusCode {
    match e {
        OrchestratorError::InputRejected(_) => StatusCode::BAD_REQUEST,
        OrchestratorError::DuplicateInProgress => StatusCode::CONFLICT,
        OrchestratorError::NotFound(_) => StatusCode::NOT_FOUND,
        OrchestratorError::TransientUpstream(e) => {
            if e.code == docscan_core::ErrorCode::E001 {
                StatusCode::TOO_MANY_REQUESTS
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
        OrchestratorError::ConfigurationFault(_)
        | OrchestratorError::ValidationFault(_)
        | OrchestratorError::PersistenceConflict(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
