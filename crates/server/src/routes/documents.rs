use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::Json;
use docscan_orchestrator::error::OrchestratorError;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Serialize)]
pub struct DocumentResponse {
    document_id: Uuid,
    data: Value,
}

/// `GET /api/documents/{id}`: the approved snapshot payload if one
/// exists, else the raw one.
pub async fn get_document(
    State(state): State<Arc<AppState>>,
    Path(document_id): Path<Uuid>,
) -> Result<Json<DocumentResponse>, ApiError> {
    let payload = state
        .persistence
        .latest_payload(document_id)
        .await?
        .ok_or(OrchestratorError::NotFound(document_id))?;

    let data = serde_json::to_value(&payload).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    Ok(Json(DocumentResponse { document_id, data }))
}
