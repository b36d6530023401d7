use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Deserialize)]
pub struct RejectRequest {
    document_id: Uuid,
}

#[derive(Serialize)]
pub struct RejectResponse {
    success: bool,
    document_id: Uuid,
}

pub async fn reject(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RejectRequest>,
) -> Result<Json<RejectResponse>, ApiError> {
    state.orchestrator.reject(req.document_id).await?;
    Ok(Json(RejectResponse { success: true, document_id: req.document_id }))
}
