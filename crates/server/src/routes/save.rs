use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use docscan_core::DocValue;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Deserialize)]
pub struct SaveRequest {
    document_id: Uuid,
    data: DocValue,
}

#[derive(Serialize)]
pub struct SaveResponse {
    success: bool,
    message: String,
    document_id: Uuid,
}

pub async fn save(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SaveRequest>,
) -> Result<Json<SaveResponse>, ApiError> {
    // approver identity is carried by the bearer-token layer, which does
    // not yet distinguish individual callers; recorded as the token itself
    // until an identity system lands.
    state.orchestrator.approve(req.document_id, req.data, "api-token").await?;

    Ok(Json(SaveResponse {
        success: true,
        message: "document approved".to_string(),
        document_id: req.document_id,
    }))
}
