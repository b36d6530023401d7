use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Multipart, Query, State};
use axum::Json;
use docscan_core::ExtractionMode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Deserialize)]
pub struct ParseQuery {
    #[serde(default)]
    mode: Option<String>,
    #[serde(default)]
    doc_type: Option<String>,
}

#[derive(Serialize)]
pub struct ParseResponse {
    success: bool,
    document_id: Uuid,
    data: Value,
}

pub async fn parse(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ParseQuery>,
    mut multipart: Multipart,
) -> Result<Json<ParseResponse>, ApiError> {
    let mode: ExtractionMode = match query.mode.as_deref() {
        Some(raw) => raw.parse().map_err(ApiError::BadRequest)?,
        None => ExtractionMode::default(),
    };
    let doc_type = query.doc_type.unwrap_or_else(|| "invoice".to_string());

    let mut file: Option<(String, String, Vec<u8>)> = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload").to_string();
        let mime = field.content_type().unwrap_or("application/octet-stream").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("failed to read uploaded file: {e}")))?;
        file = Some((filename, mime, bytes.to_vec()));
    }

    let (filename, mime, bytes) =
        file.ok_or_else(|| ApiError::BadRequest("no file field in multipart body".to_string()))?;

    tokio::fs::create_dir_all(&state.upload_dir).await?;
    let artifact_path = state.upload_dir.join(format!("{}-{filename}", Uuid::new_v4()));
    tokio::fs::write(&artifact_path, &bytes).await?;

    let result = state
        .orchestrator
        .parse(&artifact_path, &bytes, &filename, &mime, mode, &doc_type, None)
        .await;
    tokio::fs::remove_file(&artifact_path).await.ok();

    let outcome = result?;
    let data = serde_json::to_value(&outcome.payload).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    Ok(Json(ParseResponse { success: true, document_id: outcome.document_id, data }))
}
