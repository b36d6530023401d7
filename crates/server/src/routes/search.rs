use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::Json;
use docscan_persistence::DocumentStatus;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Deserialize)]
pub struct SearchQuery {
    status: Option<String>,
    query: Option<String>,
    /// Document-language hint (e.g. `uk`, `en`) used to pick which FTS
    /// configuration `query` is matched with; see `FtsConfig::config_for`.
    language: Option<String>,
    #[serde(default)]
    page: Option<i64>,
    #[serde(default)]
    page_size: Option<i64>,
}

#[derive(Serialize)]
pub struct DocumentSummary {
    document_id: Uuid,
    status: String,
    created_at: chrono::DateTime<chrono::Utc>,
    supplier_id: Option<Uuid>,
}

#[derive(Serialize)]
pub struct SearchResponse {
    documents: Vec<DocumentSummary>,
    total: i64,
    page: i64,
    page_size: i64,
}

fn parse_status(raw: &str) -> Result<DocumentStatus, ApiError> {
    match raw.to_lowercase().as_str() {
        "parsed" => Ok(DocumentStatus::Parsed),
        "approved" => Ok(DocumentStatus::Approved),
        "rejected" => Ok(DocumentStatus::Rejected),
        "exported" => Ok(DocumentStatus::Exported),
        other => Err(ApiError::BadRequest(format!("unknown status: {other}"))),
    }
}

pub async fn search_documents(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, ApiError> {
    let status = query.status.as_deref().map(parse_status).transpose()?;
    let page = query.page.unwrap_or(0).max(0);
    let page_size = query.page_size.unwrap_or(20).clamp(1, 200);

    let (documents, total) = state
        .persistence
        .search_documents(status, query.query.as_deref(), query.language.as_deref(), page, page_size)
        .await?;

    let documents = documents
        .into_iter()
        .map(|d| DocumentSummary {
            document_id: d.id,
            status: format!("{:?}", d.status).to_lowercase(),
            created_at: d.created_at,
            supplier_id: d.supplier_id,
        })
        .collect();

    Ok(Json(SearchResponse { documents, total, page, page_size }))
}
