//! Ties preprocessing, vision extraction and post-processing together into
//! the single operation the orchestrator drives: turn an uploaded artifact
//! into a [`DocValue`] payload.

use crate::config::{ExtractionMode, ProcessingConfig};
use crate::error::{CoreError, CoreResult};
use crate::postprocess::merge_payloads;
use crate::preprocess::{preprocess, PageImage};
use crate::prompts::{load_prompt, PromptRole};
use crate::value::DocValue;
use crate::vision::provider::VisionProvider;
use crate::vision::RetryPolicy;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Result of one extraction run: the merged payload plus the page images it
/// was derived from, kept around for persistence of page-level artifacts.
#[derive(Debug)]
pub struct ExtractionResult {
    pub payload: DocValue,
    pub pages: Vec<PageImage>,
}

/// Run the full pipeline for one artifact: preprocess into page images,
/// call the vision provider in `mode`, and post-process the raw response(s)
/// into a single [`DocValue`].
pub async fn extract_document(
    path: &Path,
    mime: &str,
    mode: ExtractionMode,
    config: &ProcessingConfig,
    provider: Arc<dyn VisionProvider>,
) -> CoreResult<ExtractionResult> {
    let pages = preprocess(path, mime, config).await?;
    let images_b64: Vec<String> = pages.iter().map(PageImage::to_base64).collect();
    let retries = RetryPolicy::new(config.max_retries, config.retry_min_wait_ms, config.retry_max_wait_ms);

    let payload = match mode {
        ExtractionMode::Fast => {
            let prompt = load_prompt(&config.prompt_dir, PromptRole::Combined).await?;
            let raw = provider.extract(&images_b64, &prompt, &retries).await?;
            parse_payload(&raw, PromptRole::Combined)?
        }
        ExtractionMode::Detailed => {
            let header_prompt = load_prompt(&config.prompt_dir, PromptRole::Header).await?;
            let items_prompt = load_prompt(&config.prompt_dir, PromptRole::Items).await?;

            // A shared cancellation token stands in for the caller's
            // deadline: if either future is cancelled (deadline elapses
            // before both finish), the sibling is cancelled too rather
            // than left to run to an answer nobody will use.
            let token = CancellationToken::new();
            let header_token = token.clone();
            let items_token = token.clone();
            let header_provider = provider.clone();
            let items_provider = provider.clone();
            let header_images = images_b64.clone();
            let items_images = images_b64.clone();

            let (header_res, items_res) = tokio::join!(
                run_cancellable(&header_token, header_provider.extract(&header_images, &header_prompt, &retries)),
                run_cancellable(&items_token, items_provider.extract(&items_images, &items_prompt, &retries)),
            );

            let header_raw = header_res.map_err(|e| {
                token.cancel();
                e
            })?;
            let items_raw = items_res.map_err(|e| {
                token.cancel();
                e
            })?;

            let header_payload = parse_payload(&header_raw, PromptRole::Header)?;
            let items_payload = parse_payload(&items_raw, PromptRole::Items)?;
            merge_payloads(header_payload, items_payload)
        }
    };

    Ok(ExtractionResult { payload, pages })
}

/// Race `fut` against cancellation of `token`, returning the classified
/// timeout error if the token fires first.
async fn run_cancellable<T>(
    token: &CancellationToken,
    fut: impl std::future::Future<Output = Result<T, crate::vision::ClassifiedError>>,
) -> Result<T, crate::vision::ClassifiedError> {
    tokio::select! {
        result = fut => result,
        _ = token.cancelled() => Err(crate::vision::ClassifiedError::new(
            crate::vision::ErrorCode::E004,
            "sibling prompt call was cancelled",
        )),
    }
}

/// Parse a vision response and check it carries the top-level key(s) its
/// prompt role requires. A syntactically valid but empty or malformed
/// response (e.g. `{}`) is rejected here rather than flowing through as an
/// empty document.
fn parse_payload(raw: &str, role: PromptRole) -> CoreResult<DocValue> {
    let trimmed = strip_code_fence(raw);
    let value: DocValue = serde_json::from_str(trimmed)
        .map_err(|e| CoreError::Validation(format!("vision response was not valid JSON: {e}")))?;
    require_top_level_keys(&value, role)?;
    Ok(value)
}

fn require_top_level_keys(value: &DocValue, role: PromptRole) -> CoreResult<()> {
    let has_document_info = value.get("document_info").is_some();
    let has_table_data = value.get("table_data").is_some();
    let satisfied = match role {
        PromptRole::Header => has_document_info,
        PromptRole::Items => has_table_data,
        PromptRole::Combined => has_document_info || has_table_data,
    };
    if satisfied {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "vision response for {role:?} prompt is missing both document_info and table_data"
        )))
    }
}

/// Vision models commonly wrap JSON in a ```json fence despite instructions
/// not to; strip it rather than fail a well-formed response.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let without_prefix = trimmed.strip_prefix("```json").or_else(|| trimmed.strip_prefix("```")).unwrap_or(trimmed);
    without_prefix.strip_suffix("```").unwrap_or(without_prefix).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_code_fence_removes_json_fence() {
        let raw = "```json\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fence(raw), "{\"a\": 1}");
    }

    #[test]
    fn strip_code_fence_passes_through_bare_json() {
        let raw = "{\"a\": 1}";
        assert_eq!(strip_code_fence(raw), "{\"a\": 1}");
    }

    #[test]
    fn parse_payload_rejects_empty_object() {
        let err = parse_payload("{}", PromptRole::Combined).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn parse_payload_accepts_document_info_for_header_role() {
        let raw = r#"{"document_info": {"document_number": "755"}}"#;
        assert!(parse_payload(raw, PromptRole::Header).is_ok());
    }

    #[test]
    fn parse_payload_rejects_table_data_for_header_role() {
        let raw = r#"{"table_data": {"line_items": []}}"#;
        let err = parse_payload(raw, PromptRole::Header).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn parse_payload_accepts_table_data_for_items_role() {
        let raw = r#"{"table_data": {"line_items": []}}"#;
        assert!(parse_payload(raw, PromptRole::Items).is_ok());
    }
}
