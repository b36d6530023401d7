//! End-to-end exercise of `Orchestrator::parse`/`approve`/`reject` against
//! a scripted `VisionProvider` test double and a throwaway Postgres schema.
//! Requires `DATABASE_URL`; `sqlx::test` provisions the scratch database.

use docscan_core::vision::{ClassifiedError, ErrorCode, RetryPolicy};
use docscan_core::{DocValue, ExtractionMode, ProcessingConfig, VisionProvider};
use docscan_orchestrator::exporter::LocalFileExporter;
use docscan_orchestrator::error::OrchestratorError;
use docscan_orchestrator::Orchestrator;
use docscan_persistence::PersistenceService;
use docscan_storage::{LocalStorage, StorageBackend};
use sqlx::PgPool;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A single transparent-black 1x1 PNG, used so `preprocess` has a real
/// image to decode without pulling pdfium into this test.
const ONE_PIXEL_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4,
    0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0xDA, 0x63, 0x64, 0x60, 0x60, 0x60,
    0x00, 0x00, 0x00, 0x05, 0x00, 0x01, 0x5A, 0x8E, 0x31, 0xA9, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45,
    0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

const COMBINED_RESPONSE: &str = r#"{
    "document_info": {"document_number": "755", "document_date": "2025-03-25"},
    "totals": {"total": 100.0}
}"#;

/// Scripted provider: returns a fixed payload, or a fixed classified
/// error, counting calls so tests can assert retry behavior.
struct ScriptedProvider {
    text: Option<String>,
    error_code: Option<ErrorCode>,
    calls: AtomicU32,
}

impl ScriptedProvider {
    fn ok(text: &str) -> Self {
        Self { text: Some(text.to_string()), error_code: None, calls: AtomicU32::new(0) }
    }

    fn err(code: ErrorCode) -> Self {
        Self { text: None, error_code: Some(code), calls: AtomicU32::new(0) }
    }
}

#[async_trait::async_trait]
impl VisionProvider for ScriptedProvider {
    async fn extract(
        &self,
        _images_b64: &[String],
        _prompt: &str,
        _retries: &RetryPolicy,
    ) -> Result<String, ClassifiedError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match (&self.text, self.error_code) {
            (Some(text), _) => Ok(text.clone()),
            (None, Some(code)) => Err(ClassifiedError::new(code, "scripted failure")),
            (None, None) => unreachable!("ScriptedProvider built with neither ok() nor err()"),
        }
    }

    async fn check(&self) -> Result<(), ClassifiedError> {
        Ok(())
    }

    fn provider_name(&self) -> &str {
        "scripted"
    }

    fn model_name(&self) -> &str {
        "scripted-model"
    }
}

async fn write_artifact(bytes: &[u8]) -> PathBuf {
    let path = std::env::temp_dir().join(format!("docscan-orch-test-{}.png", uuid::Uuid::new_v4()));
    tokio::fs::write(&path, bytes).await.unwrap();
    path
}

fn test_storage() -> Arc<dyn StorageBackend> {
    let root = std::env::temp_dir().join(format!("docscan-orch-storage-{}", uuid::Uuid::new_v4()));
    Arc::new(LocalStorage::new(root, "http://localhost:8899".to_string()))
}

async fn write_prompts() -> ProcessingConfig {
    let dir = std::env::temp_dir().join(format!("docscan-orch-prompts-{}", uuid::Uuid::new_v4()));
    tokio::fs::create_dir_all(&dir).await.unwrap();
    tokio::fs::write(dir.join("combined.txt"), "extract the fields").await.unwrap();
    let mut config = ProcessingConfig::default();
    config.prompt_dir = dir;
    config.enable_deskew = false;
    config
}

/// Scenario: a clean parse persists a RAW snapshot and returns its id.
#[sqlx::test(migrations = "../persistence/migrations")]
async fn parse_persists_raw_snapshot(pool: PgPool) -> sqlx::Result<(), Box<dyn std::error::Error>> {
    let config = write_prompts().await;
    let artifact = write_artifact(ONE_PIXEL_PNG).await;
    let bytes = tokio::fs::read(&artifact).await?;

    let provider: Arc<dyn VisionProvider> = Arc::new(ScriptedProvider::ok(COMBINED_RESPONSE));
    let persistence = Arc::new(PersistenceService::new(pool));
    let exporters: Vec<Arc<dyn docscan_orchestrator::exporter::Exporter>> = vec![];
    let orchestrator = Orchestrator::new(provider, persistence, test_storage(), exporters, config, Duration::from_secs(60));

    let outcome = orchestrator
        .parse(&artifact, &bytes, "scan.png", "image/png", ExtractionMode::Fast, "invoice", None)
        .await?;

    assert!(outcome.payload.as_map().is_some());
    Ok(())
}

/// Scenario: a non-retryable upstream failure surfaces as
/// `TransientUpstream` without persisting anything.
#[sqlx::test(migrations = "../persistence/migrations")]
async fn parse_surfaces_classified_vision_error(pool: PgPool) -> sqlx::Result<(), Box<dyn std::error::Error>> {
    let config = write_prompts().await;
    let artifact = write_artifact(ONE_PIXEL_PNG).await;
    let bytes = tokio::fs::read(&artifact).await?;

    let provider: Arc<dyn VisionProvider> = Arc::new(ScriptedProvider::err(ErrorCode::E002));
    let persistence = Arc::new(PersistenceService::new(pool));
    let exporters: Vec<Arc<dyn docscan_orchestrator::exporter::Exporter>> = vec![];
    let orchestrator = Orchestrator::new(provider, persistence, test_storage(), exporters, config, Duration::from_secs(60));

    let result = orchestrator
        .parse(&artifact, &bytes, "scan.png", "image/png", ExtractionMode::Fast, "invoice", None)
        .await;

    assert!(matches!(result, Err(OrchestratorError::TransientUpstream(_))));
    Ok(())
}

/// A second `parse` for identical bytes while the first is still
/// in-flight is rejected as a duplicate, per the coalescing window.
#[sqlx::test(migrations = "../persistence/migrations")]
async fn concurrent_duplicate_upload_is_rejected(pool: PgPool) -> sqlx::Result<(), Box<dyn std::error::Error>> {
    let config = write_prompts().await;
    let artifact = write_artifact(ONE_PIXEL_PNG).await;
    let bytes = tokio::fs::read(&artifact).await?;

    let provider: Arc<dyn VisionProvider> = Arc::new(ScriptedProvider::ok(COMBINED_RESPONSE));
    let persistence = Arc::new(PersistenceService::new(pool));
    let exporters: Vec<Arc<dyn docscan_orchestrator::exporter::Exporter>> = vec![];
    let orchestrator = Arc::new(Orchestrator::new(
        provider,
        persistence,
        test_storage(),
        exporters,
        config,
        Duration::from_secs(60),
    ));

    let (first, second) = tokio::join!(
        orchestrator.parse(&artifact, &bytes, "scan.png", "image/png", ExtractionMode::Fast, "invoice", None),
        orchestrator.parse(&artifact, &bytes, "scan.png", "image/png", ExtractionMode::Fast, "invoice", None),
    );

    let results = [first, second];
    let duplicate_count = results
        .iter()
        .filter(|r| matches!(r, Err(OrchestratorError::DuplicateInProgress)))
        .count();
    assert_eq!(duplicate_count, 1);
    Ok(())
}

/// Approval writes an APPROVED snapshot and fans out to the configured
/// exporter; a failing exporter does not revert the approval.
#[sqlx::test(migrations = "../persistence/migrations")]
async fn approve_writes_snapshot_and_runs_exporter(pool: PgPool) -> sqlx::Result<(), Box<dyn std::error::Error>> {
    let config = write_prompts().await;
    let artifact = write_artifact(ONE_PIXEL_PNG).await;
    let bytes = tokio::fs::read(&artifact).await?;
    let export_dir = std::env::temp_dir().join(format!("docscan-orch-export-{}", uuid::Uuid::new_v4()));

    let provider: Arc<dyn VisionProvider> = Arc::new(ScriptedProvider::ok(COMBINED_RESPONSE));
    let persistence = Arc::new(PersistenceService::new(pool));
    let exporters: Vec<Arc<dyn docscan_orchestrator::exporter::Exporter>> =
        vec![Arc::new(LocalFileExporter::new(&export_dir))];
    let orchestrator = Orchestrator::new(provider, persistence, test_storage(), exporters, config, Duration::from_secs(60));

    let outcome = orchestrator
        .parse(&artifact, &bytes, "scan.png", "image/png", ExtractionMode::Fast, "invoice", None)
        .await?;

    orchestrator.approve(outcome.document_id, outcome.payload, "reviewer@example.com").await?;

    let written = tokio::fs::read_to_string(export_dir.join(format!("{}.json", outcome.document_id))).await?;
    assert!(written.contains("\"document_number\""));
    Ok(())
}

/// Rejection is a thin status update; the document stays findable but no
/// further snapshot is produced.
#[sqlx::test(migrations = "../persistence/migrations")]
async fn reject_marks_document_rejected(pool: PgPool) -> sqlx::Result<(), Box<dyn std::error::Error>> {
    let config = write_prompts().await;
    let artifact = write_artifact(ONE_PIXEL_PNG).await;
    let bytes = tokio::fs::read(&artifact).await?;

    let provider: Arc<dyn VisionProvider> = Arc::new(ScriptedProvider::ok(COMBINED_RESPONSE));
    let persistence = Arc::new(PersistenceService::new(pool));
    let exporters: Vec<Arc<dyn docscan_orchestrator::exporter::Exporter>> = vec![];
    let orchestrator = Orchestrator::new(provider, persistence, test_storage(), exporters, config, Duration::from_secs(60));

    let outcome = orchestrator
        .parse(&artifact, &bytes, "scan.png", "image/png", ExtractionMode::Fast, "invoice", None)
        .await?;

    orchestrator.reject(outcome.document_id).await?;
    Ok(())
}
