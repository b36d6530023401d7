pub mod coalescer;
pub mod error;
pub mod exporter;

use coalescer::DuplicateCoalescer;
use docscan_core::{extract_document, DocValue, ExtractionMode, ProcessingConfig, VisionProvider};
use docscan_persistence::service::FileAttrs;
use docscan_persistence::PersistenceService;
use docscan_storage::StorageBackend;
use error::OrchestratorError;
use exporter::Exporter;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Result of a successful `parse` call.
pub struct ParseOutcome {
    pub document_id: Uuid,
    pub payload: DocValue,
}

/// Sequences preprocessing -> vision extraction -> post-processing ->
/// persistence, and drives the approve/reject transitions after a human
/// review. Composed once at process start, like the teacher's `AppState`.
pub struct Orchestrator {
    vision_provider: Arc<dyn VisionProvider>,
    persistence: Arc<PersistenceService>,
    storage: Arc<dyn StorageBackend>,
    coalescer: DuplicateCoalescer,
    exporters: Vec<Arc<dyn Exporter>>,
    config: ProcessingConfig,
}

impl Orchestrator {
    pub fn new(
        vision_provider: Arc<dyn VisionProvider>,
        persistence: Arc<PersistenceService>,
        storage: Arc<dyn StorageBackend>,
        exporters: Vec<Arc<dyn Exporter>>,
        config: ProcessingConfig,
        duplicate_window: Duration,
    ) -> Self {
        Self {
            vision_provider,
            persistence,
            storage,
            coalescer: DuplicateCoalescer::new(duplicate_window),
            exporters,
            config,
        }
    }

    /// Drives the full `accepted -> stored -> preprocessed -> extracted ->
    /// post-processed -> persisted-raw` pipeline for one upload.
    /// `artifact_path` must already hold `artifact_bytes` on local disk
    /// for the preprocessor to read (pdfium/`image` need a path, not a
    /// buffer); the canonical, content-addressed copy is written to
    /// `storage` independently and recorded as a `File` row.
    pub async fn parse(
        &self,
        artifact_path: &Path,
        artifact_bytes: &[u8],
        original_filename: &str,
        mime: &str,
        mode: ExtractionMode,
        doc_type_hint: &str,
        uploaded_by: Option<&str>,
    ) -> Result<ParseOutcome, OrchestratorError> {
        let content_hash = docscan_storage::content_hash(artifact_bytes);
        if !self.coalescer.try_claim(&content_hash) {
            return Err(OrchestratorError::DuplicateInProgress);
        }

        let outer_deadline = Duration::from_secs(self.config.orchestrator_timeout_secs);
        let result = tokio::time::timeout(
            outer_deadline,
            self.parse_inner(artifact_path, artifact_bytes, &content_hash, original_filename, mime, mode, doc_type_hint, uploaded_by),
        )
        .await
        .unwrap_or(Err(OrchestratorError::TransientUpstream(docscan_core::ClassifiedError::new(
            docscan_core::ErrorCode::E004,
            "orchestrator deadline exceeded",
        ))));

        self.coalescer.release(&content_hash);
        result
    }

    #[allow(clippy::too_many_arguments)]
    async fn parse_inner(
        &self,
        artifact_path: &Path,
        artifact_bytes: &[u8],
        content_hash: &str,
        original_filename: &str,
        mime: &str,
        mode: ExtractionMode,
        doc_type_hint: &str,
        uploaded_by: Option<&str>,
    ) -> Result<ParseOutcome, OrchestratorError> {
        let storage_path = docscan_storage::storage_key(content_hash, original_filename);
        self.storage
            .write_bytes(&storage_path, artifact_bytes)
            .await
            .map_err(|e| OrchestratorError::ConfigurationFault(e.to_string()))?;

        let file_attrs = FileAttrs {
            storage_path: &storage_path,
            original_filename,
            content_hash,
            mime_type: mime,
            byte_size: artifact_bytes.len() as i64,
            uploaded_by,
        };

        let extraction = match extract_document(artifact_path, mime, mode, &self.config, self.vision_provider.clone())
            .await
        {
            Ok(extraction) => extraction,
            Err(e) => {
                // The artifact was still accepted and stored; record the
                // `File` row with no document attached rather than losing
                // track of bytes that already landed in storage.
                self.persistence.record_file(None, file_attrs).await?;
                return Err(e.into());
            }
        };

        let document = self
            .persistence
            .save_parsed(&extraction.payload, doc_type_hint, uploaded_by, Some(file_attrs))
            .await?;

        Ok(ParseOutcome { document_id: document.id, payload: extraction.payload })
    }

    /// Writes the APPROVED snapshot, then fans out to exporters. An
    /// exporter failure is logged and does not change the returned
    /// `Result`; approval is never reverted by an exporter error.
    pub async fn approve(
        &self,
        document_id: Uuid,
        edited_payload: DocValue,
        user_id: &str,
    ) -> Result<(), OrchestratorError> {
        self.persistence.save_approved(document_id, &edited_payload, user_id).await?;

        for exporter in &self.exporters {
            if let Err(e) = exporter.export(document_id, &edited_payload).await {
                tracing::error!(
                    exporter = exporter.exporter_name(),
                    document_id = %document_id,
                    error = %e,
                    "exporter failed after approval"
                );
            }
        }

        Ok(())
    }

    /// Status becomes `rejected`; no snapshot write, RAW is retained.
    pub async fn reject(&self, document_id: Uuid) -> Result<(), OrchestratorError> {
        self.persistence.reject(document_id).await?;
        Ok(())
    }
}
