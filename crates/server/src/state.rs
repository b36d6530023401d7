use docscan_orchestrator::Orchestrator;
use docscan_persistence::PersistenceService;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub persistence: Arc<PersistenceService>,
    /// Directory uploads are buffered to before preprocessing runs.
    pub upload_dir: std::path::PathBuf,
    /// Bearer token required on `/parse`, `/save`, `/reject`.
    pub api_token: String,
}

impl AppState {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        persistence: Arc<PersistenceService>,
        upload_dir: std::path::PathBuf,
        api_token: String,
    ) -> Arc<Self> {
        Arc::new(Self { orchestrator, persistence, upload_dir, api_token })
    }
}
