pub mod company_resolver;
pub mod entities;
pub mod error;
pub mod pool;
pub mod service;

pub use entities::{Document, DocumentStatus, DocumentType, File, Snapshot, SnapshotKind};
pub use error::{PersistenceError, PersistenceResult};
pub use pool::{create_pool, run_migrations, DbConfig, FtsConfig};
pub use service::PersistenceService;
