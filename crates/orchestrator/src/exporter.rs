//! The narrow contract approved documents are fanned out through.
//! Real spreadsheet/cloud writers are external collaborators; this crate
//! only defines the trait plus a local-file reference implementation
//! used in tests.

use docscan_core::DocValue;
use uuid::Uuid;

#[async_trait::async_trait]
pub trait Exporter: Send + Sync {
    async fn export(&self, document_id: Uuid, approved_payload: &DocValue) -> anyhow::Result<()>;

    fn exporter_name(&self) -> &str;
}

/// Writes the approved payload as pretty JSON under `dir/{document_id}.json`.
pub struct LocalFileExporter {
    dir: std::path::PathBuf,
}

impl LocalFileExporter {
    pub fn new(dir: impl Into<std::path::PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait::async_trait]
impl Exporter for LocalFileExporter {
    async fn export(&self, document_id: Uuid, approved_payload: &DocValue) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(format!("{document_id}.json"));
        let text = serde_json::to_string_pretty(approved_payload)?;
        tokio::fs::write(path, text).await?;
        Ok(())
    }

    fn exporter_name(&self) -> &str {
        "local_file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    #[tokio::test]
    async fn local_file_exporter_writes_pretty_json() {
        let dir = std::env::temp_dir().join(format!("docscan-exporter-test-{}", Uuid::new_v4()));
        let exporter = LocalFileExporter::new(&dir);
        let id = Uuid::new_v4();
        let mut map = IndexMap::new();
        map.insert("total".to_string(), DocValue::Text("100".to_string()));
        exporter.export(id, &DocValue::Map(map)).await.unwrap();

        let written = tokio::fs::read_to_string(dir.join(format!("{id}.json"))).await.unwrap();
        assert!(written.contains("\"total\""));
        tokio::fs::remove_dir_all(&dir).await.ok();
    }
}
