//! Prompt text is an external collaborator's concern: the model and its
//! wording are out of scope here. This module only knows the three file
//! names a deployment is expected to provide under `ProcessingConfig::prompt_dir`.

use crate::error::{CoreError, CoreResult};
use std::path::Path;

/// The three prompt roles the vision client needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptRole {
    /// Single combined prompt used in `fast` mode.
    Combined,
    /// Header-only prompt used in `detailed` mode.
    Header,
    /// Line-items-only prompt used in `detailed` mode.
    Items,
}

impl PromptRole {
    fn file_name(self) -> &'static str {
        match self {
            Self::Combined => "combined.txt",
            Self::Header => "header.txt",
            Self::Items => "items.txt",
        }
    }
}

/// Load the prompt text for `role` from `prompt_dir`.
pub async fn load_prompt(prompt_dir: &Path, role: PromptRole) -> CoreResult<String> {
    let path = prompt_dir.join(role.file_name());
    tokio::fs::read_to_string(&path).await.map_err(|e| {
        CoreError::Config(format!(
            "failed to read prompt file '{}': {e}. a deployment must provide prompt text under prompt_dir.",
            path.display()
        ))
    })
}
