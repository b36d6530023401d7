use serde::{Deserialize, Serialize};

/// Vision extraction mode.
///
/// `Fast` sends a single combined prompt. `Detailed` forks into two
/// concurrent prompts (`header`, `items`) that the post-processor merges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMode {
    Fast,
    Detailed,
}

impl Default for ExtractionMode {
    fn default() -> Self {
        Self::Fast
    }
}

impl std::str::FromStr for ExtractionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fast" => Ok(Self::Fast),
            "detailed" => Ok(Self::Detailed),
            other => Err(format!("unknown extraction mode: {other}. use: fast | detailed")),
        }
    }
}

/// Configuration for the preprocessing and vision extraction pipeline.
///
/// Built once from environment variables at process start and passed by
/// reference; no global mutable state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// DPI for rasterizing PDF pages (default: 200).
    pub image_dpi: u32,

    /// Reject artifacts larger than this many bytes.
    pub max_upload_size_bytes: u64,

    /// Apply a bounded-angle deskew pass to raster pages.
    pub enable_deskew: bool,

    /// Convert pages to greyscale before sending to the vision model.
    pub enable_greyscale: bool,

    /// Boost contrast on raster pages.
    pub enable_contrast: bool,

    /// Maximum retry attempts for a single vision call (default: 3).
    pub max_retries: u32,

    /// Minimum backoff between retries (default: 2000ms).
    pub retry_min_wait_ms: u64,

    /// Maximum backoff between retries (default: 10000ms).
    pub retry_max_wait_ms: u64,

    /// Per-attempt deadline for a vision call (default: 60s).
    pub vision_call_timeout_secs: u64,

    /// Outer deadline for an entire orchestrator parse call (default: 300s).
    pub orchestrator_timeout_secs: u64,

    /// Directory containing the opaque prompt text files (`combined.txt`,
    /// `header.txt`, `items.txt`). Prompt content is supplied by the
    /// deployment, not compiled in.
    pub prompt_dir: std::path::PathBuf,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            image_dpi: 200,
            max_upload_size_bytes: 25 * 1024 * 1024,
            enable_deskew: true,
            enable_greyscale: false,
            enable_contrast: false,
            max_retries: 3,
            retry_min_wait_ms: 2_000,
            retry_max_wait_ms: 10_000,
            vision_call_timeout_secs: 60,
            orchestrator_timeout_secs: 300,
            prompt_dir: std::path::PathBuf::from("prompts"),
        }
    }
}

impl ProcessingConfig {
    /// Build a config from environment variables, falling back to defaults
    /// for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            image_dpi: env_u32("IMAGE_DPI", defaults.image_dpi),
            max_upload_size_bytes: env_u64("MAX_UPLOAD_SIZE_BYTES", defaults.max_upload_size_bytes),
            enable_deskew: env_bool("ENABLE_DESKEW", defaults.enable_deskew),
            enable_greyscale: env_bool("ENABLE_GREYSCALE", defaults.enable_greyscale),
            enable_contrast: env_bool("ENABLE_CONTRAST", defaults.enable_contrast),
            max_retries: env_u32("API_RETRY_ATTEMPTS", defaults.max_retries),
            retry_min_wait_ms: env_u64("API_RETRY_MIN_WAIT", defaults.retry_min_wait_ms),
            retry_max_wait_ms: env_u64("API_RETRY_MAX_WAIT", defaults.retry_max_wait_ms),
            vision_call_timeout_secs: env_u64(
                "VISION_CALL_TIMEOUT_SECS",
                defaults.vision_call_timeout_secs,
            ),
            orchestrator_timeout_secs: env_u64(
                "ORCHESTRATOR_TIMEOUT_SECS",
                defaults.orchestrator_timeout_secs,
            ),
            prompt_dir: std::env::var("PROMPT_DIR")
                .map(std::path::PathBuf::from)
                .unwrap_or(defaults.prompt_dir),
        }
    }
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
