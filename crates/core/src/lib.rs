pub mod config;
pub mod error;
pub mod extract;
pub mod postprocess;
pub mod preprocess;
pub mod progress;
pub mod prompts;
pub mod value;
pub mod vision;

pub use config::{ExtractionMode, ProcessingConfig};
pub use error::{CoreError, CoreResult};
pub use extract::{extract_document, ExtractionResult};
pub use postprocess::{column_order, merge_payloads, normalize_number};
pub use preprocess::{preprocess, PageImage};
pub use progress::{ProgressReporter, SilentReporter};
pub use prompts::{load_prompt, PromptRole};
pub use value::{DocValue, FieldValue};
pub use vision::provider::{ChatVisionProvider, VisionProvider, DEFAULT_MODEL};
pub use vision::{call_with_retry, ClassifiedError, ErrorCode, RetryPolicy};
