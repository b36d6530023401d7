use crate::vision::{call_with_retry, ClassifiedError, ErrorCode, RetryPolicy};
use genai::chat::{ChatMessage, ChatRequest, ContentPart, MessageContent};
use genai::Client;

/// A vision-capable chat model that can extract structured data from page
/// images given a prompt. Exactly one implementation ships by default; the
/// trait exists so a second backend can be added without touching the
/// orchestrator or post-processor.
#[async_trait::async_trait]
pub trait VisionProvider: Send + Sync {
    /// Send one or more base64-encoded page images plus a prompt to the
    /// model and return its raw text response (expected to be JSON).
    async fn extract(
        &self,
        images_b64: &[String],
        prompt: &str,
        retries: &RetryPolicy,
    ) -> Result<String, ClassifiedError>;

    /// Verify the provider is reachable and correctly configured.
    async fn check(&self) -> Result<(), ClassifiedError>;

    fn provider_name(&self) -> &str;
    fn model_name(&self) -> &str;
}

/// The default vision-call model identifier, used when no explicit model
/// is configured.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Multimodal chat provider built on `genai`'s multi-backend client.
pub struct ChatVisionProvider {
    model: String,
    client: Client,
}

impl ChatVisionProvider {
    pub fn new(model: impl Into<String>) -> Self {
        Self { model: model.into(), client: Client::default() }
    }
}

#[async_trait::async_trait]
impl VisionProvider for ChatVisionProvider {
    async fn extract(
        &self,
        images_b64: &[String],
        prompt: &str,
        retries: &RetryPolicy,
    ) -> Result<String, ClassifiedError> {
        call_with_retry(retries, || async {
            let mut content = MessageContent::from_text(prompt);
            for img in images_b64 {
                content = content.append(ContentPart::from_binary_base64(
                    "image/png",
                    img.clone(),
                    None::<String>,
                ));
            }
            let message = ChatMessage::user(content);
            let request = ChatRequest::from_messages(vec![message]);

            self.client
                .exec_chat(&self.model, request, None)
                .await
                .map(|response| response.first_text().unwrap_or_default().trim().to_string())
                .map_err(|e| classify_error(&e))
        })
        .await
    }

    async fn check(&self) -> Result<(), ClassifiedError> {
        if std::env::var("VISION_API_KEY").is_err() {
            return Err(ClassifiedError::new(
                ErrorCode::E002,
                "missing VISION_API_KEY environment variable",
            ));
        }
        Ok(())
    }

    fn provider_name(&self) -> &str {
        "chat"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Map a `genai` transport/API error onto one of the stable error codes.
///
/// `genai` does not expose a structured status-code taxonomy uniform
/// across backends, so classification falls back to matching the
/// formatted error text the way an upstream-agnostic client must.
fn classify_error(err: &genai::Error) -> ClassifiedError {
    let detail = err.to_string();
    let lower = detail.to_lowercase();

    let code = if lower.contains("401") || lower.contains("unauthorized") || lower.contains("api key") {
        ErrorCode::E002
    } else if lower.contains("403") || lower.contains("forbidden") || lower.contains("permission") {
        ErrorCode::E003
    } else if lower.contains("429") || lower.contains("rate limit") || lower.contains("quota") {
        ErrorCode::E001
    } else if lower.contains("timeout") || lower.contains("deadline") {
        ErrorCode::E004
    } else if lower.contains("connect") || lower.contains("network") || lower.contains("dns") {
        ErrorCode::E005
    } else if lower.contains("500") || lower.contains("502") || lower.contains("503") || lower.contains("unavailable") {
        ErrorCode::E001
    } else {
        ErrorCode::E099
    };

    ClassifiedError::new(code, detail)
}
