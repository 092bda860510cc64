use std::sync::Arc;

use async_trait::async_trait;

use crate::config::ProviderConfig;
use crate::error::VisibilityError;
use crate::platform::Platform;

pub mod anthropic;
pub mod gemini;
pub mod openai;
pub mod perplexity;

/// Send a prompt, get the answer text back.
///
/// The visibility engine depends on nothing else from a chat API.
#[async_trait]
pub trait ChatBackend: Send + Sync {
  async fn complete(&self, prompt: &str) -> Result<String, VisibilityError>;
}

/// Backend for `platform`, or `None` when its credential is not configured.
pub fn backend_for(platform: Platform, cfg: &ProviderConfig) -> Option<Arc<dyn ChatBackend>> {
  let api_key = cfg.api_key.as_deref()?;
  let backend: Arc<dyn ChatBackend> = match platform {
    Platform::ChatGpt => Arc::new(openai::OpenAiBackend::new(api_key, &cfg.model, &cfg.api_base_url)),
    Platform::Claude => Arc::new(anthropic::AnthropicBackend::new(api_key, &cfg.model, &cfg.api_base_url)),
    Platform::Gemini => Arc::new(gemini::GeminiBackend::new(gemini::GeminiConfig {
      api_key: api_key.to_string(),
      model: cfg.model.clone(),
      api_base_url: cfg.api_base_url.clone(),
    })),
    Platform::Perplexity => Arc::new(perplexity::PerplexityBackend::new(api_key, &cfg.model, &cfg.api_base_url)),
  };
  Some(backend)
}

pub(crate) fn non_empty_answer(platform: Platform, text: String) -> Result<String, VisibilityError> {
  if text.trim().is_empty() {
    return Err(VisibilityError::malformed(platform, "response contained no answer text"));
  }
  Ok(text)
}
