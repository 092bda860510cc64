use async_trait::async_trait;
use hyper::header::AUTHORIZATION;
use serde_json::Value;

use super::{non_empty_answer, ChatBackend};
use crate::error::VisibilityError;
use crate::http_client::post_json;
use crate::platform::Platform;

pub struct PerplexityBackend {
  api_key: String,
  model: String,
  api_base_url: String,
}

impl PerplexityBackend {
  pub fn new(api_key: &str, model: &str, api_base_url: &str) -> Self {
    Self {
      api_key: api_key.trim().to_string(),
      model: model.trim().to_string(),
      api_base_url: api_base_url.trim().to_string(),
    }
  }
}

fn build_request_json(model: &str, prompt: &str) -> Value {
  serde_json::json!({
    "model": model,
    "messages": [
      {"role": "system", "content": "Be precise and include company websites when recommending providers."},
      {"role": "user", "content": prompt}
    ],
    "temperature": 0.2
  })
}

/// OpenAI-compatible envelope: `choices[0].message.content`.
fn extract_text_from_response_json(json: &Value) -> Result<String, VisibilityError> {
  json
    .get("choices")
    .and_then(|v| v.as_array())
    .and_then(|choices| choices.first())
    .and_then(|c| c.get("message"))
    .and_then(|m| m.get("content"))
    .and_then(|c| c.as_str())
    .map(str::to_string)
    .ok_or_else(|| VisibilityError::malformed(Platform::Perplexity, "missing choices[0].message.content"))
}

#[async_trait]
impl ChatBackend for PerplexityBackend {
  async fn complete(&self, prompt: &str) -> Result<String, VisibilityError> {
    let url = format!("{}/chat/completions", self.api_base_url.trim_end_matches('/'));
    let headers = [(AUTHORIZATION, format!("Bearer {}", self.api_key))];
    let json = post_json(
      Platform::Perplexity,
      &url,
      &headers,
      &build_request_json(&self.model, prompt),
    )
    .await?;
    non_empty_answer(Platform::Perplexity, extract_text_from_response_json(&json)?)
  }
}
