use async_trait::async_trait;
use hyper::header::HeaderName;
use serde_json::Value;

use super::{non_empty_answer, ChatBackend};
use crate::error::VisibilityError;
use crate::http_client::post_json;
use crate::platform::Platform;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1024;

pub struct AnthropicBackend {
  api_key: String,
  model: String,
  api_base_url: String,
}

impl AnthropicBackend {
  pub fn new(api_key: &str, model: &str, api_base_url: &str) -> Self {
    Self {
      api_key: api_key.trim().to_string(),
      model: model.trim().to_string(),
      api_base_url: api_base_url.trim().to_string(),
    }
  }

  fn messages_url(&self) -> String {
    format!("{}/v1/messages", self.api_base_url.trim_end_matches('/'))
  }
}

fn build_request_json(model: &str, prompt: &str) -> Value {
  serde_json::json!({
    "model": model,
    "max_tokens": MAX_TOKENS,
    "messages": [{"role": "user", "content": prompt}]
  })
}

fn extract_text_from_response_json(json: &Value) -> Result<String, VisibilityError> {
  let blocks = json
    .get("content")
    .and_then(|v| v.as_array())
    .ok_or_else(|| VisibilityError::malformed(Platform::Claude, "missing content array"))?;

  let mut out = String::new();
  for block in blocks {
    if block.get("type").and_then(|v| v.as_str()) != Some("text") {
      continue;
    }
    if let Some(text) = block.get("text").and_then(|v| v.as_str()) {
      out.push_str(text);
    }
  }
  Ok(out)
}

#[async_trait]
impl ChatBackend for AnthropicBackend {
  async fn complete(&self, prompt: &str) -> Result<String, VisibilityError> {
    let headers = [
      (HeaderName::from_static("x-api-key"), self.api_key.clone()),
      (HeaderName::from_static("anthropic-version"), ANTHROPIC_VERSION.to_string()),
    ];
    let json = post_json(
      Platform::Claude,
      &self.messages_url(),
      &headers,
      &build_request_json(&self.model, prompt),
    )
    .await?;
    non_empty_answer(Platform::Claude, extract_text_from_response_json(&json)?)
  }
}
