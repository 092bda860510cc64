use async_trait::async_trait;
use serde_json::Value;

use super::{non_empty_answer, ChatBackend};
use crate::error::VisibilityError;
use crate::http_client::post_json;
use crate::platform::Platform;

const TEMPERATURE: f64 = 0.2;
const MAX_OUTPUT_TOKENS: u32 = 1024;

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub api_base_url: String,
}

fn model_path(model: &str) -> String {
    let m = model.trim();
    if m.starts_with("models/") {
        m.to_string()
    } else {
        format!("models/{m}")
    }
}

fn build_url(cfg: &GeminiConfig, method: &str) -> String {
    let base = cfg.api_base_url.trim_end_matches('/');
    let model = model_path(&cfg.model);
    format!("{base}/{model}:{method}?key={}", cfg.api_key)
}

fn build_request_json(user: &str, temperature: f64, max_output_tokens: u32) -> Value {
    serde_json::json!({
      "contents":[{"role":"user","parts":[{"text": user}]}],
      "generationConfig": {
        "temperature": temperature,
        "maxOutputTokens": max_output_tokens
      }
    })
}

fn extract_text_from_response_json(json: &Value) -> Result<String, VisibilityError> {
    let candidates = json
        .get("candidates")
        .and_then(|v| v.as_array())
        .ok_or_else(|| VisibilityError::malformed(Platform::Gemini, "missing candidates"))?;

    let mut out = String::new();
    for cand in candidates {
        let parts = cand
            .get("content")
            .and_then(|v| v.get("parts"))
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();
        for part in parts {
            if let Some(text) = part.get("text").and_then(|v| v.as_str()) {
                out.push_str(text);
            }
        }
    }
    Ok(out)
}

pub struct GeminiBackend {
    cfg: GeminiConfig,
}

impl GeminiBackend {
    pub fn new(cfg: GeminiConfig) -> Self {
        Self { cfg }
    }
}

#[async_trait]
impl ChatBackend for GeminiBackend {
    async fn complete(&self, prompt: &str) -> Result<String, VisibilityError> {
        let url = build_url(&self.cfg, "generateContent");
        let payload = build_request_json(prompt, TEMPERATURE, MAX_OUTPUT_TOKENS);
        let json = post_json(Platform::Gemini, &url, &[], &payload).await?;
        non_empty_answer(Platform::Gemini, extract_text_from_response_json(&json)?)
    }
}
