use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::chat::{
  ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
  ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessageArgs,
  ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest,
  CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;

use super::{non_empty_answer, ChatBackend};
use crate::error::VisibilityError;
use crate::platform::Platform;

const SYSTEM_PROMPT: &str =
  "You are a helpful assistant. When recommending companies or services, include their websites.";
const MAX_TOKENS: u32 = 1024;

fn build_error(e: impl std::fmt::Display) -> VisibilityError {
  VisibilityError::transport(Platform::ChatGpt, format!("failed to build request: {e}"))
}

pub fn build_visibility_messages(prompt: &str) -> Result<Vec<ChatCompletionRequestMessage>, VisibilityError> {
  let system_msg = ChatCompletionRequestSystemMessageArgs::default()
    .content(ChatCompletionRequestSystemMessageContent::Text(SYSTEM_PROMPT.to_string()))
    .build()
    .map_err(build_error)?;

  let user_msg = ChatCompletionRequestUserMessageArgs::default()
    .content(ChatCompletionRequestUserMessageContent::Text(prompt.to_string()))
    .build()
    .map_err(build_error)?;

  Ok(vec![
    ChatCompletionRequestMessage::System(system_msg),
    ChatCompletionRequestMessage::User(user_msg),
  ])
}

pub struct ChatCompletionsPayloadArgs<'a> {
  pub model: &'a str,
  pub messages: Vec<ChatCompletionRequestMessage>,
  pub max_tokens: u32,
}

pub fn build_chat_completions_request(
  args: ChatCompletionsPayloadArgs<'_>,
) -> Result<CreateChatCompletionRequest, VisibilityError> {
  CreateChatCompletionRequestArgs::default()
    .model(args.model)
    .messages(args.messages)
    .temperature(0.2)
    .max_completion_tokens(args.max_tokens)
    .build()
    .map_err(build_error)
}

pub fn openai_client(api_key: &str, api_base_url: &str) -> Client<OpenAIConfig> {
  let config = OpenAIConfig::new()
    .with_api_key(api_key)
    .with_api_base(api_base_url.trim_end_matches('/'));
  Client::with_config(config)
}

fn map_openai_error(err: OpenAIError) -> VisibilityError {
  match err {
    OpenAIError::JSONDeserialize(..) => VisibilityError::malformed(Platform::ChatGpt, err.to_string()),
    other => VisibilityError::transport(Platform::ChatGpt, other),
  }
}

pub struct OpenAiBackend {
  client: Client<OpenAIConfig>,
  model: String,
}

impl OpenAiBackend {
  pub fn new(api_key: &str, model: &str, api_base_url: &str) -> Self {
    Self {
      client: openai_client(api_key.trim(), api_base_url.trim()),
      model: model.trim().to_string(),
    }
  }
}

#[async_trait]
impl ChatBackend for OpenAiBackend {
  async fn complete(&self, prompt: &str) -> Result<String, VisibilityError> {
    let request = build_chat_completions_request(ChatCompletionsPayloadArgs {
      model: &self.model,
      messages: build_visibility_messages(prompt)?,
      max_tokens: MAX_TOKENS,
    })?;

    let response = self
      .client
      .chat()
      .create(request)
      .await
      .map_err(map_openai_error)?;

    let text = response
      .choices
      .into_iter()
      .next()
      .and_then(|choice| choice.message.content)
      .ok_or_else(|| VisibilityError::malformed(Platform::ChatGpt, "missing choices[0].message.content"))?;
    non_empty_answer(Platform::ChatGpt, text)
  }
}
