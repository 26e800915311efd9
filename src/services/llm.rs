//! OpenAI-compatible chat completion client.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{ServiceError, check_status, http_client, trim_base};

const SERVICE: &str = "llm";

/// Single-prompt text completion.
#[async_trait]
pub trait ChatClient: Send + Sync {
  async fn complete(&self, prompt: &str) -> Result<String, ServiceError>;
}

/// Client for `POST {base_url}/chat/completions`.
pub struct OpenAiChatClient {
  client: Client,
  base_url: String,
  api_key: String,
  model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
  model: &'a str,
  messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
  role: &'a str,
  content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
  #[serde(default)]
  choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
  message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
  content: Option<String>,
}

impl OpenAiChatClient {
  pub fn new(
    base_url: impl AsRef<str>,
    api_key: impl Into<String>,
    model: impl Into<String>,
  ) -> Result<Self, ServiceError> {
    Ok(Self {
      client: http_client()?,
      base_url: trim_base(base_url.as_ref()),
      api_key: api_key.into(),
      model: model.into(),
    })
  }
}

#[async_trait]
impl ChatClient for OpenAiChatClient {
  #[instrument(level = "trace", skip(self, prompt), fields(model = %self.model))]
  async fn complete(&self, prompt: &str) -> Result<String, ServiceError> {
    let url = format!("{}/chat/completions", self.base_url);
    let request = ChatRequest {
      model: &self.model,
      messages: vec![ChatMessage {
        role: "user",
        content: prompt,
      }],
    };
    debug!(url = %url, prompt_chars = prompt.len(), "sending chat completion");

    let response = self
      .client
      .post(&url)
      .bearer_auth(&self.api_key)
      .json(&request)
      .send()
      .await?;
    let body: ChatResponse = check_status(SERVICE, response).await?.json().await?;

    body
      .choices
      .into_iter()
      .next()
      .and_then(|c| c.message.content)
      .filter(|content| !content.trim().is_empty())
      .ok_or_else(|| ServiceError::protocol(SERVICE, "completion has no message content"))
  }
}
