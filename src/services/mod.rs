//! External collaborators: LLM chat, retrieval engine, dataset hub, tokenizer.
//!
//! Stages only see the traits. The HTTP adapters here are thin; retries are applied by
//! the calling stage through [crate::retry], never inside an adapter.

mod dataset;
#[cfg(test)]
mod dataset_test;
mod llm;
mod retrieval;
mod tokenizer;
#[cfg(test)]
mod tokenizer_test;

use std::time::Duration;

use reqwest::{Client, Response};
use thiserror::Error;

pub use dataset::{DatasetFetcher, HubDatasetFetcher};
pub use llm::{ChatClient, OpenAiChatClient};
pub use retrieval::{LightRagServerEngine, QueryMode, RetrievalEngine};
pub use tokenizer::{HfTokenizer, TextTokenizer, WhitespaceTokenizer};

/// Failure of a single call to an external service.
#[derive(Debug, Error)]
pub enum ServiceError {
  /// Transport-level failure (connect, timeout, body read).
  #[error("HTTP request error: {0}")]
  Http(#[from] reqwest::Error),

  /// The service answered with a non-success status.
  #[error("{service} returned HTTP {status}: {body}")]
  Status {
    service: &'static str,
    status: u16,
    body: String,
  },

  /// The response body did not have the expected shape.
  #[error("unexpected response from {service}: {message}")]
  Protocol {
    service: &'static str,
    message: String,
  },

  #[error("tokenizer error: {0}")]
  Tokenizer(String),

  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),
}

impl ServiceError {
  pub fn protocol(service: &'static str, message: impl Into<String>) -> Self {
    Self::Protocol {
      service,
      message: message.into(),
    }
  }
}

/// Per-request timeout for every HTTP adapter.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(300);

pub(crate) fn http_client() -> Result<Client, ServiceError> {
  Ok(Client::builder().timeout(HTTP_TIMEOUT).build()?)
}

/// Passes a successful response through; turns any other status into [ServiceError::Status].
pub(crate) async fn check_status(service: &'static str, response: Response) -> Result<Response, ServiceError> {
  let status = response.status();
  if status.is_success() {
    return Ok(response);
  }
  let body = response.text().await.unwrap_or_default();
  Err(ServiceError::Status {
    service,
    status: status.as_u16(),
    body,
  })
}

pub(crate) fn trim_base(url: &str) -> String {
  url.trim_end_matches('/').to_string()
}
