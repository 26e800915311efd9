//! Retrieval engine boundary and its HTTP binding.
//!
//! The engine is opaque: the pipeline only initializes it, inserts documents and asks
//! questions. [LightRagServerEngine] talks to a running LightRAG server.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument};

use super::{ServiceError, check_status, http_client, trim_base};

const SERVICE: &str = "retrieval engine";

/// Retrieval strategy used for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum QueryMode {
  /// Entity neighbourhood in the knowledge graph.
  Local,
  /// Relationship-level graph search.
  Global,
  /// Plain vector similarity.
  Naive,
  Hybrid,
  Mix,
}

impl QueryMode {
  pub fn as_str(self) -> &'static str {
    match self {
      QueryMode::Local => "local",
      QueryMode::Global => "global",
      QueryMode::Naive => "naive",
      QueryMode::Hybrid => "hybrid",
      QueryMode::Mix => "mix",
    }
  }
}

impl fmt::Display for QueryMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for QueryMode {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "local" => Ok(QueryMode::Local),
      "global" => Ok(QueryMode::Global),
      "naive" => Ok(QueryMode::Naive),
      "hybrid" => Ok(QueryMode::Hybrid),
      "mix" => Ok(QueryMode::Mix),
      other => Err(format!("unknown query mode '{other}'")),
    }
  }
}

impl TryFrom<String> for QueryMode {
  type Error = String;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    value.parse()
  }
}

/// Document index plus question answering.
#[async_trait]
pub trait RetrievalEngine: Send + Sync {
  /// Prepares storage; must succeed before insert or query.
  async fn initialize(&self) -> Result<(), ServiceError>;

  async fn insert(&self, documents: Vec<String>) -> Result<(), ServiceError>;

  async fn query(&self, text: &str, mode: QueryMode) -> Result<String, ServiceError>;
}

/// HTTP binding for a LightRAG API server.
pub struct LightRagServerEngine {
  client: Client,
  base_url: String,
  api_key: Option<String>,
}

#[derive(Serialize)]
struct InsertTexts {
  texts: Vec<String>,
}

#[derive(Serialize)]
struct QueryRequest<'a> {
  query: &'a str,
  mode: QueryMode,
}

impl LightRagServerEngine {
  pub fn new(base_url: impl AsRef<str>, api_key: Option<String>) -> Result<Self, ServiceError> {
    Ok(Self {
      client: http_client()?,
      base_url: trim_base(base_url.as_ref()),
      api_key,
    })
  }

  fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
    match &self.api_key {
      Some(key) => builder.header("X-API-Key", key),
      None => builder,
    }
  }
}

#[async_trait]
impl RetrievalEngine for LightRagServerEngine {
  async fn initialize(&self) -> Result<(), ServiceError> {
    let url = format!("{}/health", self.base_url);
    let response = self.authorized(self.client.get(&url)).send().await?;
    let health: Value = check_status(SERVICE, response).await?.json().await?;
    let status = health.get("status").cloned().unwrap_or_default();
    info!(url = %url, status = %status, "retrieval engine reachable");
    Ok(())
  }

  #[instrument(level = "trace", skip(self, documents), fields(count = documents.len()))]
  async fn insert(&self, documents: Vec<String>) -> Result<(), ServiceError> {
    let url = format!("{}/documents/texts", self.base_url);
    let response = self
      .authorized(self.client.post(&url))
      .json(&InsertTexts { texts: documents })
      .send()
      .await?;
    check_status(SERVICE, response).await?;
    debug!(url = %url, "documents accepted");
    Ok(())
  }

  #[instrument(level = "trace", skip(self, text))]
  async fn query(&self, text: &str, mode: QueryMode) -> Result<String, ServiceError> {
    let url = format!("{}/query", self.base_url);
    let response = self
      .authorized(self.client.post(&url))
      .json(&QueryRequest { query: text, mode })
      .send()
      .await?;
    let body: Value = check_status(SERVICE, response).await?.json().await?;
    match body.get("response") {
      Some(Value::String(answer)) => Ok(answer.clone()),
      Some(other) => Ok(other.to_string()),
      None => Err(ServiceError::protocol(SERVICE, "query response has no 'response' field")),
    }
  }
}
