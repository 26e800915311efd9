//! Dataset snapshot download from a Hugging Face compatible hub.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde::Deserialize;
use tracing::{debug, info, instrument};

use super::{ServiceError, check_status, http_client};

const SERVICE: &str = "dataset hub";

/// Downloads every file of a dataset repository into a local directory.
#[async_trait]
pub trait DatasetFetcher: Send + Sync {
  /// Returns the number of files written.
  async fn fetch(&self, repo_id: &str, local_dir: &Path) -> Result<usize, ServiceError>;
}

/// Fetcher for `GET {endpoint}/api/datasets/{repo}` listings and `resolve/main` downloads.
pub struct HubDatasetFetcher {
  client: Client,
  endpoint: Url,
  token: Option<String>,
}

#[derive(Deserialize)]
struct DatasetInfo {
  #[serde(default)]
  siblings: Vec<Sibling>,
}

#[derive(Deserialize)]
struct Sibling {
  rfilename: String,
}

impl HubDatasetFetcher {
  pub fn new(endpoint: impl AsRef<str>, token: Option<String>) -> Result<Self, ServiceError> {
    let endpoint = Url::parse(endpoint.as_ref())
      .map_err(|e| ServiceError::protocol(SERVICE, format!("invalid hub endpoint: {e}")))?;
    if endpoint.cannot_be_a_base() {
      return Err(ServiceError::protocol(SERVICE, format!("hub endpoint '{endpoint}' cannot take a path")));
    }
    Ok(Self {
      client: http_client()?,
      endpoint,
      token,
    })
  }

  /// Endpoint with each `/`-separated part of `parts` appended as an encoded path segment.
  fn url(&self, parts: &[&str]) -> Url {
    let mut url = self.endpoint.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
      segments
        .pop_if_empty()
        .extend(parts.iter().flat_map(|p| p.split('/')));
    }
    url
  }

  fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
    match &self.token {
      Some(token) => builder.bearer_auth(token),
      None => builder,
    }
  }

  async fn list_files(&self, repo_id: &str) -> Result<Vec<String>, ServiceError> {
    let url = self.url(&["api", "datasets", repo_id]);
    let response = self.authorized(self.client.get(url)).send().await?;
    let info: DatasetInfo = check_status(SERVICE, response).await?.json().await?;
    Ok(info.siblings.into_iter().map(|s| s.rfilename).collect())
  }
}

/// Joins a repository-relative file name under `dir`, refusing absolute paths and `..`.
fn local_target(dir: &Path, rfilename: &str) -> Result<PathBuf, ServiceError> {
  let rel = Path::new(rfilename);
  if rel.components().all(|c| matches!(c, Component::Normal(_))) {
    Ok(dir.join(rel))
  } else {
    Err(ServiceError::protocol(SERVICE, format!("refusing unsafe file name '{rfilename}'")))
  }
}

#[async_trait]
impl DatasetFetcher for HubDatasetFetcher {
  #[instrument(level = "trace", skip(self))]
  async fn fetch(&self, repo_id: &str, local_dir: &Path) -> Result<usize, ServiceError> {
    let files = self.list_files(repo_id).await?;
    if files.is_empty() {
      return Err(ServiceError::protocol(SERVICE, format!("dataset '{repo_id}' lists no files")));
    }
    tokio::fs::create_dir_all(local_dir).await?;

    for file in &files {
      let target = local_target(local_dir, file)?;
      let url = self.url(&["datasets", repo_id, "resolve", "main", file]);
      debug!(url = %url, "downloading dataset file");
      let response = self.authorized(self.client.get(url)).send().await?;
      let bytes = check_status(SERVICE, response).await?.bytes().await?;
      if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
      }
      tokio::fs::write(&target, &bytes).await?;
    }
    info!(repo_id = %repo_id, files = files.len(), dir = %local_dir.display(), "dataset downloaded");
    Ok(files.len())
  }
}
