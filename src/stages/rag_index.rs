//! Inserts extracted contexts into the retrieval engine.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::config::{self, RagIndexConfig};
use crate::config_store::ConfigStore;
use crate::error::{OperatorError, Result};
use crate::operator::{InputSpec, Stage, StageJob};
use crate::retry::execute_until_stopped;
use crate::services::{LightRagServerEngine, RetrievalEngine};
use crate::transforms::{FilePattern, matching_files, read_contexts};

use super::{channels, path_value, require_dir};

pub const PRODUCER: &str = "rag_indexer";

/// Written into the working directory after a successful index run.
pub const INDEX_MANIFEST_FILE: &str = "index_manifest.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
  pub file: PathBuf,
  pub contexts: usize,
}

/// Record of what an index run inserted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
  pub source_dir: PathBuf,
  pub pattern: String,
  pub files: Vec<ManifestEntry>,
  pub total_contexts: usize,
  pub indexed_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct RagIndexStage {
  engine: Option<Arc<dyn RetrievalEngine>>,
}

impl RagIndexStage {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_engine(engine: Arc<dyn RetrievalEngine>) -> Self {
    Self {
      engine: Some(engine),
    }
  }
}

pub(crate) fn engine_for(
  injected: &Option<Arc<dyn RetrievalEngine>>,
  url: &str,
  api_key: Option<String>,
) -> Result<Arc<dyn RetrievalEngine>> {
  match injected {
    Some(e) => Ok(e.clone()),
    None => Ok(Arc::new(
      LightRagServerEngine::new(url, api_key).map_err(|e| OperatorError::dependency(e.to_string()))?,
    )),
  }
}

impl Stage for RagIndexStage {
  type Config = RagIndexConfig;
  type Deps = Arc<dyn RetrievalEngine>;

  fn name(&self) -> &str {
    PRODUCER
  }

  fn inputs(&self) -> InputSpec {
    InputSpec::Single(channels::UNIQUE_CONTEXTS_DIR.to_string())
  }

  fn output_id(&self) -> Option<&str> {
    Some(channels::RAG_INDEX_DIR)
  }

  fn load_config(&self, store: &dyn ConfigStore) -> Result<RagIndexConfig> {
    config::load(store)
  }

  fn init_dependencies(&self, config: &RagIndexConfig) -> Result<Arc<dyn RetrievalEngine>> {
    engine_for(&self.engine, &config.engine_url, config.engine_api_key.clone())
  }

  fn validate_input(&self, input_id: &str, payload: &Value) -> Result<()> {
    require_dir(input_id, payload)
  }

  fn process(&self, job: StageJob<RagIndexConfig, Arc<dyn RetrievalEngine>>) -> BoxFuture<'static, Result<Value>> {
    Box::pin(async move {
      let cfg = job.config.as_ref();
      let engine = job.deps.as_ref();
      let policy = cfg.insert_policy();
      let source_dir = job.input_path(channels::UNIQUE_CONTEXTS_DIR)?;

      execute_until_stopped(&policy, "engine initialize", &job.stop, || engine.initialize()).await?;
      info!(working_dir = %cfg.working_dir.display(), "retrieval engine ready");

      let pattern = FilePattern::new(&cfg.input_contexts_filename_pattern)?;
      let files = matching_files(&source_dir, &pattern)?;
      if files.is_empty() {
        warn!(
          dir = %source_dir.display(),
          pattern = %pattern.as_str(),
          "no context files match, index will be empty"
        );
      }

      let mut entries = Vec::with_capacity(files.len());
      for file in files {
        let contexts = read_contexts(&file).inspect_err(|e| {
          error!(path = %file.display(), error = %e, "stopping indexing on unreadable context file");
        })?;
        if contexts.is_empty() {
          info!(path = %file.display(), "context file is empty, nothing to insert");
          entries.push(ManifestEntry { file, contexts: 0 });
          continue;
        }
        let count = contexts.len();
        info!(path = %file.display(), count, "inserting contexts");
        execute_until_stopped(&policy, "engine insert", &job.stop, || engine.insert(contexts.clone()))
          .await
          .inspect_err(|e| error!(path = %file.display(), error = %e, "stopping indexing on failed insert"))?;
        entries.push(ManifestEntry {
          file,
          contexts: count,
        });
      }

      let manifest = IndexManifest {
        source_dir,
        pattern: pattern.as_str().to_string(),
        total_contexts: entries.iter().map(|e| e.contexts).sum(),
        files: entries,
        indexed_at: Utc::now(),
      };
      let manifest_path = cfg.working_dir.join(INDEX_MANIFEST_FILE);
      tokio::fs::write(&manifest_path, serde_json::to_vec_pretty(&manifest)?).await?;
      info!(
        files = manifest.files.len(),
        total = manifest.total_contexts,
        path = %manifest_path.display(),
        "indexing complete"
      );
      Ok(path_value(&cfg.working_dir))
    })
  }
}
