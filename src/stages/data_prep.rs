//! Dataset download and unique-context extraction.

use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::config::{self, DataPrepConfig};
use crate::config_store::ConfigStore;
use crate::error::{OperatorError, Result};
use crate::operator::{InputSpec, Stage, StageJob};
use crate::retry::{RetryError, execute_until_stopped};
use crate::services::{DatasetFetcher, HubDatasetFetcher};
use crate::transforms::extract_unique_contexts;

use super::{channels, dir_has_entries, path_value};

pub const PRODUCER: &str = "data_prep";

/// First stage: fires on any trigger and hands the contexts directory downstream.
#[derive(Default)]
pub struct DataPrepStage {
  fetcher: Option<Arc<dyn DatasetFetcher>>,
}

pub struct DataPrepDeps {
  pub fetcher: Arc<dyn DatasetFetcher>,
}

impl DataPrepStage {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_fetcher(fetcher: Arc<dyn DatasetFetcher>) -> Self {
    Self {
      fetcher: Some(fetcher),
    }
  }
}

impl Stage for DataPrepStage {
  type Config = DataPrepConfig;
  type Deps = DataPrepDeps;

  fn name(&self) -> &str {
    PRODUCER
  }

  fn inputs(&self) -> InputSpec {
    InputSpec::Trigger
  }

  fn output_id(&self) -> Option<&str> {
    Some(channels::UNIQUE_CONTEXTS_DIR)
  }

  fn load_config(&self, store: &dyn ConfigStore) -> Result<DataPrepConfig> {
    config::load(store)
  }

  fn init_dependencies(&self, config: &DataPrepConfig) -> Result<DataPrepDeps> {
    let fetcher: Arc<dyn DatasetFetcher> = match &self.fetcher {
      Some(f) => f.clone(),
      None => Arc::new(
        HubDatasetFetcher::new(&config.hub_endpoint, config.hub_token.clone())
          .map_err(|e| OperatorError::dependency(e.to_string()))?,
      ),
    };
    Ok(DataPrepDeps { fetcher })
  }

  fn process(&self, job: StageJob<DataPrepConfig, DataPrepDeps>) -> BoxFuture<'static, Result<Value>> {
    Box::pin(async move {
      let cfg = job.config.as_ref();
      let download_dir = cfg.download_dir.as_path();

      if cfg.skip_download {
        info!(dir = %download_dir.display(), "skipping download, using existing dataset");
        if !dir_has_entries(download_dir) {
          error!(dir = %download_dir.display(), "download skipped but directory is missing or empty");
          return Err(OperatorError::configuration(format!(
            "SKIP_DOWNLOAD is set but '{}' is missing or empty",
            download_dir.display()
          )));
        }
      } else {
        info!(repo_id = %cfg.dataset_repo_id, dir = %download_dir.display(), "downloading dataset");
        let fetched = execute_until_stopped(&cfg.download_policy(), "dataset download", &job.stop, || {
          job.deps.fetcher.fetch(&cfg.dataset_repo_id, download_dir)
        })
        .await;
        match fetched {
          Ok(files) => info!(files, "dataset download complete"),
          Err(e @ RetryError::Stopped { .. }) => return Err(e.into()),
          Err(e) if dir_has_entries(download_dir) => {
            warn!(
              dir = %download_dir.display(),
              error = %e,
              "download failed but directory is not empty, assuming dataset is present"
            );
          }
          Err(e) => return Err(e.into()),
        }
      }

      let report = extract_unique_contexts(download_dir, &cfg.output_dir)?;
      if report.all_succeeded {
        info!(files = report.files.len(), "context extraction complete");
      } else {
        warn!(files = report.files.len(), "context extraction finished with errors");
      }
      Ok(path_value(&cfg.output_dir))
    })
  }
}
