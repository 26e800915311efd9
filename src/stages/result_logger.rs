//! Terminal sink: logs the final payload.

use futures::future::BoxFuture;
use serde_json::Value;
use tracing::{info, warn};

use crate::config_store::ConfigStore;
use crate::error::Result;
use crate::operator::{InputSpec, Stage, StageJob};

pub const PRODUCER: &str = "result_logger";

const FILE_KEYS: [&str; 2] = ["results_file", "errors_file"];

#[derive(Debug, Default)]
pub struct ResultLoggerStage;

impl ResultLoggerStage {
  pub fn new() -> Self {
    Self
  }
}

/// Keys among `results_file`/`errors_file` that are absent or name no existing file.
pub(crate) fn missing_result_files(payload: &Value) -> Vec<&'static str> {
  let Some(obj) = payload.as_object() else {
    return Vec::new();
  };
  FILE_KEYS
    .into_iter()
    .filter(|key| {
      !obj
        .get(*key)
        .and_then(Value::as_str)
        .is_some_and(|p| std::path::Path::new(p).is_file())
    })
    .collect()
}

impl Stage for ResultLoggerStage {
  type Config = ();
  type Deps = ();

  fn name(&self) -> &str {
    PRODUCER
  }

  fn inputs(&self) -> InputSpec {
    InputSpec::Trigger
  }

  fn output_id(&self) -> Option<&str> {
    None
  }

  fn load_config(&self, _store: &dyn ConfigStore) -> Result<()> {
    Ok(())
  }

  fn init_dependencies(&self, _config: &()) -> Result<()> {
    Ok(())
  }

  fn process(&self, job: StageJob<(), ()>) -> BoxFuture<'static, Result<Value>> {
    Box::pin(async move {
      for (input_id, payload) in &job.inputs {
        let pretty = serde_json::to_string_pretty(payload).unwrap_or_else(|_| payload.to_string());
        info!(input_id = %input_id, "pipeline result:\n{pretty}");
        for key in missing_result_files(payload) {
          warn!(input_id = %input_id, key, "result file missing");
        }
      }
      Ok(Value::Null)
    })
  }
}
