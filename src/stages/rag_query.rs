//! Answers the generated questions against the built index.

use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::config::{self, RagQueryConfig};
use crate::config_store::ConfigStore;
use crate::error::{OperatorError, Result};
use crate::operator::{InputSpec, Stage, StageJob};
use crate::retry::{RetryError, execute_until_stopped};
use crate::services::RetrievalEngine;
use crate::transforms::{extract_questions_from_file, persist_query_outputs};
use crate::types::{QueryFailure, QueryOutputs, QueryRecord};

use super::rag_index::engine_for;
use super::{channels, require_dir, require_file};

pub const PRODUCER: &str = "rag_query_evaluator";

/// Final stage of the run: joins the questions file with the index directory.
#[derive(Default)]
pub struct RagQueryStage {
  engine: Option<Arc<dyn RetrievalEngine>>,
}

impl RagQueryStage {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_engine(engine: Arc<dyn RetrievalEngine>) -> Self {
    Self {
      engine: Some(engine),
    }
  }
}

impl Stage for RagQueryStage {
  type Config = RagQueryConfig;
  type Deps = Arc<dyn RetrievalEngine>;

  fn name(&self) -> &str {
    PRODUCER
  }

  fn inputs(&self) -> InputSpec {
    InputSpec::Join(vec![
      channels::GENERATED_QUESTIONS_FILE.to_string(),
      channels::RAG_INDEX_DIR.to_string(),
    ])
  }

  fn output_id(&self) -> Option<&str> {
    Some(channels::QUERY_RESULTS)
  }

  fn is_final(&self) -> bool {
    true
  }

  fn load_config(&self, store: &dyn ConfigStore) -> Result<RagQueryConfig> {
    config::load(store)
  }

  fn init_dependencies(&self, config: &RagQueryConfig) -> Result<Arc<dyn RetrievalEngine>> {
    engine_for(&self.engine, &config.engine_url, config.engine_api_key.clone())
  }

  fn validate_input(&self, input_id: &str, payload: &Value) -> Result<()> {
    match input_id {
      channels::GENERATED_QUESTIONS_FILE => require_file(input_id, payload),
      channels::RAG_INDEX_DIR => require_dir(input_id, payload),
      _ => Ok(()),
    }
  }

  fn process(&self, job: StageJob<RagQueryConfig, Arc<dyn RetrievalEngine>>) -> BoxFuture<'static, Result<Value>> {
    Box::pin(async move {
      let cfg = job.config.as_ref();
      let engine = job.deps.as_ref();
      let policy = cfg.query_policy();
      let questions_file = job.input_path(channels::GENERATED_QUESTIONS_FILE)?;
      let index_dir = job.input_path(channels::RAG_INDEX_DIR)?;

      info!(index_dir = %index_dir.display(), "connecting to retrieval engine");
      execute_until_stopped(&policy, "engine initialize", &job.stop, || engine.initialize()).await?;

      let questions = extract_questions_from_file(&questions_file)?;
      if questions.is_empty() {
        error!(path = %questions_file.display(), "no questions extracted");
        return Err(OperatorError::invalid_input(
          channels::GENERATED_QUESTIONS_FILE,
          format!("no questions found in '{}'", questions_file.display()),
        ));
      }

      let mode = cfg.query_mode;
      info!(mode = %mode, count = questions.len(), "running queries");
      let total = questions.len();
      let mut results = Vec::new();
      let mut errors = Vec::new();
      for (i, question) in questions.into_iter().enumerate() {
        info!(n = i + 1, total, "processing query");
        let answer = execute_until_stopped(&policy, "retrieval query", &job.stop, || {
          engine.query(&question, mode)
        })
        .await;
        match answer {
          Ok(text) => results.push(QueryRecord {
            query: question,
            result: Value::String(text),
          }),
          Err(e @ RetryError::Stopped { .. }) => return Err(e.into()),
          Err(RetryError::Exhausted { last, .. }) => {
            warn!(query = %question, error = %last, "query failed after retries");
            errors.push(QueryFailure {
              query: question,
              error: last.to_string(),
            });
          }
        }
      }

      let outcome = persist_query_outputs(
        &results,
        &errors,
        &cfg.output_results_file,
        &cfg.output_errors_file,
      )?;
      info!(
        answered = results.len(),
        failed = errors.len(),
        degraded = outcome.results_degraded,
        "query results saved"
      );
      let outputs = QueryOutputs {
        results_file: cfg.output_results_file.clone(),
        errors_file: cfg.output_errors_file.clone(),
      };
      Ok(serde_json::to_value(outputs)?)
    })
  }
}
