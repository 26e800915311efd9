//! Question generation from summarized dataset contexts.

use std::path::Path;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;
use tracing::info;

use crate::config::{self, QuestionGenConfig};
use crate::config_store::ConfigStore;
use crate::error::{OperatorError, Result};
use crate::operator::{InputSpec, Stage, StageJob};
use crate::retry::execute_until_stopped;
use crate::services::{ChatClient, HfTokenizer, OpenAiChatClient, TextTokenizer, WhitespaceTokenizer};
use crate::transforms::{build_question_prompt, read_contexts, summarize};

use super::{channels, path_value, require_dir};

pub const PRODUCER: &str = "question_generator";

#[derive(Default)]
pub struct QuestionGenStage {
  chat: Option<Arc<dyn ChatClient>>,
  tokenizer: Option<Arc<dyn TextTokenizer>>,
}

pub struct QuestionGenDeps {
  pub chat: Arc<dyn ChatClient>,
  pub tokenizer: Arc<dyn TextTokenizer>,
}

impl QuestionGenStage {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_services(chat: Arc<dyn ChatClient>, tokenizer: Arc<dyn TextTokenizer>) -> Self {
    Self {
      chat: Some(chat),
      tokenizer: Some(tokenizer),
    }
  }
}

fn load_tokenizer(config: &QuestionGenConfig) -> Result<Arc<dyn TextTokenizer>> {
  if config.uses_whitespace_tokenizer() {
    return Ok(Arc::new(WhitespaceTokenizer));
  }
  info!(tokenizer = %config.tokenizer_model, "loading tokenizer");
  let tokenizer = HfTokenizer::from_file(Path::new(&config.tokenizer_model))
    .map_err(|e| OperatorError::dependency(e.to_string()))?;
  Ok(Arc::new(tokenizer))
}

impl Stage for QuestionGenStage {
  type Config = QuestionGenConfig;
  type Deps = QuestionGenDeps;

  fn name(&self) -> &str {
    PRODUCER
  }

  fn inputs(&self) -> InputSpec {
    InputSpec::Single(channels::UNIQUE_CONTEXTS_DIR.to_string())
  }

  fn output_id(&self) -> Option<&str> {
    Some(channels::GENERATED_QUESTIONS_FILE)
  }

  fn load_config(&self, store: &dyn ConfigStore) -> Result<QuestionGenConfig> {
    config::load(store)
  }

  fn init_dependencies(&self, config: &QuestionGenConfig) -> Result<QuestionGenDeps> {
    let tokenizer = match &self.tokenizer {
      Some(t) => t.clone(),
      None => load_tokenizer(config)?,
    };
    let chat: Arc<dyn ChatClient> = match &self.chat {
      Some(c) => c.clone(),
      None => Arc::new(
        OpenAiChatClient::new(&config.llm_base_url, config.llm_api_key.clone(), config.llm_model_name.clone())
          .map_err(|e| OperatorError::dependency(e.to_string()))?,
      ),
    };
    Ok(QuestionGenDeps { chat, tokenizer })
  }

  fn validate_input(&self, input_id: &str, payload: &Value) -> Result<()> {
    require_dir(input_id, payload)
  }

  fn process(&self, job: StageJob<QuestionGenConfig, QuestionGenDeps>) -> BoxFuture<'static, Result<Value>> {
    Box::pin(async move {
      let cfg = job.config.as_ref();
      let contexts_dir = job.input_path(channels::UNIQUE_CONTEXTS_DIR)?;
      let contexts_file = contexts_dir.join(&cfg.input_contexts_filename);
      info!(path = %contexts_file.display(), "loading contexts");
      if !contexts_file.is_file() {
        return Err(OperatorError::invalid_input(
          channels::UNIQUE_CONTEXTS_DIR,
          format!("required context file '{}' not found", contexts_file.display()),
        ));
      }
      let contexts = read_contexts(&contexts_file)?;
      if contexts.is_empty() {
        return Err(OperatorError::invalid_input(
          channels::UNIQUE_CONTEXTS_DIR,
          format!("context file '{}' is empty", contexts_file.display()),
        ));
      }

      info!(count = contexts.len(), "summarizing contexts");
      let tokenizer = job.deps.tokenizer.as_ref();
      let summaries: Vec<String> = contexts
        .iter()
        .map(|ctx| summarize(ctx, tokenizer, cfg.summary_total_tokens))
        .collect();
      let prompt = build_question_prompt(&summaries);
      info!(prompt_chars = prompt.len(), "requesting question generation");

      let generated = execute_until_stopped(&cfg.llm_policy(), "llm completion", &job.stop, || {
        job.deps.chat.complete(&prompt)
      })
      .await?;

      tokio::fs::write(&cfg.output_questions_file, generated.as_bytes()).await?;
      info!(path = %cfg.output_questions_file.display(), "generated questions saved");
      Ok(path_value(&cfg.output_questions_file))
    })
  }
}
