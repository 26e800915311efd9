//! Per-stage YAML configuration.
//!
//! Each stage reads one file from the selected [ConfigStore], requires its top-level
//! section, reports every missing key at once, then deserializes the section into a
//! typed struct. Relative paths are resolved against the store's base directory.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_yaml::{Mapping, Value};
use tracing::{debug, info, instrument};

use crate::config_store::ConfigStore;
use crate::error::{OperatorError, Result};
use crate::retry::RetryPolicy;
use crate::services::QueryMode;

/// Tokenizer name that selects the whitespace tokenizer instead of a tokenizer file.
pub const WHITESPACE_TOKENIZER: &str = "whitespace";

/// A typed configuration section.
pub trait StageConfig: DeserializeOwned {
  /// File name under `configs/`.
  const FILE: &'static str;
  /// Required top-level section.
  const SECTION: &'static str;
  const REQUIRED_KEYS: &'static [&'static str];

  /// Resolves relative paths and prepares output locations.
  fn finish(self, store: &dyn ConfigStore) -> Result<Self>;
}

/// Loads and validates `C` from `store`.
#[instrument(level = "trace", skip(store), fields(section = C::SECTION))]
pub fn load<C: StageConfig>(store: &dyn ConfigStore) -> Result<C> {
  let path = store.config_path(C::FILE);
  info!(path = %path.display(), section = C::SECTION, "loading configuration");
  let section = load_section(&path, C::SECTION, C::REQUIRED_KEYS)?;
  let config: C = serde_yaml::from_value(Value::Mapping(section)).map_err(|e| {
    OperatorError::configuration(format!("{} in {}: {e}", C::SECTION, path.display()))
  })?;
  config.finish(store)
}

/// Reads `path` and returns the `section` mapping after checking `required` keys.
///
/// A key whose value is null counts as missing.
pub fn load_section(path: &Path, section: &str, required: &[&str]) -> Result<Mapping> {
  let text = fs::read_to_string(path).map_err(|e| {
    OperatorError::configuration(format!("cannot read {}: {e}", path.display()))
  })?;
  let doc: Value = serde_yaml::from_str(&text)
    .map_err(|e| OperatorError::configuration(format!("invalid YAML in {}: {e}", path.display())))?;

  let mapping = match doc.get(section) {
    Some(Value::Mapping(m)) => m.clone(),
    Some(_) => {
      return Err(OperatorError::configuration(format!(
        "section '{section}' in {} is not a mapping",
        path.display()
      )));
    }
    None => {
      return Err(OperatorError::configuration(format!(
        "section '{section}' not found in {}",
        path.display()
      )));
    }
  };

  let missing = missing_keys(&mapping, required);
  if !missing.is_empty() {
    return Err(OperatorError::MissingKeys {
      section: section.to_string(),
      keys: missing,
    });
  }
  debug!(section = %section, keys = mapping.len(), "configuration section loaded");
  Ok(mapping)
}

/// Required keys absent from `mapping` (or present with a null value), in `required` order.
pub fn missing_keys(mapping: &Mapping, required: &[&str]) -> Vec<String> {
  required
    .iter()
    .filter(|key| matches!(mapping.get(**key), None | Some(Value::Null)))
    .map(|key| key.to_string())
    .collect()
}

fn ensure_dir(dir: &Path) -> Result<()> {
  fs::create_dir_all(dir).map_err(|e| {
    OperatorError::configuration(format!("cannot create directory {}: {e}", dir.display()))
  })
}

fn ensure_parent(file: &Path) -> Result<()> {
  match file.parent() {
    Some(parent) if !parent.as_os_str().is_empty() => ensure_dir(parent),
    _ => Ok(()),
  }
}

fn default_attempts() -> u32 {
  3
}

fn default_delay() -> u64 {
  5
}

fn default_insert_delay() -> u64 {
  10
}

fn default_query_attempts() -> u32 {
  1
}

fn default_hub_endpoint() -> String {
  "https://huggingface.co".to_string()
}

/// `DATA_PREP` section of `data_prep_config.yml`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct DataPrepConfig {
  pub dataset_repo_id: String,
  pub download_dir: PathBuf,
  pub output_dir: PathBuf,
  #[serde(default)]
  pub skip_download: bool,
  #[serde(default = "default_hub_endpoint")]
  pub hub_endpoint: String,
  #[serde(default)]
  pub hub_token: Option<String>,
  #[serde(default = "default_attempts")]
  pub download_max_retries: u32,
  #[serde(default = "default_delay")]
  pub download_retry_delay: u64,
}

impl DataPrepConfig {
  pub fn download_policy(&self) -> RetryPolicy {
    RetryPolicy::from_secs(self.download_max_retries, self.download_retry_delay)
  }
}

impl StageConfig for DataPrepConfig {
  const FILE: &'static str = "data_prep_config.yml";
  const SECTION: &'static str = "DATA_PREP";
  const REQUIRED_KEYS: &'static [&'static str] = &["DATASET_REPO_ID", "DOWNLOAD_DIR", "OUTPUT_DIR"];

  fn finish(mut self, store: &dyn ConfigStore) -> Result<Self> {
    self.download_dir = store.resolve(&self.download_dir);
    self.output_dir = store.resolve(&self.output_dir);
    info!(
      download_dir = %self.download_dir.display(),
      output_dir = %self.output_dir.display(),
      "resolved data prep paths"
    );
    Ok(self)
  }
}

/// `QUESTION_GEN` section of `question_gen_config.yml`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct QuestionGenConfig {
  pub input_contexts_filename: String,
  pub summary_total_tokens: usize,
  pub output_questions_file: PathBuf,
  pub llm_api_key: String,
  pub llm_base_url: String,
  pub llm_model_name: String,
  /// `whitespace`, or a path to a `tokenizer.json`.
  pub tokenizer_model: String,
  #[serde(default = "default_attempts")]
  pub llm_max_retries: u32,
  #[serde(default = "default_delay")]
  pub llm_retry_delay: u64,
}

impl QuestionGenConfig {
  pub fn llm_policy(&self) -> RetryPolicy {
    RetryPolicy::from_secs(self.llm_max_retries, self.llm_retry_delay)
  }

  pub fn uses_whitespace_tokenizer(&self) -> bool {
    self.tokenizer_model.eq_ignore_ascii_case(WHITESPACE_TOKENIZER)
  }
}

impl StageConfig for QuestionGenConfig {
  const FILE: &'static str = "question_gen_config.yml";
  const SECTION: &'static str = "QUESTION_GEN";
  const REQUIRED_KEYS: &'static [&'static str] = &[
    "INPUT_CONTEXTS_FILENAME",
    "SUMMARY_TOTAL_TOKENS",
    "OUTPUT_QUESTIONS_FILE",
    "LLM_API_KEY",
    "LLM_BASE_URL",
    "LLM_MODEL_NAME",
    "TOKENIZER_MODEL",
  ];

  fn finish(mut self, store: &dyn ConfigStore) -> Result<Self> {
    self.output_questions_file = store.resolve(&self.output_questions_file);
    ensure_parent(&self.output_questions_file)?;
    if !self.uses_whitespace_tokenizer() {
      self.tokenizer_model = store
        .resolve(Path::new(&self.tokenizer_model))
        .to_string_lossy()
        .into_owned();
    }
    info!(output = %self.output_questions_file.display(), "resolved question output file");
    Ok(self)
  }
}

/// `RAG_INDEX` section of `rag_index_config.yml`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct RagIndexConfig {
  pub working_dir: PathBuf,
  pub engine_url: String,
  pub input_contexts_filename_pattern: String,
  #[serde(default)]
  pub engine_api_key: Option<String>,
  #[serde(default = "default_attempts")]
  pub insert_max_retries: u32,
  #[serde(default = "default_insert_delay")]
  pub insert_retry_delay: u64,
}

impl RagIndexConfig {
  pub fn insert_policy(&self) -> RetryPolicy {
    RetryPolicy::from_secs(self.insert_max_retries, self.insert_retry_delay)
  }
}

impl StageConfig for RagIndexConfig {
  const FILE: &'static str = "rag_index_config.yml";
  const SECTION: &'static str = "RAG_INDEX";
  const REQUIRED_KEYS: &'static [&'static str] =
    &["WORKING_DIR", "ENGINE_URL", "INPUT_CONTEXTS_FILENAME_PATTERN"];

  fn finish(mut self, store: &dyn ConfigStore) -> Result<Self> {
    self.working_dir = store.resolve(&self.working_dir);
    ensure_dir(&self.working_dir)?;
    info!(working_dir = %self.working_dir.display(), "resolved index working directory");
    Ok(self)
  }
}

/// `RAG_QUERY` section of `rag_query_config.yml`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct RagQueryConfig {
  pub query_mode: QueryMode,
  pub output_results_file: PathBuf,
  pub output_errors_file: PathBuf,
  pub engine_url: String,
  #[serde(default)]
  pub engine_api_key: Option<String>,
  #[serde(default = "default_query_attempts")]
  pub query_max_retries: u32,
  #[serde(default = "default_delay")]
  pub query_retry_delay: u64,
}

impl RagQueryConfig {
  pub fn query_policy(&self) -> RetryPolicy {
    RetryPolicy::from_secs(self.query_max_retries, self.query_retry_delay)
  }
}

impl StageConfig for RagQueryConfig {
  const FILE: &'static str = "rag_query_config.yml";
  const SECTION: &'static str = "RAG_QUERY";
  const REQUIRED_KEYS: &'static [&'static str] = &[
    "QUERY_MODE",
    "OUTPUT_RESULTS_FILE",
    "OUTPUT_ERRORS_FILE",
    "ENGINE_URL",
  ];

  fn finish(mut self, store: &dyn ConfigStore) -> Result<Self> {
    self.output_results_file = store.resolve(&self.output_results_file);
    self.output_errors_file = store.resolve(&self.output_errors_file);
    ensure_parent(&self.output_results_file)?;
    ensure_parent(&self.output_errors_file)?;
    info!(
      results = %self.output_results_file.display(),
      errors = %self.output_errors_file.display(),
      "resolved query output files"
    );
    Ok(self)
  }
}
