//! Concrete pipeline stages.
//!
//! Each stage plugs services and transforms into the [crate::operator::Stage] contract.
//! Services can be injected for tests; otherwise they are built from configuration
//! when dependencies are initialized.

mod data_prep;
mod question_gen;
mod rag_index;
mod rag_query;
mod result_logger;
#[cfg(test)]
mod result_logger_test;
#[cfg(test)]
pub(crate) mod test_support;

use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::error::{OperatorError, Result};
use crate::operator::payload_path;

pub use data_prep::{DataPrepDeps, DataPrepStage};
pub use question_gen::{QuestionGenDeps, QuestionGenStage};
pub use rag_index::{INDEX_MANIFEST_FILE, IndexManifest, ManifestEntry, RagIndexStage};
pub use rag_query::RagQueryStage;
pub use result_logger::ResultLoggerStage;

/// Channel ids on the pipeline's internal edges.
pub mod channels {
  pub const UNIQUE_CONTEXTS_DIR: &str = "unique_contexts_dir";
  pub const GENERATED_QUESTIONS_FILE: &str = "generated_questions_file";
  pub const RAG_INDEX_DIR: &str = "rag_index_dir";
  pub const QUERY_RESULTS: &str = "query_results";
}

/// Accepts a payload naming an existing directory.
pub(crate) fn require_dir(input_id: &str, payload: &Value) -> Result<()> {
  let path = payload_path(input_id, payload)?;
  if path.is_dir() {
    Ok(())
  } else {
    Err(OperatorError::invalid_input(
      input_id,
      format!("'{}' is not an existing directory", path.display()),
    ))
  }
}

/// Accepts a payload naming an existing regular file.
pub(crate) fn require_file(input_id: &str, payload: &Value) -> Result<()> {
  let path = payload_path(input_id, payload)?;
  if path.is_file() {
    Ok(())
  } else {
    Err(OperatorError::invalid_input(
      input_id,
      format!("'{}' is not an existing file", path.display()),
    ))
  }
}

pub(crate) fn dir_has_entries(dir: &Path) -> bool {
  fs::read_dir(dir).is_ok_and(|mut entries| entries.next().is_some())
}

pub(crate) fn path_value(path: &Path) -> Value {
  Value::String(path.to_string_lossy().into_owned())
}
