//! Records persisted by the query stage.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

/// One answered query in the results file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRecord {
  pub query: String,
  pub result: Value,
}

/// One query that exhausted its retries, as written to the errors file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryFailure {
  pub query: String,
  pub error: String,
}

/// Paths handed downstream by the query stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryOutputs {
  pub results_file: PathBuf,
  pub errors_file: PathBuf,
}
