//! Persistence of query results and failures.

use std::fs;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::error::{OperatorError, Result};
use crate::types::{QueryFailure, QueryRecord};

/// How the results file ended up on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistOutcome {
  /// Results were written with every `result` stringified.
  pub results_degraded: bool,
}

/// Writes the results and errors arrays as pretty JSON.
///
/// If the results cannot be serialized as-is, a copy with stringified `result` fields is
/// written instead; only if that also fails is a serialization error returned.
pub fn persist_query_outputs(
  results: &[QueryRecord],
  errors: &[QueryFailure],
  results_file: &Path,
  errors_file: &Path,
) -> Result<PersistOutcome> {
  info!(count = results.len(), path = %results_file.display(), "saving query results");
  let results_degraded = write_json_with_fallback(results_file, results, || stringified(results))?;

  info!(count = errors.len(), path = %errors_file.display(), "saving query errors");
  write_json_with_fallback(errors_file, errors, || stringified_failures(errors))?;

  Ok(PersistOutcome { results_degraded })
}

fn stringified(results: &[QueryRecord]) -> Value {
  Value::Array(
    results
      .iter()
      .map(|r| {
        let result = match &r.result {
          Value::String(s) => s.clone(),
          other => other.to_string(),
        };
        serde_json::json!({ "query": r.query, "result": result })
      })
      .collect(),
  )
}

fn stringified_failures(errors: &[QueryFailure]) -> Value {
  Value::Array(
    errors
      .iter()
      .map(|e| serde_json::json!({ "query": e.query, "error": e.error }))
      .collect(),
  )
}

/// Returns whether the degraded form was written.
pub(crate) fn write_json_with_fallback<T, F>(path: &Path, value: &T, degraded: F) -> Result<bool>
where
  T: Serialize + ?Sized,
  F: FnOnce() -> Value,
{
  match serde_json::to_string_pretty(value) {
    Ok(json) => {
      fs::write(path, json)?;
      Ok(false)
    }
    Err(e) => {
      error!(path = %path.display(), error = %e, "serialization failed, writing stringified fallback");
      let json = serde_json::to_string_pretty(&degraded()).map_err(|e2| {
        error!(path = %path.display(), error = %e2, "fallback serialization failed");
        OperatorError::Serialization(format!("{}: {e2}", path.display()))
      })?;
      fs::write(path, json).map_err(|io| {
        OperatorError::Serialization(format!("{}: {io}", path.display()))
      })?;
      warn!(path = %path.display(), "saved with string conversion fallback");
      Ok(true)
    }
  }
}
