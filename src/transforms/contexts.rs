//! Unique-context extraction from JSON-lines dataset files.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{OperatorError, Result};

const CONTEXTS_SUFFIX: &str = "_unique_contexts.json";

/// Outcome for one `.jsonl` input file.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextFileReport {
  pub source: PathBuf,
  /// Written file, or `None` when the source yielded no contexts or could not be read.
  pub output: Option<PathBuf>,
  pub unique_contexts: usize,
  /// The source could not be read or the output could not be written.
  pub failed: bool,
}

impl ContextFileReport {
  fn new(source: &Path) -> Self {
    Self {
      source: source.to_path_buf(),
      output: None,
      unique_contexts: 0,
      failed: false,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExtractionReport {
  pub files: Vec<ContextFileReport>,
  /// False if any file could not be read or its output could not be written.
  pub all_succeeded: bool,
}

impl ExtractionReport {
  pub fn outputs(&self) -> impl Iterator<Item = &Path> {
    self.files.iter().filter_map(|f| f.output.as_deref())
  }
}

/// Replaces every character that is not alphanumeric, `_` or `-` with `_`.
pub fn safe_name(stem: &str) -> String {
  stem
    .chars()
    .map(|c| {
      if c.is_alphanumeric() || c == '_' || c == '-' {
        c
      } else {
        '_'
      }
    })
    .collect()
}

/// Output file name for the dataset file with stem `stem`.
pub fn contexts_file_name(stem: &str) -> String {
  format!("{}{CONTEXTS_SUFFIX}", safe_name(stem))
}

/// Collects distinct `context` strings from every `*.jsonl` file in `input_dir`, in
/// first-seen order, writing one pretty JSON array per file into `output_dir`.
///
/// Bad lines are logged and skipped. Only failing to create `output_dir` is an error.
#[instrument(level = "trace")]
pub fn extract_unique_contexts(input_dir: &Path, output_dir: &Path) -> Result<ExtractionReport> {
  fs::create_dir_all(output_dir)?;

  let mut inputs: Vec<PathBuf> = fs::read_dir(input_dir)?
    .filter_map(|entry| entry.ok().map(|e| e.path()))
    .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "jsonl"))
    .collect();
  inputs.sort();
  info!(dir = %input_dir.display(), files = inputs.len(), "found JSONL files");
  if inputs.is_empty() {
    warn!(dir = %input_dir.display(), "no JSONL files to extract contexts from");
  }

  let files: Vec<ContextFileReport> = inputs.iter().map(|src| extract_file(src, output_dir)).collect();
  let all_succeeded = files.iter().all(|f| !f.failed);
  Ok(ExtractionReport {
    files,
    all_succeeded,
  })
}

fn extract_file(source: &Path, output_dir: &Path) -> ContextFileReport {
  let mut report = ContextFileReport::new(source);
  let name = source.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
  let text = match fs::read_to_string(source) {
    Ok(t) => t,
    Err(e) => {
      error!(path = %source.display(), error = %e, "cannot read dataset file");
      report.failed = true;
      return report;
    }
  };

  let mut seen = HashSet::new();
  let mut contexts = Vec::new();
  for (idx, line) in text.lines().enumerate() {
    let line_number = idx + 1;
    let line = line.trim();
    if line.is_empty() {
      continue;
    }
    let obj: Value = match serde_json::from_str(line) {
      Ok(v) => v,
      Err(e) => {
        error!(file = %name, line = line_number, error = %e, "JSON decoding error");
        continue;
      }
    };
    match obj.get("context") {
      Some(Value::String(ctx)) => {
        if !ctx.is_empty() && seen.insert(ctx.clone()) {
          contexts.push(ctx.clone());
        }
      }
      None | Some(Value::Null) => debug!(file = %name, line = line_number, "line has null context"),
      Some(other) => {
        warn!(file = %name, line = line_number, value = %other, "non-string context, skipping")
      }
    }
  }
  info!(file = %name, unique = contexts.len(), "unique contexts collected");

  if contexts.is_empty() {
    warn!(file = %name, "no unique contexts, skipping output file");
    return report;
  }
  report.unique_contexts = contexts.len();

  let stem = source.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
  let output = output_dir.join(contexts_file_name(&stem));
  let written = serde_json::to_string_pretty(&contexts)
    .map_err(OperatorError::from)
    .and_then(|json| fs::write(&output, json).map_err(OperatorError::from));
  match written {
    Ok(()) => {
      info!(path = %output.display(), "unique contexts saved");
      report.output = Some(output);
    }
    Err(e) => {
      error!(path = %output.display(), error = %e, "failed to save unique contexts");
      report.failed = true;
    }
  }
  report
}

/// Reads a contexts file: a JSON array of strings.
pub fn read_contexts(path: &Path) -> Result<Vec<String>> {
  let bad = |reason: String| OperatorError::invalid_input(path.display().to_string(), reason);
  let text = fs::read_to_string(path).map_err(|e| bad(format!("cannot read contexts file: {e}")))?;
  let value: Value = serde_json::from_str(&text).map_err(|e| bad(format!("invalid JSON: {e}")))?;
  let Value::Array(items) = value else {
    return Err(bad("expected a JSON array of contexts".to_string()));
  };
  items
    .into_iter()
    .map(|item| match item {
      Value::String(s) => Ok(s),
      other => Err(bad(format!("context entry is not a string: {other}"))),
    })
    .collect()
}
