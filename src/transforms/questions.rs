//! Question extraction from generated outline text.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, instrument};

use crate::error::{OperatorError, Result};

static QUESTION_ENTRY: Lazy<Option<Regex>> =
  Lazy::new(|| Regex::new(r"(?i)-\s*Question\s*\d+:\s*(.+)").ok());

/// Questions from `- Question N: ...` entries, in order. Markdown bold markers are removed
/// first; empty questions are dropped.
pub fn extract_questions(text: &str) -> Vec<String> {
  let Some(re) = QUESTION_ENTRY.as_ref() else {
    return Vec::new();
  };
  let cleaned = text.replace("**", "");
  re.captures_iter(&cleaned)
    .filter_map(|caps| caps.get(1).map(|m| m.as_str().trim().to_string()))
    .filter(|q| !q.is_empty())
    .collect()
}

/// Reads `path` and extracts its questions.
#[instrument(level = "trace")]
pub fn extract_questions_from_file(path: &Path) -> Result<Vec<String>> {
  let text = std::fs::read_to_string(path).map_err(|e| {
    OperatorError::invalid_input(path.display().to_string(), format!("cannot read questions file: {e}"))
  })?;
  let questions = extract_questions(&text);
  info!(path = %path.display(), count = questions.len(), "questions extracted");
  Ok(questions)
}
