//! Wildcard file-name patterns (`*` and `?`).

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::error::{OperatorError, Result};

/// A compiled file-name pattern. `*` matches any run of characters, `?` exactly one;
/// everything else is literal.
#[derive(Debug, Clone)]
pub struct FilePattern {
  source: String,
  regex: Regex,
}

impl FilePattern {
  pub fn new(pattern: &str) -> Result<Self> {
    let mut expr = String::with_capacity(pattern.len() + 8);
    expr.push('^');
    for c in pattern.chars() {
      match c {
        '*' => expr.push_str(".*"),
        '?' => expr.push('.'),
        other => expr.push_str(&regex::escape(other.encode_utf8(&mut [0u8; 4]))),
      }
    }
    expr.push('$');
    let regex = Regex::new(&expr).map_err(|e| {
      OperatorError::configuration(format!("invalid file pattern '{pattern}': {e}"))
    })?;
    Ok(Self {
      source: pattern.to_string(),
      regex,
    })
  }

  pub fn as_str(&self) -> &str {
    &self.source
  }

  pub fn matches(&self, file_name: &str) -> bool {
    self.regex.is_match(file_name)
  }
}

/// Regular files in `dir` whose names match `pattern`, sorted by path.
pub fn matching_files(dir: &Path, pattern: &FilePattern) -> Result<Vec<PathBuf>> {
  let mut files: Vec<PathBuf> = fs::read_dir(dir)?
    .filter_map(|entry| entry.ok())
    .filter(|entry| entry.file_name().to_str().is_some_and(|n| pattern.matches(n)))
    .map(|entry| entry.path())
    .filter(|path| path.is_file())
    .collect();
  files.sort();
  Ok(files)
}
