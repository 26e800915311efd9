//! Tokenizers used to summarize contexts.

use std::path::Path;

use tokenizers::Tokenizer;

use super::ServiceError;

/// Splits text into tokens and joins tokens back into text.
pub trait TextTokenizer: Send + Sync {
  fn tokenize(&self, text: &str) -> Result<Vec<String>, ServiceError>;

  fn detokenize(&self, tokens: &[String]) -> Result<String, ServiceError>;
}

/// Tokenizer loaded from a Hugging Face `tokenizer.json`.
pub struct HfTokenizer {
  inner: Tokenizer,
}

impl HfTokenizer {
  pub fn from_file(path: &Path) -> Result<Self, ServiceError> {
    let inner = Tokenizer::from_file(path)
      .map_err(|e| ServiceError::Tokenizer(format!("{}: {e}", path.display())))?;
    Ok(Self { inner })
  }
}

impl TextTokenizer for HfTokenizer {
  fn tokenize(&self, text: &str) -> Result<Vec<String>, ServiceError> {
    let encoding = self
      .inner
      .encode(text, false)
      .map_err(|e| ServiceError::Tokenizer(e.to_string()))?;
    Ok(encoding.get_tokens().to_vec())
  }

  fn detokenize(&self, tokens: &[String]) -> Result<String, ServiceError> {
    let ids = tokens
      .iter()
      .map(|t| {
        self
          .inner
          .token_to_id(t)
          .ok_or_else(|| ServiceError::Tokenizer(format!("token '{t}' not in vocabulary")))
      })
      .collect::<Result<Vec<u32>, _>>()?;
    self
      .inner
      .decode(&ids, false)
      .map_err(|e| ServiceError::Tokenizer(e.to_string()))
  }
}

/// Word-level tokenizer. Each token is a word plus the whitespace that follows it, so
/// detokenizing is plain concatenation.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceTokenizer;

impl TextTokenizer for WhitespaceTokenizer {
  fn tokenize(&self, text: &str) -> Result<Vec<String>, ServiceError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut has_word = false;
    let mut trailing = false;
    for c in text.chars() {
      if c.is_whitespace() {
        trailing = has_word;
        current.push(c);
      } else {
        if trailing {
          tokens.push(std::mem::take(&mut current));
          trailing = false;
        }
        has_word = true;
        current.push(c);
      }
    }
    if !current.is_empty() {
      tokens.push(current);
    }
    Ok(tokens)
  }

  fn detokenize(&self, tokens: &[String]) -> Result<String, ServiceError> {
    Ok(tokens.concat())
  }
}
