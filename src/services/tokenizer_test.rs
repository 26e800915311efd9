//! Tests for the tokenizers.

use super::{HfTokenizer, ServiceError, TextTokenizer, WhitespaceTokenizer};

#[test]
fn whitespace_tokens_concatenate_back_to_input() {
  let text = "  The quick\tbrown  fox\njumps ";
  let tokens = WhitespaceTokenizer.tokenize(text).unwrap();
  assert_eq!(tokens, vec!["  The ", "quick\t", "brown  ", "fox\n", "jumps "]);
  assert_eq!(WhitespaceTokenizer.detokenize(&tokens).unwrap(), text);
}

#[test]
fn whitespace_tokenizer_counts_words() {
  let tokens = WhitespaceTokenizer.tokenize("one two three").unwrap();
  assert_eq!(tokens.len(), 3);
  assert!(WhitespaceTokenizer.tokenize("").unwrap().is_empty());
}

#[test]
fn missing_tokenizer_file_is_an_error() {
  let dir = tempfile::tempdir().unwrap();
  let r = HfTokenizer::from_file(&dir.path().join("tokenizer.json"));
  assert!(matches!(r, Err(ServiceError::Tokenizer(_))));
}
