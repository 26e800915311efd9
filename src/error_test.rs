//! Tests for `OperatorError`.

use crate::error::OperatorError;

#[test]
fn missing_keys_lists_every_key() {
  let e = OperatorError::MissingKeys {
    section: "QUESTION_GEN".to_string(),
    keys: vec!["LLM_API_KEY".to_string(), "TOKENIZER_MODEL".to_string()],
  };
  assert_eq!(
    e.to_string(),
    "section 'QUESTION_GEN' is missing required keys: LLM_API_KEY, TOKENIZER_MODEL"
  );
}

#[test]
fn external_call_message_carries_attempts() {
  let e = OperatorError::external("llm completion", 3, "HTTP 500");
  assert_eq!(e.to_string(), "llm completion failed after 3 attempt(s): HTTP 500");
}

#[test]
fn only_invalid_input_keeps_a_join_waiting() {
  assert!(!OperatorError::invalid_input("rag_index_dir", "not a directory").is_fatal_for_join());
  assert!(OperatorError::configuration("bad").is_fatal_for_join());
  assert!(OperatorError::dependency("no client").is_fatal_for_join());
  assert!(OperatorError::Serialization("x".into()).is_fatal_for_join());
}
