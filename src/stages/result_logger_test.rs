//! Tests for the result logging sink.

use std::fs;
use std::sync::Arc;

use serde_json::json;

use super::ResultLoggerStage;
use super::channels;
use super::result_logger::missing_result_files;
use super::test_support::Recorder;
use crate::config_store::HostConfigStore;
use crate::envelope::wrap;
use crate::operator::Operator;
use crate::types::{Event, OperatorStatus, Phase};

#[test]
fn logs_final_envelope_without_emitting() {
  let root = tempfile::tempdir().unwrap();
  let store = Arc::new(HostConfigStore::new(root.path()));
  let mut op = Operator::new(ResultLoggerStage::new(), store).unwrap();
  let mut out = Recorder::default();
  let payload = json!({"results_file": "/tmp/r.json", "errors_file": "/tmp/e.json"});

  let status = op.on_event(
    Event::input(channels::QUERY_RESULTS, wrap("rag_query_evaluator", payload, true).to_value()),
    &mut out,
  );

  assert_eq!(status, OperatorStatus::Stop);
  assert_eq!(op.phase(), Phase::Done);
  assert!(out.sent.is_empty());
}

#[test]
fn reports_missing_result_files() {
  let dir = tempfile::tempdir().unwrap();
  let results = dir.path().join("results.json");
  fs::write(&results, "[]").unwrap();
  let payload = json!({
    "results_file": results.to_string_lossy(),
    "errors_file": dir.path().join("errors.json").to_string_lossy(),
  });

  assert_eq!(missing_result_files(&payload), vec!["errors_file"]);
  assert_eq!(
    missing_result_files(&json!({})),
    vec!["results_file", "errors_file"]
  );
  assert!(missing_result_files(&json!("plain text")).is_empty());
}
