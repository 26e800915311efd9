//! Tests for unique-context extraction.

use std::fs;

use crate::error::OperatorError;

use super::{contexts_file_name, extract_unique_contexts, read_contexts, safe_name};

#[test]
fn safe_name_replaces_punctuation() {
  assert_eq!(safe_name("agri culture.v2"), "agri_culture_v2");
  assert_eq!(safe_name("cs-papers_2024"), "cs-papers_2024");
  assert_eq!(contexts_file_name("mix"), "mix_unique_contexts.json");
}

#[test]
fn extracts_distinct_contexts_in_first_seen_order() {
  let input = tempfile::tempdir().unwrap();
  let output = tempfile::tempdir().unwrap();
  fs::write(
    input.path().join("agriculture.jsonl"),
    concat!(
      "{\"context\": \"soil\"}\n",
      "\n",
      "not json\n",
      "{\"context\": \"water\"}\n",
      "{\"context\": \"soil\"}\n",
      "{\"context\": null}\n",
      "{\"context\": 42}\n",
      "{\"context\": \"\"}\n",
      "{\"other\": \"x\"}\n",
    ),
  )
  .unwrap();
  fs::write(input.path().join("notes.txt"), "{\"context\": \"ignored\"}\n").unwrap();

  let report = extract_unique_contexts(input.path(), output.path()).unwrap();

  assert!(report.all_succeeded);
  assert_eq!(report.files.len(), 1);
  assert_eq!(report.files[0].unique_contexts, 2);
  let written = output.path().join("agriculture_unique_contexts.json");
  assert_eq!(report.outputs().collect::<Vec<_>>(), vec![written.as_path()]);
  let contexts: Vec<String> = serde_json::from_str(&fs::read_to_string(&written).unwrap()).unwrap();
  assert_eq!(contexts, vec!["soil", "water"]);
}

#[test]
fn file_without_contexts_writes_nothing() {
  let input = tempfile::tempdir().unwrap();
  let output = tempfile::tempdir().unwrap();
  fs::write(input.path().join("empty.jsonl"), "{\"context\": null}\n").unwrap();

  let report = extract_unique_contexts(input.path(), output.path()).unwrap();
  assert!(report.all_succeeded);
  assert!(report.files[0].output.is_none());
  assert_eq!(fs::read_dir(output.path()).unwrap().count(), 0);
}

#[test]
fn creates_output_dir_and_tolerates_no_inputs() {
  let input = tempfile::tempdir().unwrap();
  let root = tempfile::tempdir().unwrap();
  let output = root.path().join("nested/out");
  let report = extract_unique_contexts(input.path(), &output).unwrap();
  assert!(report.files.is_empty());
  assert!(output.is_dir());
}

#[test]
fn read_contexts_requires_array_of_strings() {
  let dir = tempfile::tempdir().unwrap();
  let good = dir.path().join("good.json");
  fs::write(&good, "[\"a\", \"b\"]").unwrap();
  assert_eq!(read_contexts(&good).unwrap(), vec!["a", "b"]);

  let obj = dir.path().join("obj.json");
  fs::write(&obj, "{\"a\": 1}").unwrap();
  assert!(matches!(read_contexts(&obj), Err(OperatorError::InvalidInput { .. })));

  let mixed = dir.path().join("mixed.json");
  fs::write(&mixed, "[\"a\", 3]").unwrap();
  assert!(read_contexts(&mixed).is_err());

  assert!(read_contexts(&dir.path().join("absent.json")).is_err());
}
