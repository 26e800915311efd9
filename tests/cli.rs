//! Tests that run the `ragflow` binary.

use std::fs;
use std::process::Command;

fn ragflow(args: &[&str]) -> (String, String, bool) {
  let out = Command::new(env!("CARGO_BIN_EXE_ragflow"))
    .args(args)
    .env("RUST_LOG", "error")
    .env_remove("RAGFLOW_CONFIG_ROOT")
    .output()
    .expect("run ragflow");
  (
    String::from_utf8_lossy(&out.stdout).into_owned(),
    String::from_utf8_lossy(&out.stderr).into_owned(),
    out.status.success(),
  )
}

#[test]
fn extract_questions_prints_one_per_line() {
  let dir = tempfile::tempdir().unwrap();
  let file = dir.path().join("questions.txt");
  fs::write(
    &file,
    "## Theme\n- **Question 1:** What is X?\n- Question 2: How does Y work?\n",
  )
  .unwrap();

  let (stdout, stderr, success) = ragflow(&["extract-questions", file.to_str().unwrap()]);

  assert!(success, "stderr={stderr}");
  assert_eq!(stdout, "What is X?\nHow does Y work?\n");
}

#[test]
fn extract_questions_on_missing_file_fails() {
  let (_, stderr, success) = ragflow(&["extract-questions", "/definitely/missing.txt"]);
  assert!(!success);
  assert!(stderr.contains("Error"));
}

#[test]
fn run_without_configuration_exits_non_zero() {
  let dir = tempfile::tempdir().unwrap();
  let (stdout, _, success) = ragflow(&["run", "--config-root", dir.path().to_str().unwrap()]);
  assert!(!success);
  assert!(stdout.contains("data_prep: failed"), "stdout={stdout}");
}
