//! Tests for `Phase`.

use super::Phase;

#[test]
fn only_done_and_failed_are_terminal() {
  assert!(Phase::Done.is_terminal());
  assert!(Phase::Failed.is_terminal());
  for p in [
    Phase::Uninitialized,
    Phase::Configured,
    Phase::AwaitingInputs,
    Phase::Processing,
  ] {
    assert!(!p.is_terminal(), "{p} should not be terminal");
  }
}

#[test]
fn display_uses_snake_case() {
  assert_eq!(Phase::AwaitingInputs.to_string(), "awaiting_inputs");
  assert_eq!(Phase::Failed.to_string(), "failed");
}
