//! Lifecycle phase of an operator.

use std::fmt;

/// Lifecycle phase of an operator instance.
///
/// `Uninitialized → Configured → AwaitingInputs → Processing → Done | Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
  Uninitialized,
  Configured,
  AwaitingInputs,
  Processing,
  Done,
  Failed,
}

impl Phase {
  /// True for `Done` and `Failed`; once terminal, inputs are acknowledged as no-ops.
  pub fn is_terminal(self) -> bool {
    matches!(self, Phase::Done | Phase::Failed)
  }
}

impl fmt::Display for Phase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Phase::Uninitialized => write!(f, "uninitialized"),
      Phase::Configured => write!(f, "configured"),
      Phase::AwaitingInputs => write!(f, "awaiting_inputs"),
      Phase::Processing => write!(f, "processing"),
      Phase::Done => write!(f, "done"),
      Phase::Failed => write!(f, "failed"),
    }
  }
}
