//! Status an operator reports back to the host after each event.

use std::fmt;

/// Status returned to the host runtime after handling one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorStatus {
  /// Keep delivering events to this operator.
  Continue,
  /// The operator is finished; the host should release its slot.
  Stop,
}

impl fmt::Display for OperatorStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      OperatorStatus::Continue => write!(f, "continue"),
      OperatorStatus::Stop => write!(f, "stop"),
    }
  }
}
