//! Events delivered by the host runtime to an operator.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque pass-through token attached to an input. Operators forward it unchanged
/// with every output they emit in response to that input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(pub Value);

impl Metadata {
  pub fn new(value: Value) -> Self {
    Self(value)
  }

  pub fn empty() -> Self {
    Self(Value::Null)
  }
}

/// One input delivered on a named upstream channel.
#[derive(Debug, Clone, PartialEq)]
pub struct InputEvent {
  /// Logical upstream channel (e.g. `unique_contexts_dir`).
  pub id: String,
  /// Raw value as received; usually an envelope, sometimes a bare trigger value.
  pub value: Value,
  pub metadata: Metadata,
}

/// Event delivered to [crate::operator::Operator::on_event].
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
  Input(InputEvent),
  Stop,
  Error(String),
}

impl Event {
  pub fn input(id: impl Into<String>, value: Value) -> Self {
    Event::Input(InputEvent {
      id: id.into(),
      value,
      metadata: Metadata::empty(),
    })
  }

  pub fn input_with_metadata(id: impl Into<String>, value: Value, metadata: Metadata) -> Self {
    Event::Input(InputEvent {
      id: id.into(),
      value,
      metadata,
    })
  }

  /// Short kind label used in logs.
  pub fn kind(&self) -> &'static str {
    match self {
      Event::Input(_) => "INPUT",
      Event::Stop => "STOP",
      Event::Error(_) => "ERROR",
    }
  }
}
