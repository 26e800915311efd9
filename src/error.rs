//! Error taxonomy shared by every operator.

use thiserror::Error;

use crate::bridge::BridgeError;

/// Result alias for operator and stage logic.
pub type Result<T> = std::result::Result<T, OperatorError>;

/// Everything that can go wrong while an operator handles its input.
///
/// All variants are terminal for the operator run except [OperatorError::InvalidInput]
/// on a join-barrier stage, where the barrier keeps waiting for a valid delivery.
#[derive(Debug, Error)]
pub enum OperatorError {
  /// Configuration file or section is unusable.
  #[error("configuration error: {0}")]
  Configuration(String),

  /// Required keys are absent from a configuration section.
  #[error("section '{section}' is missing required keys: {}", keys.join(", "))]
  MissingKeys { section: String, keys: Vec<String> },

  /// Client, tokenizer or engine construction failed.
  #[error("dependency initialization failed: {0}")]
  DependencyInit(String),

  /// An external call failed after all retry attempts.
  #[error("{operation} failed after {attempts} attempt(s): {message}")]
  ExternalCall {
    operation: String,
    attempts: u32,
    message: String,
  },

  /// Payload on an input channel failed its validity check.
  #[error("invalid input on '{input_id}': {reason}")]
  InvalidInput { input_id: String, reason: String },

  /// Result could not be persisted, even in degraded form.
  #[error("serialization error: {0}")]
  Serialization(String),

  #[error(transparent)]
  Bridge(#[from] BridgeError),

  /// The host refused the output.
  #[error("failed to send output '{output_id}': {message}")]
  Output { output_id: String, message: String },

  /// A stop request interrupted processing.
  #[error("stopped while {0}")]
  Stopped(String),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("yaml error: {0}")]
  Yaml(#[from] serde_yaml::Error),
}

impl OperatorError {
  pub fn configuration(message: impl Into<String>) -> Self {
    Self::Configuration(message.into())
  }

  pub fn dependency(message: impl Into<String>) -> Self {
    Self::DependencyInit(message.into())
  }

  pub fn invalid_input(input_id: impl Into<String>, reason: impl Into<String>) -> Self {
    Self::InvalidInput {
      input_id: input_id.into(),
      reason: reason.into(),
    }
  }

  pub fn external(operation: impl Into<String>, attempts: u32, message: impl Into<String>) -> Self {
    Self::ExternalCall {
      operation: operation.into(),
      attempts,
      message: message.into(),
    }
  }

  /// Whether a join barrier must give up on this error. Only invalid inputs are survivable.
  pub fn is_fatal_for_join(&self) -> bool {
    !matches!(self, Self::InvalidInput { .. })
  }
}
