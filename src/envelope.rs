//! Output envelope: the wire contract between stages.
//!
//! Every internal edge carries `{"agent_name", "agent_result", "dataflow_status"}`.
//! [unwrap] also accepts values that are not envelopes and hands them back as-is, so
//! the first stage can be fed a bare trigger value.

use serde::{Deserialize, Serialize};
use serde_json::Value;

const RESULT_KEY: &str = "agent_result";

/// Result of one stage, wrapped for the next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputEnvelope {
  /// Stage that produced the result.
  #[serde(rename = "agent_name")]
  pub producer_name: String,
  /// Path, string, or structured record.
  #[serde(rename = "agent_result")]
  pub result: Value,
  /// True only for the stage that terminates the pipeline run.
  #[serde(rename = "dataflow_status")]
  pub is_final: bool,
}

impl OutputEnvelope {
  /// Envelope as the JSON value sent on the wire.
  pub fn to_value(&self) -> Value {
    serde_json::json!({
      "agent_name": self.producer_name,
      "agent_result": self.result,
      "dataflow_status": self.is_final,
    })
  }
}

/// Wraps `result` for the next stage.
pub fn wrap(producer_name: impl Into<String>, result: Value, is_final: bool) -> OutputEnvelope {
  OutputEnvelope {
    producer_name: producer_name.into(),
    result,
    is_final,
  }
}

/// True if `value` has the envelope shape (an object carrying `agent_result`).
pub fn is_envelope(value: &Value) -> bool {
  value.as_object().is_some_and(|o| o.contains_key(RESULT_KEY))
}

/// Extracts the result from an envelope, or returns `value` unchanged if it is not one.
pub fn unwrap(value: Value) -> Value {
  match value {
    Value::Object(mut map) if map.contains_key(RESULT_KEY) => {
      map.remove(RESULT_KEY).unwrap_or(Value::Null)
    }
    other => other,
  }
}
