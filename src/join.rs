//! Join barrier: gates a stage until every required input has arrived.
//!
//! The release condition is a pure set predicate over the received ids, so delivery
//! order never matters. Rejected offers are not recorded and the barrier keeps waiting.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{OperatorError, Result};

/// What happened to one offered input.
#[derive(Debug)]
pub enum Offer {
  /// This offer completed the required set. Returned at most once per barrier.
  Released,
  /// Recorded; still waiting on the listed ids.
  Waiting { missing: Vec<String> },
  /// The id was already recorded; the first valid payload is kept.
  Duplicate,
  /// Not recorded. Holds the validation error, or an invalid-input error for unknown ids.
  Rejected(OperatorError),
  /// The barrier has released; later offers are ignored.
  AlreadyReleased,
}

impl Offer {
  pub fn is_released(&self) -> bool {
    matches!(self, Offer::Released)
  }
}

/// Named-input barrier with a fixed required set.
#[derive(Debug, Clone)]
pub struct JoinBarrier {
  required: BTreeSet<String>,
  received: BTreeMap<String, Value>,
  released: bool,
}

impl JoinBarrier {
  pub fn new<I, S>(required_ids: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      required: required_ids.into_iter().map(Into::into).collect(),
      received: BTreeMap::new(),
      released: false,
    }
  }

  pub fn required_ids(&self) -> &BTreeSet<String> {
    &self.required
  }

  pub fn is_required(&self, input_id: &str) -> bool {
    self.required.contains(input_id)
  }

  pub fn is_released(&self) -> bool {
    self.released
  }

  /// Required ids not yet received, in sorted order.
  pub fn missing(&self) -> Vec<String> {
    self
      .required
      .iter()
      .filter(|id| !self.received.contains_key(*id))
      .cloned()
      .collect()
  }

  pub fn received(&self) -> &BTreeMap<String, Value> {
    &self.received
  }

  /// Offers `payload` on `input_id`, recording it only if the id is required and
  /// `validate` accepts the payload.
  pub fn offer<F>(&mut self, input_id: &str, payload: Value, validate: F) -> Offer
  where
    F: FnOnce(&Value) -> Result<()>,
  {
    if self.released {
      debug!(input_id = %input_id, "join barrier already released, ignoring offer");
      return Offer::AlreadyReleased;
    }
    if !self.is_required(input_id) {
      warn!(input_id = %input_id, "offer on an input the join barrier does not require");
      return Offer::Rejected(OperatorError::invalid_input(
        input_id,
        "not a required input of this join",
      ));
    }
    if self.received.contains_key(input_id) {
      debug!(input_id = %input_id, "input already received, keeping the first payload");
      return Offer::Duplicate;
    }
    if let Err(e) = validate(&payload) {
      warn!(input_id = %input_id, payload = %payload, error = %e, "rejected join input, still waiting");
      return Offer::Rejected(e);
    }

    self.received.insert(input_id.to_string(), payload);
    let missing = self.missing();
    if missing.is_empty() {
      self.released = true;
      info!(inputs = ?self.received.keys().collect::<Vec<_>>(), "join barrier released");
      Offer::Released
    } else {
      debug!(input_id = %input_id, missing = ?missing, "join input recorded");
      Offer::Waiting { missing }
    }
  }
}
