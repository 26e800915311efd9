//! Operator execution contract: one event callback, one unit of work per run.
//!
//! [Operator] wraps a [Stage] in an explicit lifecycle:
//! `Uninitialized → Configured → AwaitingInputs → Processing → Done | Failed`.
//! Configuration and dependencies are set up on the first consumed input; multi-input
//! stages gather inputs through a [JoinBarrier]; the stage's async work is driven by an
//! [AsyncBridge]. Once `Done` or `Failed`, further inputs are acknowledged as no-ops.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use crate::bridge::AsyncBridge;
use crate::config_store::ConfigStore;
use crate::envelope::{self, OutputEnvelope};
use crate::error::{OperatorError, Result};
use crate::join::{JoinBarrier, Offer};
use crate::stop::StopSignal;
use crate::types::{Event, InputEvent, Metadata, OperatorStatus, Phase};

/// Which inputs a stage consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSpec {
  /// Fires on the first input of any id.
  Trigger,
  /// Fires on the first valid input with this id.
  Single(String),
  /// Fires once every listed id has delivered a valid payload.
  Join(Vec<String>),
}

impl InputSpec {
  pub fn consumes(&self, input_id: &str) -> bool {
    match self {
      InputSpec::Trigger => true,
      InputSpec::Single(id) => id == input_id,
      InputSpec::Join(ids) => ids.iter().any(|id| id == input_id),
    }
  }
}

/// Everything a stage's processing step gets: shared config and dependencies, the
/// unwrapped input payloads keyed by input id, and the operator's stop signal.
pub struct StageJob<C, D> {
  pub config: Arc<C>,
  pub deps: Arc<D>,
  pub inputs: BTreeMap<String, Value>,
  pub stop: StopSignal,
}

impl<C, D> StageJob<C, D> {
  pub fn input(&self, input_id: &str) -> Result<&Value> {
    self
      .inputs
      .get(input_id)
      .ok_or_else(|| OperatorError::invalid_input(input_id, "input was not delivered"))
  }

  /// The payload on `input_id` read as a filesystem path.
  pub fn input_path(&self, input_id: &str) -> Result<PathBuf> {
    payload_path(input_id, self.input(input_id)?)
  }
}

/// Reads a payload as a non-empty path string.
pub fn payload_path(input_id: &str, payload: &Value) -> Result<PathBuf> {
  match payload.as_str() {
    Some(s) if !s.trim().is_empty() => Ok(PathBuf::from(s)),
    _ => Err(OperatorError::invalid_input(
      input_id,
      format!("expected a path string, got {payload}"),
    )),
  }
}

/// One pipeline stage: configuration, dependency setup, and the work itself.
pub trait Stage: Send + 'static {
  type Config: Send + Sync + 'static;
  type Deps: Send + Sync + 'static;

  /// Producer name written into the output envelope.
  fn name(&self) -> &str;

  fn inputs(&self) -> InputSpec;

  /// Output channel id, or `None` for a sink.
  fn output_id(&self) -> Option<&str>;

  /// Whether this stage terminates the pipeline run.
  fn is_final(&self) -> bool {
    false
  }

  fn load_config(&self, store: &dyn ConfigStore) -> Result<Self::Config>;

  fn init_dependencies(&self, config: &Self::Config) -> Result<Self::Deps>;

  /// Checks one unwrapped payload. For single-input stages a failure is fatal; join
  /// stages keep waiting.
  fn validate_input(&self, _input_id: &str, _payload: &Value) -> Result<()> {
    Ok(())
  }

  fn process(&self, job: StageJob<Self::Config, Self::Deps>) -> BoxFuture<'static, Result<Value>>;
}

/// Host primitive for emitting an output on a named channel.
pub trait OutputSender {
  fn send_output(&mut self, output_id: &str, envelope: OutputEnvelope, metadata: Metadata) -> Result<()>;
}

enum Lifecycle<C, D> {
  Uninitialized,
  Configured(Arc<C>),
  AwaitingInputs { config: Arc<C>, deps: Arc<D> },
  Processing,
  Done,
  Failed,
}

impl<C, D> Lifecycle<C, D> {
  fn phase(&self) -> Phase {
    match self {
      Lifecycle::Uninitialized => Phase::Uninitialized,
      Lifecycle::Configured(_) => Phase::Configured,
      Lifecycle::AwaitingInputs { .. } => Phase::AwaitingInputs,
      Lifecycle::Processing => Phase::Processing,
      Lifecycle::Done => Phase::Done,
      Lifecycle::Failed => Phase::Failed,
    }
  }
}

/// Event-driven wrapper that runs a [Stage] at most once.
pub struct Operator<S: Stage> {
  stage: S,
  store: Arc<dyn ConfigStore>,
  lifecycle: Lifecycle<S::Config, S::Deps>,
  join: Option<JoinBarrier>,
  bridge: AsyncBridge,
  stop: StopSignal,
}

impl<S: Stage> Operator<S> {
  pub fn new(stage: S, store: Arc<dyn ConfigStore>) -> Result<Self> {
    let join = match stage.inputs() {
      InputSpec::Join(ids) => Some(JoinBarrier::new(ids)),
      _ => None,
    };
    Ok(Self {
      stage,
      store,
      lifecycle: Lifecycle::Uninitialized,
      join,
      bridge: AsyncBridge::new()?,
      stop: StopSignal::new(),
    })
  }

  pub fn name(&self) -> &str {
    self.stage.name()
  }

  pub fn stage(&self) -> &S {
    &self.stage
  }

  pub fn phase(&self) -> Phase {
    self.lifecycle.phase()
  }

  pub fn is_completed(&self) -> bool {
    self.phase().is_terminal()
  }

  /// Handle the host triggers to interrupt in-flight retries.
  pub fn stop_signal(&self) -> StopSignal {
    self.stop.clone()
  }

  /// Handles one event and tells the host whether to keep this operator running.
  #[instrument(level = "trace", skip(self, event, out), fields(stage = %self.stage.name(), kind = event.kind()))]
  pub fn on_event(&mut self, event: Event, out: &mut dyn OutputSender) -> OperatorStatus {
    match event {
      Event::Input(input) => self.on_input(input, out),
      Event::Stop => self.on_stop(),
      Event::Error(message) => {
        warn!(stage = %self.stage.name(), error = %message, "error event from host");
        OperatorStatus::Continue
      }
    }
  }

  fn on_stop(&mut self) -> OperatorStatus {
    if self.is_completed() {
      debug!(stage = %self.stage.name(), "stop after completion");
      return OperatorStatus::Stop;
    }
    self.stop.trigger();
    if let Lifecycle::AwaitingInputs { config, .. } = &self.lifecycle {
      self.lifecycle = Lifecycle::Configured(config.clone());
    }
    info!(stage = %self.stage.name(), phase = %self.phase(), "stop received, released dependencies");
    OperatorStatus::Stop
  }

  fn on_input(&mut self, input: InputEvent, out: &mut dyn OutputSender) -> OperatorStatus {
    let InputEvent { id, value, metadata } = input;
    if self.is_completed() {
      info!(stage = %self.stage.name(), input_id = %id, "already completed, ignoring input");
      return OperatorStatus::Continue;
    }
    let spec = self.stage.inputs();
    if !spec.consumes(&id) {
      debug!(stage = %self.stage.name(), input_id = %id, "input not consumed by this stage");
      return OperatorStatus::Continue;
    }
    debug!(stage = %self.stage.name(), input_id = %id, payload = %value, "input received");

    if let Err(e) = self.ensure_ready() {
      return self.fail(e);
    }

    if !envelope::is_envelope(&value) {
      debug!(stage = %self.stage.name(), input_id = %id, "bare value, passed through unwrapped");
    }
    let payload = envelope::unwrap(value);
    let inputs = match spec {
      InputSpec::Trigger | InputSpec::Single(_) => {
        if let Err(e) = self.stage.validate_input(&id, &payload) {
          return self.fail(e);
        }
        BTreeMap::from([(id, payload)])
      }
      InputSpec::Join(_) => match self.offer_to_join(&id, payload) {
        Ok(Some(inputs)) => inputs,
        Ok(None) => return OperatorStatus::Continue,
        Err(e) => return self.fail(e),
      },
    };

    self.run(inputs, metadata, out)
  }

  /// Loads configuration and dependencies on first use.
  fn ensure_ready(&mut self) -> Result<()> {
    if let Lifecycle::Uninitialized = self.lifecycle {
      let config = self.stage.load_config(self.store.as_ref())?;
      info!(stage = %self.stage.name(), "configuration loaded");
      self.lifecycle = Lifecycle::Configured(Arc::new(config));
    }
    if let Lifecycle::Configured(config) = &self.lifecycle {
      let config = config.clone();
      let deps = self.stage.init_dependencies(&config)?;
      info!(stage = %self.stage.name(), "dependencies initialized");
      self.lifecycle = Lifecycle::AwaitingInputs {
        config,
        deps: Arc::new(deps),
      };
    }
    Ok(())
  }

  /// `Ok(Some(inputs))` once the barrier releases, `Ok(None)` while it keeps waiting.
  fn offer_to_join(&mut self, id: &str, payload: Value) -> Result<Option<BTreeMap<String, Value>>> {
    let stage = &self.stage;
    let Some(join) = self.join.as_mut() else {
      return Err(OperatorError::configuration("join stage has no barrier"));
    };
    match join.offer(id, payload, |p| stage.validate_input(id, p)) {
      Offer::Released => Ok(Some(join.received().clone())),
      Offer::Waiting { missing } => {
        info!(stage = %stage.name(), input_id = %id, missing = ?missing, "waiting for remaining inputs");
        Ok(None)
      }
      Offer::Duplicate | Offer::AlreadyReleased => Ok(None),
      Offer::Rejected(e) if e.is_fatal_for_join() => Err(e),
      Offer::Rejected(_) => Ok(None),
    }
  }

  fn run(
    &mut self,
    inputs: BTreeMap<String, Value>,
    metadata: Metadata,
    out: &mut dyn OutputSender,
  ) -> OperatorStatus {
    let (config, deps) = match std::mem::replace(&mut self.lifecycle, Lifecycle::Processing) {
      Lifecycle::AwaitingInputs { config, deps } => (config, deps),
      other => {
        self.lifecycle = other;
        return self.fail(OperatorError::configuration("processing started before setup"));
      }
    };
    info!(stage = %self.stage.name(), inputs = ?inputs.keys().collect::<Vec<_>>(), "processing");

    let job = StageJob {
      config,
      deps,
      inputs,
      stop: self.stop.clone(),
    };
    let outcome = self
      .bridge
      .drive(self.stage.process(job))
      .map_err(OperatorError::from)
      .and_then(|r| r);

    match outcome {
      Ok(result) => self.emit(result, metadata, out),
      Err(e) => self.fail(e),
    }
  }

  fn emit(&mut self, result: Value, metadata: Metadata, out: &mut dyn OutputSender) -> OperatorStatus {
    if let Some(output_id) = self.stage.output_id() {
      let env = envelope::wrap(self.stage.name(), result, self.stage.is_final());
      if let Err(e) = out.send_output(output_id, env, metadata) {
        return self.fail(e);
      }
      info!(stage = %self.stage.name(), output_id = %output_id, "output sent");
    }
    self.lifecycle = Lifecycle::Done;
    info!(stage = %self.stage.name(), "done");
    OperatorStatus::Stop
  }

  fn fail(&mut self, e: OperatorError) -> OperatorStatus {
    error!(stage = %self.stage.name(), phase = %self.phase(), error = %e, "stage failed");
    self.lifecycle = Lifecycle::Failed;
    OperatorStatus::Stop
  }
}
