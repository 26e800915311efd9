//! In-process dataflow host.
//!
//! Runs a graph of operators the way an external dataflow runtime would: one thread per
//! node, events delivered sequentially to each node's callback, outputs routed along
//! declared edges, and `Stop` delivered once every upstream node has stopped.

mod dataflow;
mod runner;
#[cfg(test)]
mod runner_test;

use thiserror::Error;

use crate::operator::{Operator, OutputSender, Stage};
use crate::stop::StopSignal;
use crate::types::{Event, OperatorStatus, Phase};

pub use dataflow::{Dataflow, Edge};
pub use runner::{NodeReport, RunReport, TRIGGER_INPUT, run_dataflow, run_until_interrupted};

/// Graph construction or run failure.
#[derive(Debug, Error)]
pub enum HostError {
  #[error("node '{0}' is declared twice")]
  DuplicateNode(String),

  #[error("edge refers to unknown node '{0}'")]
  UnknownNode(String),

  #[error("edge from '{0}' loops back to itself")]
  SelfLoop(String),

  #[error("failed to spawn thread for node '{name}': {source}")]
  Spawn {
    name: String,
    #[source]
    source: std::io::Error,
  },

  #[error("dataflow run was aborted: {0}")]
  Aborted(String),
}

/// One schedulable node. Implemented for every [Operator].
pub trait Node: Send {
  fn name(&self) -> &str;

  fn on_event(&mut self, event: Event, out: &mut dyn OutputSender) -> OperatorStatus;

  fn phase(&self) -> Phase;

  fn stop_signal(&self) -> StopSignal;
}

impl<S: Stage> Node for Operator<S> {
  fn name(&self) -> &str {
    Operator::name(self)
  }

  fn on_event(&mut self, event: Event, out: &mut dyn OutputSender) -> OperatorStatus {
    Operator::on_event(self, event, out)
  }

  fn phase(&self) -> Phase {
    Operator::phase(self)
  }

  fn stop_signal(&self) -> StopSignal {
    Operator::stop_signal(self)
  }
}
