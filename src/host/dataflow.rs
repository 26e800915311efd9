//! Dataflow graph declaration.

use std::collections::BTreeSet;

use tracing::debug;

use super::{HostError, Node};
use crate::stop::StopSignal;

/// `(source, output_id) → (target, input_id)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
  pub source: String,
  pub output_id: String,
  pub target: String,
  pub input_id: String,
}

/// Nodes plus the edges between them. Node names are unique.
#[derive(Default)]
pub struct Dataflow {
  pub(super) nodes: Vec<Box<dyn Node>>,
  pub(super) edges: Vec<Edge>,
}

impl Dataflow {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn node(mut self, node: impl Node + 'static) -> Result<Self, HostError> {
    let name = node.name().to_string();
    if self.contains(&name) {
      return Err(HostError::DuplicateNode(name));
    }
    debug!(node = %name, "node added");
    self.nodes.push(Box::new(node));
    Ok(self)
  }

  /// Connects `source`'s `output_id` to `target`'s `input_id`. Both nodes must already exist.
  pub fn edge(
    mut self,
    source: &str,
    output_id: &str,
    target: &str,
    input_id: &str,
  ) -> Result<Self, HostError> {
    for name in [source, target] {
      if !self.contains(name) {
        return Err(HostError::UnknownNode(name.to_string()));
      }
    }
    if source == target {
      return Err(HostError::SelfLoop(source.to_string()));
    }
    debug!(source, output_id, target, input_id, "edge added");
    self.edges.push(Edge {
      source: source.to_string(),
      output_id: output_id.to_string(),
      target: target.to_string(),
      input_id: input_id.to_string(),
    });
    Ok(self)
  }

  pub fn contains(&self, name: &str) -> bool {
    self.nodes.iter().any(|n| n.name() == name)
  }

  pub fn node_names(&self) -> Vec<&str> {
    self.nodes.iter().map(|n| n.name()).collect()
  }

  pub fn edges(&self) -> &[Edge] {
    &self.edges
  }

  /// Distinct nodes with an edge into `name`.
  pub fn upstream_of(&self, name: &str) -> BTreeSet<String> {
    self
      .edges
      .iter()
      .filter(|e| e.target == name)
      .map(|e| e.source.clone())
      .collect()
  }

  /// Distinct nodes `name` has an edge into.
  pub fn downstream_of(&self, name: &str) -> BTreeSet<String> {
    self
      .edges
      .iter()
      .filter(|e| e.source == name)
      .map(|e| e.target.clone())
      .collect()
  }

  /// Nodes with no incoming edge; they receive the run trigger.
  pub fn roots(&self) -> Vec<&str> {
    self
      .nodes
      .iter()
      .map(|n| n.name())
      .filter(|name| !self.edges.iter().any(|e| e.target == *name))
      .collect()
  }

  /// Stop handles of every node, for interrupting in-flight work from outside the run.
  pub fn stop_signals(&self) -> Vec<StopSignal> {
    self.nodes.iter().map(|n| n.stop_signal()).collect()
  }
}
