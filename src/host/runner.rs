//! Thread-per-node execution of a [Dataflow].

use std::collections::{BTreeSet, HashMap};
use std::thread;

use serde_json::{Value, json};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{debug, error, info, info_span, warn};
use uuid::Uuid;

use super::{Dataflow, Edge, HostError, Node};
use crate::envelope::OutputEnvelope;
use crate::error::Result;
use crate::operator::OutputSender;
use crate::types::{Event, Metadata, OperatorStatus, Phase};

/// Input id carrying the run trigger into root nodes.
pub const TRIGGER_INPUT: &str = "trigger";

enum Message {
  Event(Event),
  UpstreamStopped(String),
}

/// Final phase of one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeReport {
  pub name: String,
  pub phase: Phase,
}

/// Outcome of one dataflow run, nodes in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
  pub run_id: Uuid,
  pub nodes: Vec<NodeReport>,
}

impl RunReport {
  pub fn phase_of(&self, name: &str) -> Option<Phase> {
    self.nodes.iter().find(|n| n.name == name).map(|n| n.phase)
  }

  pub fn failed(&self) -> Vec<&str> {
    self
      .nodes
      .iter()
      .filter(|n| n.phase == Phase::Failed)
      .map(|n| n.name.as_str())
      .collect()
  }

  /// Nodes that were stopped before reaching `Done` or `Failed`.
  pub fn incomplete(&self) -> Vec<&str> {
    self
      .nodes
      .iter()
      .filter(|n| !matches!(n.phase, Phase::Done | Phase::Failed))
      .map(|n| n.name.as_str())
      .collect()
  }

  pub fn succeeded(&self) -> bool {
    self.nodes.iter().all(|n| n.phase == Phase::Done)
  }
}

/// Routes one node's outputs along its outgoing edges.
struct Router {
  node: String,
  edges: Vec<Edge>,
  targets: HashMap<String, UnboundedSender<Message>>,
}

impl OutputSender for Router {
  fn send_output(&mut self, output_id: &str, envelope: OutputEnvelope, metadata: Metadata) -> Result<()> {
    let value = envelope.to_value();
    let mut routed = 0usize;
    for edge in self.edges.iter().filter(|e| e.output_id == output_id) {
      let Some(tx) = self.targets.get(&edge.target) else {
        continue;
      };
      let event = Event::input_with_metadata(edge.input_id.clone(), value.clone(), metadata.clone());
      if tx.send(Message::Event(event)).is_err() {
        warn!(node = %self.node, target = %edge.target, "target already stopped, output dropped");
      } else {
        routed += 1;
      }
    }
    if routed == 0 {
      debug!(node = %self.node, output_id, "output has no live receivers");
    }
    Ok(())
  }
}

impl Router {
  fn announce_stopped(&self) {
    for tx in self.targets.values() {
      let _ = tx.send(Message::UpstreamStopped(self.node.clone()));
    }
  }
}

/// Delivers events to `node` until it stops, then tells its downstream nodes.
fn drive_node(
  mut node: Box<dyn Node>,
  mut inbox: UnboundedReceiver<Message>,
  mut router: Router,
  mut upstream: BTreeSet<String>,
) -> Phase {
  let span = info_span!("node", node = %node.name());
  let _enter = span.enter();
  loop {
    let event = match inbox.blocking_recv() {
      Some(Message::Event(event)) => event,
      Some(Message::UpstreamStopped(from)) => {
        upstream.remove(&from);
        if !upstream.is_empty() {
          debug!(from = %from, remaining = ?upstream, "upstream stopped");
          continue;
        }
        Event::Stop
      }
      None => Event::Stop,
    };
    let stopping = matches!(event, Event::Stop);
    let status = node.on_event(event, &mut router);
    if stopping || status == OperatorStatus::Stop {
      break;
    }
  }
  router.announce_stopped();
  let phase = node.phase();
  info!(phase = %phase, "node stopped");
  phase
}

/// Runs `dataflow` to completion, feeding `trigger` to every root node.
///
/// Blocks the calling thread. Must not be called from inside an async context.
pub fn run_dataflow(dataflow: Dataflow, trigger: Value) -> std::result::Result<RunReport, HostError> {
  let run_id = Uuid::new_v4();
  info!(%run_id, nodes = ?dataflow.node_names(), "starting dataflow run");

  let roots: BTreeSet<String> = dataflow.roots().into_iter().map(str::to_string).collect();
  let mut inboxes = HashMap::new();
  let mut senders = HashMap::new();
  for name in dataflow.node_names() {
    let (tx, rx) = unbounded_channel::<Message>();
    senders.insert(name.to_string(), tx);
    inboxes.insert(name.to_string(), rx);
  }

  let metadata = Metadata::new(json!({ "run_id": run_id.to_string() }));
  for root in &roots {
    if let Some(tx) = senders.get(root) {
      let event = Event::input_with_metadata(TRIGGER_INPUT, trigger.clone(), metadata.clone());
      let _ = tx.send(Message::Event(event));
    }
  }

  let mut wiring: HashMap<String, (BTreeSet<String>, BTreeSet<String>)> = dataflow
    .node_names()
    .into_iter()
    .map(|name| (name.to_string(), (dataflow.upstream_of(name), dataflow.downstream_of(name))))
    .collect();

  let Dataflow { nodes, edges } = dataflow;
  let mut handles = Vec::with_capacity(nodes.len());
  for node in nodes {
    let name = node.name().to_string();
    let Some(inbox) = inboxes.remove(&name) else {
      return Err(HostError::Aborted(format!("no inbox for node '{name}'")));
    };
    let (upstream, downstream) = wiring.remove(&name).unwrap_or_default();
    let outgoing: Vec<Edge> = edges.iter().filter(|e| e.source == name).cloned().collect();
    let targets = downstream
      .into_iter()
      .filter_map(|target| senders.get(&target).map(|tx| (target.clone(), tx.clone())))
      .collect();
    let router = Router {
      node: name.clone(),
      edges: outgoing,
      targets,
    };
    let handle = thread::Builder::new()
      .name(name.clone())
      .spawn(move || drive_node(node, inbox, router, upstream))
      .map_err(|source| HostError::Spawn {
        name: name.clone(),
        source,
      })?;
    handles.push((name, handle));
  }
  // Routers hold the only remaining senders; roots see a closed inbox after the trigger.
  drop(senders);

  let mut reports = Vec::with_capacity(handles.len());
  for (name, handle) in handles {
    let phase = handle.join().unwrap_or_else(|_| {
      error!(node = %name, "node thread panicked");
      Phase::Failed
    });
    reports.push(NodeReport { name, phase });
  }

  let report = RunReport {
    run_id,
    nodes: reports,
  };
  if report.succeeded() {
    info!(%run_id, "dataflow run finished");
  } else {
    warn!(
      %run_id,
      failed = ?report.failed(),
      incomplete = ?report.incomplete(),
      "dataflow run did not complete"
    );
  }
  Ok(report)
}

/// Runs `dataflow` on a blocking thread and triggers every node's stop signal on Ctrl-C.
pub async fn run_until_interrupted(
  dataflow: Dataflow,
  trigger: Value,
) -> std::result::Result<RunReport, HostError> {
  let signals = dataflow.stop_signals();
  let run = tokio::task::spawn_blocking(move || run_dataflow(dataflow, trigger));
  let watcher = tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      warn!("interrupt received, stopping operators");
      for signal in &signals {
        signal.trigger();
      }
    }
  });
  let outcome = run.await;
  watcher.abort();
  outcome.map_err(|e| HostError::Aborted(e.to_string()))?
}
