//! Tests for the thread-per-node runner.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use serde_json::{Value, json};

use super::{Dataflow, Node, TRIGGER_INPUT, run_dataflow};
use crate::envelope::{self, wrap};
use crate::operator::OutputSender;
use crate::stop::StopSignal;
use crate::types::{Event, Metadata, OperatorStatus, Phase};

type Log = Arc<Mutex<Vec<String>>>;

/// Waits for `needs` distinct input ids, then emits their payloads joined with `+` on `out`.
pub(super) struct Scripted {
  name: String,
  needs: usize,
  received: BTreeMap<String, Value>,
  phase: Phase,
  log: Log,
  stop: StopSignal,
}

impl Scripted {
  pub(super) fn relay(name: &str) -> Self {
    Self::join(name, 1, Log::default())
  }

  fn join(name: &str, needs: usize, log: Log) -> Self {
    Self {
      name: name.to_string(),
      needs,
      received: BTreeMap::new(),
      phase: Phase::AwaitingInputs,
      log,
      stop: StopSignal::new(),
    }
  }
}

impl Node for Scripted {
  fn name(&self) -> &str {
    &self.name
  }

  fn on_event(&mut self, event: Event, out: &mut dyn OutputSender) -> OperatorStatus {
    match event {
      Event::Input(input) => {
        self.log.lock().unwrap().push(format!("{}<-{}", self.name, input.id));
        let payload = envelope::unwrap(input.value);
        self.received.entry(input.id).or_insert(payload);
        if self.received.len() < self.needs {
          return OperatorStatus::Continue;
        }
        let joined = self
          .received
          .values()
          .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
          .collect::<Vec<_>>()
          .join("+");
        let result = json!(format!("{}({joined})", self.name));
        out
          .send_output("out", wrap(self.name.clone(), result, false), input.metadata)
          .unwrap();
        self.phase = Phase::Done;
        OperatorStatus::Stop
      }
      Event::Stop => {
        self.log.lock().unwrap().push(format!("{}:stop", self.name));
        OperatorStatus::Stop
      }
      Event::Error(_) => OperatorStatus::Continue,
    }
  }

  fn phase(&self) -> Phase {
    self.phase
  }

  fn stop_signal(&self) -> StopSignal {
    self.stop.clone()
  }
}

/// Terminal node that records every payload it sees.
struct Sink {
  seen: Arc<Mutex<Vec<(Value, Metadata)>>>,
  phase: Phase,
}

impl Node for Sink {
  fn name(&self) -> &str {
    "sink"
  }

  fn on_event(&mut self, event: Event, _out: &mut dyn OutputSender) -> OperatorStatus {
    if let Event::Input(input) = event {
      self.seen.lock().unwrap().push((input.value, input.metadata));
      self.phase = Phase::Done;
    }
    OperatorStatus::Stop
  }

  fn phase(&self) -> Phase {
    self.phase
  }

  fn stop_signal(&self) -> StopSignal {
    StopSignal::new()
  }
}

#[test]
fn chain_routes_envelopes_and_metadata() {
  let seen = Arc::new(Mutex::new(Vec::new()));
  let flow = Dataflow::new()
    .node(Scripted::relay("a"))
    .unwrap()
    .node(Scripted::relay("b"))
    .unwrap()
    .node(Sink {
      seen: seen.clone(),
      phase: Phase::AwaitingInputs,
    })
    .unwrap()
    .edge("a", "out", "b", "from_a")
    .unwrap()
    .edge("b", "out", "sink", "final")
    .unwrap();

  let report = run_dataflow(flow, json!("go")).unwrap();

  assert!(report.succeeded());
  let seen = seen.lock().unwrap();
  assert_eq!(seen.len(), 1);
  let (value, metadata) = &seen[0];
  assert_eq!(value["agent_name"], "b");
  assert_eq!(value["agent_result"], "b(a(go))");
  assert_eq!(metadata.0["run_id"], json!(report.run_id.to_string()));
}

#[test]
fn fan_in_waits_for_both_producers() {
  let log = Log::default();
  let flow = Dataflow::new()
    .node(Scripted::join("root", 1, log.clone()))
    .unwrap()
    .node(Scripted::join("left", 1, log.clone()))
    .unwrap()
    .node(Scripted::join("right", 1, log.clone()))
    .unwrap()
    .node(Scripted::join("join", 2, log.clone()))
    .unwrap()
    .edge("root", "out", "left", "in")
    .unwrap()
    .edge("root", "out", "right", "in")
    .unwrap()
    .edge("left", "out", "join", "l")
    .unwrap()
    .edge("right", "out", "join", "r")
    .unwrap();

  let report = run_dataflow(flow, json!("t")).unwrap();

  assert!(report.succeeded(), "{report:?}");
  let log = log.lock().unwrap();
  assert_eq!(log[0], format!("root<-{TRIGGER_INPUT}"));
  assert_eq!(log.iter().filter(|l| l.starts_with("join<-")).count(), 2);
  assert!(!log.iter().any(|l| l.ends_with(":stop")));
}

#[test]
fn waiting_node_is_stopped_when_all_upstream_nodes_stop() {
  let log = Log::default();
  let flow = Dataflow::new()
    .node(Scripted::join("a", 1, log.clone()))
    .unwrap()
    .node(Scripted::join("starved", 2, log.clone()))
    .unwrap()
    .edge("a", "out", "starved", "x")
    .unwrap();

  let report = run_dataflow(flow, json!(1)).unwrap();

  assert_eq!(report.phase_of("a"), Some(Phase::Done));
  assert_eq!(report.phase_of("starved"), Some(Phase::AwaitingInputs));
  assert!(!report.succeeded());
  assert!(report.failed().is_empty());
  assert_eq!(report.incomplete(), vec!["starved"]);
  let log = log.lock().unwrap();
  assert_eq!(log.last().map(String::as_str), Some("starved:stop"));
}

#[test]
fn root_that_ignores_the_trigger_is_stopped() {
  let log = Log::default();
  let flow = Dataflow::new()
    .node(Scripted::join("lonely", 2, log.clone()))
    .unwrap();

  let report = run_dataflow(flow, Value::Null).unwrap();

  assert_eq!(report.nodes.len(), 1);
  assert_eq!(
    *log.lock().unwrap(),
    vec![format!("lonely<-{TRIGGER_INPUT}"), "lonely:stop".to_string()]
  );
}
