//! # ragflow-operators
//!
//! Single-shot dataflow operators for a document indexing and retrieval pipeline.
//!
//! ## Architecture
//!
//! Every pipeline stage implements [operator::Stage] and runs inside an
//! [operator::Operator], which owns the execution contract:
//!
//! - lazy configuration and dependency setup on the first consumed input,
//! - a single-shot guard so a stage's side effects happen at most once per run,
//! - a [join::JoinBarrier] for stages with several upstream producers,
//! - an [bridge::AsyncBridge] driving the stage's async work from a sync callback,
//! - [retry] around every external call, interruptible through a [stop::StopSignal],
//! - the [envelope] wire format on every internal edge.
//!
//! [stages] holds the concrete stages, [host] runs a graph of operators in-process and
//! [pipeline] wires the GraphRAG evaluation graph.

pub mod bridge;
#[cfg(test)]
mod bridge_test;
pub mod config;
pub mod config_store;
#[cfg(test)]
mod config_store_test;
pub mod envelope;
pub mod error;
#[cfg(test)]
mod error_test;
pub mod host;
pub mod join;
pub mod operator;
pub mod pipeline;
#[cfg(test)]
mod pipeline_test;
pub mod retry;
pub mod services;
pub mod stages;
pub mod stop;
pub mod transforms;
pub mod types;

pub use config_store::{ConfigStore, HostConfigStore, SiblingConfigStore, select_config_store};
pub use envelope::OutputEnvelope;
pub use error::{OperatorError, Result};
pub use host::{Dataflow, RunReport, run_dataflow};
pub use operator::{InputSpec, Operator, OutputSender, Stage, StageJob};
pub use pipeline::{PipelineStages, graph_rag_pipeline, graph_rag_pipeline_with};
pub use retry::{RetryPolicy, execute, execute_until_stopped};
pub use types::{Event, Metadata, OperatorStatus, Phase};
