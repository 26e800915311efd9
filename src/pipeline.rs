//! The fixed GraphRAG evaluation pipeline.
//!
//! ```text
//! data_prep ─┬─▶ question_generator ─┐
//!            └─▶ rag_indexer ────────┴─▶ rag_query_evaluator ─▶ result_logger
//! ```

use std::sync::Arc;

use crate::config_store::ConfigStore;
use crate::error::Result;
use crate::host::{Dataflow, HostError};
use crate::operator::{Operator, Stage};
use crate::stages::{
  DataPrepStage, QuestionGenStage, RagIndexStage, RagQueryStage, ResultLoggerStage, channels,
};

/// Stage instances for one pipeline. Defaults build real service clients from configuration.
#[derive(Default)]
pub struct PipelineStages {
  pub data_prep: DataPrepStage,
  pub question_gen: QuestionGenStage,
  pub rag_index: RagIndexStage,
  pub rag_query: RagQueryStage,
  pub result_logger: ResultLoggerStage,
}

/// Error building the pipeline graph.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
  #[error(transparent)]
  Operator(#[from] crate::error::OperatorError),

  #[error(transparent)]
  Host(#[from] HostError),
}

fn operator<S: Stage>(stage: S, store: &Arc<dyn ConfigStore>) -> Result<Operator<S>> {
  Operator::new(stage, store.clone())
}

/// Builds the pipeline with real services.
pub fn graph_rag_pipeline(store: Arc<dyn ConfigStore>) -> std::result::Result<Dataflow, PipelineError> {
  graph_rag_pipeline_with(store, PipelineStages::default())
}

/// Builds the pipeline around the given stage instances.
pub fn graph_rag_pipeline_with(
  store: Arc<dyn ConfigStore>,
  stages: PipelineStages,
) -> std::result::Result<Dataflow, PipelineError> {
  let data_prep = operator(stages.data_prep, &store)?;
  let question_gen = operator(stages.question_gen, &store)?;
  let rag_index = operator(stages.rag_index, &store)?;
  let rag_query = operator(stages.rag_query, &store)?;
  let result_logger = operator(stages.result_logger, &store)?;

  let names = [
    data_prep.name().to_string(),
    question_gen.name().to_string(),
    rag_index.name().to_string(),
    rag_query.name().to_string(),
    result_logger.name().to_string(),
  ];
  let [prep, questions, index, query, logger] = names.each_ref().map(String::as_str);

  let flow = Dataflow::new()
    .node(data_prep)?
    .node(question_gen)?
    .node(rag_index)?
    .node(rag_query)?
    .node(result_logger)?
    .edge(prep, channels::UNIQUE_CONTEXTS_DIR, questions, channels::UNIQUE_CONTEXTS_DIR)?
    .edge(prep, channels::UNIQUE_CONTEXTS_DIR, index, channels::UNIQUE_CONTEXTS_DIR)?
    .edge(questions, channels::GENERATED_QUESTIONS_FILE, query, channels::GENERATED_QUESTIONS_FILE)?
    .edge(index, channels::RAG_INDEX_DIR, query, channels::RAG_INDEX_DIR)?
    .edge(query, channels::QUERY_RESULTS, logger, channels::QUERY_RESULTS)?;
  Ok(flow)
}
