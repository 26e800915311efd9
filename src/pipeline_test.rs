//! Tests for pipeline graph construction.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::config_store::{ConfigStore, HostConfigStore};
use crate::pipeline::graph_rag_pipeline;

#[test]
fn graph_has_expected_shape() {
  let store: Arc<dyn ConfigStore> = Arc::new(HostConfigStore::new("/nonexistent"));
  let flow = graph_rag_pipeline(store).unwrap();

  assert_eq!(
    flow.node_names(),
    vec![
      "data_prep",
      "question_generator",
      "rag_indexer",
      "rag_query_evaluator",
      "result_logger"
    ]
  );
  assert_eq!(flow.roots(), vec!["data_prep"]);
  assert_eq!(
    flow.downstream_of("data_prep"),
    BTreeSet::from(["question_generator".to_string(), "rag_indexer".to_string()])
  );
  assert_eq!(
    flow.upstream_of("rag_query_evaluator"),
    BTreeSet::from(["question_generator".to_string(), "rag_indexer".to_string()])
  );
  assert_eq!(flow.downstream_of("rag_query_evaluator"), BTreeSet::from(["result_logger".to_string()]));
}
