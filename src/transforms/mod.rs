//! File-format transforms the stages plug in: context extraction, summarization,
//! question extraction, file pattern matching and result persistence.

mod contexts;
#[cfg(test)]
mod contexts_test;
mod pattern;
mod questions;
mod results;
mod summary;

pub use contexts::{
  ContextFileReport, ExtractionReport, contexts_file_name, extract_unique_contexts, read_contexts,
  safe_name,
};
pub use pattern::{FilePattern, matching_files};
pub use questions::{extract_questions, extract_questions_from_file};
pub use results::{PersistOutcome, persist_query_outputs};
pub use summary::{MIN_TOKENS_FOR_SUMMARY, build_question_prompt, summarize};
