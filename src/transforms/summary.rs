//! Context summarization and the question-generation prompt.

use tracing::{debug, error, warn};

use crate::services::TextTokenizer;

/// Contexts shorter than this are truncated instead of summarized.
pub const MIN_TOKENS_FOR_SUMMARY: usize = 50;

/// Characters kept per summary token when a context is too short to summarize.
const CHARS_PER_TOKEN: usize = 5;

/// Head and tail of `context`, each `total_tokens / 2` tokens long.
///
/// When the halves would overlap the first `total_tokens` tokens are used instead. A
/// tokenizer failure falls back to truncation.
pub fn summarize(context: &str, tokenizer: &dyn TextTokenizer, total_tokens: usize) -> String {
  let tokens = match tokenizer.tokenize(context) {
    Ok(t) => t,
    Err(e) => {
      error!(error = %e, "tokenization failed, truncating context");
      return truncate_chars(context, total_tokens.saturating_mul(CHARS_PER_TOKEN));
    }
  };
  if tokens.len() < MIN_TOKENS_FOR_SUMMARY {
    warn!(tokens = tokens.len(), "context too short for a summary, truncating");
    return truncate_chars(context, total_tokens.saturating_mul(CHARS_PER_TOKEN));
  }

  let half = total_tokens / 2;
  let head_end = half.min(tokens.len());
  let tail_start = tokens.len().saturating_sub(half);
  let selected: Vec<String> = if tail_start < head_end {
    debug!("token slices overlap, using leading tokens");
    tokens[..total_tokens.min(tokens.len())].to_vec()
  } else {
    tokens[..head_end]
      .iter()
      .chain(&tokens[tail_start..])
      .cloned()
      .collect()
  };

  tokenizer.detokenize(&selected).unwrap_or_else(|e| {
    error!(error = %e, "detokenization failed, truncating context");
    truncate_chars(context, total_tokens.saturating_mul(CHARS_PER_TOKEN))
  })
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
  text.chars().take(max_chars).collect()
}

/// Prompt asking for 5 users × 5 tasks × 5 questions about the summarized dataset.
pub fn build_question_prompt(summaries: &[String]) -> String {
  let description = summaries.join("\n\n");
  format!(
    r#"
Given the following description generated from summaries of a dataset's contexts:

{description}

Please identify 5 potential users who would engage with this dataset. For each user, list 5 tasks they would likely perform using this dataset. Then, for each (user, task) combination, generate 5 distinct questions that require a high-level understanding or analysis of the entire dataset, not just retrieval of specific snippets. Ensure the questions probe deeper insights, comparisons, or overarching themes present in the data.

Output the results strictly in the following structure:
- User 1: [Concise user description, e.g., AI Researcher]
    - Task 1: [Concise task description, e.g., Analyzing bias in language models]
        - Question 1: [Generated Question]
        - Question 2: [Generated Question]
        - Question 3: [Generated Question]
        - Question 4: [Generated Question]
        - Question 5: [Generated Question]
    - Task 2: [Concise task description]
            ...
    - Task 5: [Concise task description]
- User 2: [Concise user description]
    ...
- User 5: [Concise user description]
    ...
"#
  )
}
