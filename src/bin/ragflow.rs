//! CLI: run the GraphRAG evaluation pipeline, or inspect a generated questions file.
//!
//! Usage: `ragflow run [--config-root DIR] [--trigger VALUE]`
//!        `ragflow extract-questions FILE`
//!
//! Set RUST_LOG=ragflow_operators=trace for TRACE-level span enter/exit and events.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use ragflow_operators::config_store::{CONFIG_ROOT_ENV, SiblingConfigStore, select_config_store};
use ragflow_operators::host::run_until_interrupted;
use ragflow_operators::pipeline::graph_rag_pipeline;
use ragflow_operators::transforms::extract_questions_from_file;
use serde_json::Value;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

/// Single-shot dataflow pipeline for dataset indexing and retrieval evaluation.
#[derive(Parser, Debug)]
#[command(name = "ragflow")]
#[command(
  after_help = r#"Configuration files are read from <root>/configs/:
  data_prep_config.yml, question_gen_config.yml, rag_index_config.yml, rag_query_config.yml

Examples:
  ragflow run --config-root ./deploy
  RAGFLOW_CONFIG_ROOT=/srv/flow ragflow run --trigger '{"dataset": "agriculture"}'
  ragflow extract-questions output/questions.txt"#
)]
struct Args {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Run the whole pipeline once.
  Run {
    /// Directory holding `configs/`. Falls back to the directory next to the executable.
    #[arg(long, value_name = "DIR", env = CONFIG_ROOT_ENV)]
    config_root: Option<PathBuf>,

    /// Value fed to the first stage. Parsed as JSON, otherwise sent as a string.
    #[arg(long, value_name = "VALUE", default_value = "start")]
    trigger: String,
  },
  /// Print the questions found in a generated questions file, one per line.
  ExtractQuestions {
    #[arg(value_name = "FILE")]
    file: PathBuf,
  },
}

fn parse_trigger(raw: &str) -> Value {
  serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_span_events(FmtSpan::ENTER | FmtSpan::EXIT)
    .init();

  let args = Args::parse();
  match args.command {
    Command::Run {
      config_root,
      trigger,
    } => run(config_root, &trigger).await,
    Command::ExtractQuestions { file } => match extract_questions_from_file(&file) {
      Ok(questions) => {
        for q in questions {
          println!("{q}");
        }
      }
      Err(e) => {
        eprintln!("Error: {e}");
        process::exit(1);
      }
    },
  }
}

async fn run(config_root: Option<PathBuf>, trigger: &str) {
  let store = select_config_store(config_root, SiblingConfigStore::discover());
  info!(store = store.kind(), base = %store.base_dir().display(), "configuration store selected");

  let flow = match graph_rag_pipeline(Arc::clone(&store)) {
    Ok(f) => f,
    Err(e) => {
      eprintln!("Error building pipeline: {e}");
      process::exit(1);
    }
  };

  let report = match run_until_interrupted(flow, parse_trigger(trigger)).await {
    Ok(r) => r,
    Err(e) => {
      eprintln!("Pipeline error: {e}");
      process::exit(1);
    }
  };

  println!("Pipeline run {} finished.", report.run_id);
  for node in &report.nodes {
    println!("  {}: {}", node.name, node.phase);
  }
  let incomplete = report.incomplete();
  if !incomplete.is_empty() {
    eprintln!("Stopped before completing: {}", incomplete.join(", "));
  }
  if !report.succeeded() {
    process::exit(1);
  }
}
