//! Fake services and fixtures shared by the stage tests.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::envelope::OutputEnvelope;
use crate::error::Result;
use crate::operator::OutputSender;
use crate::services::{ChatClient, DatasetFetcher, QueryMode, RetrievalEngine, ServiceError};
use crate::types::Metadata;

#[derive(Default)]
pub struct Recorder {
  pub sent: Vec<(String, OutputEnvelope, Metadata)>,
}

impl Recorder {
  pub fn only(&self) -> &OutputEnvelope {
    assert_eq!(self.sent.len(), 1, "expected exactly one output");
    &self.sent[0].1
  }
}

impl OutputSender for Recorder {
  fn send_output(&mut self, output_id: &str, envelope: OutputEnvelope, metadata: Metadata) -> Result<()> {
    self.sent.push((output_id.to_string(), envelope, metadata));
    Ok(())
  }
}

/// Writes `configs/<file>` under `root`.
pub fn write_config(root: &Path, file: &str, body: &str) {
  let dir = root.join("configs");
  fs::create_dir_all(&dir).unwrap();
  fs::write(dir.join(file), body).unwrap();
}

pub fn path_str(path: &Path) -> Value {
  json!(path.to_string_lossy())
}

/// Writes each `(name, lines)` pair as a JSONL file.
pub struct FakeFetcher {
  pub files: Vec<(String, String)>,
  pub failures: AtomicU32,
  pub calls: AtomicU32,
}

impl FakeFetcher {
  pub fn new(files: &[(&str, &str)]) -> Self {
    Self {
      files: files.iter().map(|(n, b)| (n.to_string(), b.to_string())).collect(),
      failures: AtomicU32::new(0),
      calls: AtomicU32::new(0),
    }
  }

  pub fn failing(times: u32) -> Self {
    let fetcher = Self::new(&[]);
    fetcher.failures.store(times, Ordering::SeqCst);
    fetcher
  }
}

#[async_trait]
impl DatasetFetcher for FakeFetcher {
  async fn fetch(&self, _repo_id: &str, local_dir: &Path) -> std::result::Result<usize, ServiceError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    if self
      .failures
      .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
      .is_ok()
    {
      return Err(ServiceError::protocol("dataset hub", "connection reset"));
    }
    fs::create_dir_all(local_dir)?;
    for (name, body) in &self.files {
      fs::write(local_dir.join(name), body)?;
    }
    Ok(self.files.len())
  }
}

/// Replies with a fixed completion after `failures` errors.
pub struct FakeChat {
  pub reply: String,
  pub failures: AtomicU32,
  pub prompts: Mutex<Vec<String>>,
}

impl FakeChat {
  pub fn new(reply: &str) -> Self {
    Self {
      reply: reply.to_string(),
      failures: AtomicU32::new(0),
      prompts: Mutex::new(Vec::new()),
    }
  }
}

#[async_trait]
impl ChatClient for FakeChat {
  async fn complete(&self, prompt: &str) -> std::result::Result<String, ServiceError> {
    self.prompts.lock().unwrap().push(prompt.to_string());
    if self
      .failures
      .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
      .is_ok()
    {
      return Err(ServiceError::protocol("llm", "rate limited"));
    }
    Ok(self.reply.clone())
  }
}

/// In-memory engine. Queries containing `fail` always error.
#[derive(Default)]
pub struct FakeEngine {
  pub inserted: Mutex<Vec<Vec<String>>>,
  pub queries: Mutex<Vec<(String, QueryMode)>>,
  pub answers: HashMap<String, String>,
  pub insert_failures: AtomicU32,
  pub initialized: AtomicU32,
}

impl FakeEngine {
  pub fn with_answers(answers: &[(&str, &str)]) -> Self {
    Self {
      answers: answers.iter().map(|(q, a)| (q.to_string(), a.to_string())).collect(),
      ..Self::default()
    }
  }

  pub fn inserted(&self) -> Vec<Vec<String>> {
    self.inserted.lock().unwrap().clone()
  }
}

#[async_trait]
impl RetrievalEngine for FakeEngine {
  async fn initialize(&self) -> std::result::Result<(), ServiceError> {
    self.initialized.fetch_add(1, Ordering::SeqCst);
    Ok(())
  }

  async fn insert(&self, documents: Vec<String>) -> std::result::Result<(), ServiceError> {
    if self
      .insert_failures
      .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
      .is_ok()
    {
      return Err(ServiceError::protocol("retrieval engine", "insert rejected"));
    }
    self.inserted.lock().unwrap().push(documents);
    Ok(())
  }

  async fn query(&self, text: &str, mode: QueryMode) -> std::result::Result<String, ServiceError> {
    self.queries.lock().unwrap().push((text.to_string(), mode));
    if text.contains("fail") {
      return Err(ServiceError::protocol("retrieval engine", "query timed out"));
    }
    Ok(
      self
        .answers
        .get(text)
        .cloned()
        .unwrap_or_else(|| format!("answer to {text}")),
    )
  }
}

pub fn read_json(path: &Path) -> Value {
  serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

pub fn payload_path(envelope: &OutputEnvelope) -> PathBuf {
  PathBuf::from(envelope.result.as_str().unwrap())
}
