//! Bounded retry with a fixed delay between attempts.
//!
//! One combinator backs every external call a stage makes (dataset download, LLM
//! completion, engine insertion, retrieval query); call sites differ only in the
//! closure they pass. The delay is fixed, not exponential.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, warn};

use crate::error::OperatorError;
use crate::stop::StopSignal;

/// How many times to try an operation and how long to wait between tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  max_attempts: u32,
  delay: Duration,
}

impl RetryPolicy {
  /// `max_attempts` below 1 is clamped to 1.
  pub fn new(max_attempts: u32, delay: Duration) -> Self {
    Self {
      max_attempts: max_attempts.max(1),
      delay,
    }
  }

  pub fn from_secs(max_attempts: u32, delay_secs: u64) -> Self {
    Self::new(max_attempts, Duration::from_secs(delay_secs))
  }

  /// A single attempt, no waiting.
  pub fn once() -> Self {
    Self::new(1, Duration::ZERO)
  }

  pub fn max_attempts(&self) -> u32 {
    self.max_attempts
  }

  pub fn delay(&self) -> Duration {
    self.delay
  }
}

/// Why [execute] gave up.
#[derive(Debug, Error)]
pub enum RetryError<E> {
  #[error("{label} failed after {attempts} attempt(s): {last}")]
  Exhausted { label: String, attempts: u32, last: E },

  #[error("{label} stopped after {attempts} attempt(s)")]
  Stopped { label: String, attempts: u32 },
}

impl<E> RetryError<E> {
  pub fn attempts(&self) -> u32 {
    match self {
      RetryError::Exhausted { attempts, .. } | RetryError::Stopped { attempts, .. } => *attempts,
    }
  }

  /// The error from the final attempt, if the executor ran out of attempts.
  pub fn last_error(&self) -> Option<&E> {
    match self {
      RetryError::Exhausted { last, .. } => Some(last),
      RetryError::Stopped { .. } => None,
    }
  }
}

impl<E: fmt::Display> From<RetryError<E>> for OperatorError {
  fn from(e: RetryError<E>) -> Self {
    match e {
      RetryError::Exhausted {
        label,
        attempts,
        last,
      } => OperatorError::external(label, attempts, last.to_string()),
      RetryError::Stopped { label, .. } => OperatorError::Stopped(label),
    }
  }
}

/// Runs `operation` until it succeeds or `policy.max_attempts()` attempts have failed,
/// sleeping `policy.delay()` between consecutive attempts.
pub async fn execute<T, E, F, Fut>(
  policy: &RetryPolicy,
  label: &str,
  operation: F,
) -> Result<T, RetryError<E>>
where
  F: FnMut() -> Fut,
  Fut: Future<Output = Result<T, E>>,
  E: fmt::Display,
{
  run(policy, label, None, operation).await
}

/// Like [execute], but a triggered `stop` ends the run before the next attempt or in
/// the middle of a delay.
pub async fn execute_until_stopped<T, E, F, Fut>(
  policy: &RetryPolicy,
  label: &str,
  stop: &StopSignal,
  operation: F,
) -> Result<T, RetryError<E>>
where
  F: FnMut() -> Fut,
  Fut: Future<Output = Result<T, E>>,
  E: fmt::Display,
{
  run(policy, label, Some(stop), operation).await
}

async fn run<T, E, F, Fut>(
  policy: &RetryPolicy,
  label: &str,
  stop: Option<&StopSignal>,
  mut operation: F,
) -> Result<T, RetryError<E>>
where
  F: FnMut() -> Fut,
  Fut: Future<Output = Result<T, E>>,
  E: fmt::Display,
{
  let max_attempts = policy.max_attempts();
  let mut attempt = 0u32;

  loop {
    if let Some(s) = stop
      && s.is_triggered()
    {
      return Err(RetryError::Stopped {
        label: label.to_string(),
        attempts: attempt,
      });
    }
    attempt += 1;

    match operation().await {
      Ok(value) => {
        if attempt > 1 {
          debug!(operation = %label, attempt, "succeeded after retry");
        }
        return Ok(value);
      }
      Err(e) => {
        if attempt >= max_attempts {
          error!(operation = %label, attempts = attempt, error = %e, "max retries reached");
          return Err(RetryError::Exhausted {
            label: label.to_string(),
            attempts: attempt,
            last: e,
          });
        }
        warn!(
          operation = %label,
          attempt,
          max_attempts,
          delay = ?policy.delay(),
          error = %e,
          "attempt failed, retrying"
        );
        if policy.delay().is_zero() {
          continue;
        }
        match stop {
          Some(s) => {
            tokio::select! {
              _ = tokio::time::sleep(policy.delay()) => {}
              _ = s.triggered() => {
                return Err(RetryError::Stopped {
                  label: label.to_string(),
                  attempts: attempt,
                });
              }
            }
          }
          None => tokio::time::sleep(policy.delay()).await,
        }
      }
    }
  }
}
