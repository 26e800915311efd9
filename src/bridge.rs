//! Drives asynchronous stage work from the host's synchronous event callback.
//!
//! Each operator owns one [AsyncBridge]. A call to [AsyncBridge::drive] spawns the future
//! as a task on the bridge's private runtime and blocks on its join handle. The bridge
//! refuses to be re-entered while a task is outstanding.
//!
//! `drive` must not be called from inside another Tokio runtime's async context; the
//! host calls operators from plain OS threads.

use std::any::Any;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tokio::runtime::{Builder, Runtime};
use tracing::{trace, warn};

/// Failure to drive a task to completion.
#[derive(Debug, Error)]
pub enum BridgeError {
  #[error("failed to start async runtime: {0}")]
  Runtime(#[source] std::io::Error),

  /// A task is already outstanding on this bridge.
  #[error("async bridge is already driving a task")]
  Busy,

  #[error("driven task panicked: {0}")]
  Panicked(String),

  #[error("driven task was cancelled")]
  Cancelled,
}

/// Single-task bridge from a synchronous callback into async code.
pub struct AsyncBridge {
  runtime: Runtime,
  busy: AtomicBool,
}

/// Clears the busy flag when the drive call returns, including on unwind.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
  fn drop(&mut self) {
    self.0.store(false, Ordering::SeqCst);
  }
}

impl AsyncBridge {
  pub fn new() -> Result<Self, BridgeError> {
    let runtime = Builder::new_current_thread()
      .enable_all()
      .build()
      .map_err(BridgeError::Runtime)?;
    Ok(Self {
      runtime,
      busy: AtomicBool::new(false),
    })
  }

  /// True while a task is being driven.
  pub fn is_busy(&self) -> bool {
    self.busy.load(Ordering::SeqCst)
  }

  /// Runs `future` to completion and returns its output.
  ///
  /// Returns [BridgeError::Busy] without running anything if another task is outstanding.
  /// A panic inside the task is reported as [BridgeError::Panicked], not propagated.
  pub fn drive<F, T>(&self, future: F) -> Result<T, BridgeError>
  where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
  {
    if self
      .busy
      .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
      .is_err()
    {
      warn!("async bridge re-entered while a task is outstanding");
      return Err(BridgeError::Busy);
    }
    let _guard = BusyGuard(&self.busy);

    trace!("async bridge spawning task");
    let handle = self.runtime.spawn(future);
    self.runtime.block_on(handle).map_err(|e| {
      if e.is_panic() {
        BridgeError::Panicked(panic_message(e.into_panic()))
      } else {
        BridgeError::Cancelled
      }
    })
  }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
  match payload.downcast::<String>() {
    Ok(s) => *s,
    Err(payload) => match payload.downcast::<&'static str>() {
      Ok(s) => (*s).to_string(),
      Err(_) => "non-string panic payload".to_string(),
    },
  }
}
