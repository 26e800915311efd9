//! Stop signal shared between the host and an operator's in-flight work.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Inner {
  triggered: AtomicBool,
  notify: Notify,
}

/// Cloneable, one-way stop flag. Once triggered it stays triggered.
///
/// The retry executor races its inter-attempt delay against [StopSignal::triggered],
/// so a stop request ends a pending wait immediately.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
  inner: Arc<Inner>,
}

impl StopSignal {
  pub fn new() -> Self {
    Self::default()
  }

  /// Marks the signal as triggered and wakes every waiter. Idempotent.
  pub fn trigger(&self) {
    if !self.inner.triggered.swap(true, Ordering::SeqCst) {
      self.inner.notify.notify_waiters();
    }
  }

  pub fn is_triggered(&self) -> bool {
    self.inner.triggered.load(Ordering::SeqCst)
  }

  /// Resolves once the signal has been triggered (immediately if it already was).
  pub async fn triggered(&self) {
    let notified = self.inner.notify.notified();
    tokio::pin!(notified);
    notified.as_mut().enable();
    if self.is_triggered() {
      return;
    }
    notified.await;
  }
}
