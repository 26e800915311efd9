//! Tests for `AsyncBridge`.

use std::sync::Arc;
use std::time::Duration;

use crate::bridge::{AsyncBridge, BridgeError};

#[test]
fn drive_returns_task_output() {
  let bridge = AsyncBridge::new().unwrap();
  let v = bridge.drive(async { 40 + 2 }).unwrap();
  assert_eq!(v, 42);
  assert!(!bridge.is_busy());
}

#[test]
fn drive_supports_timers() {
  let bridge = AsyncBridge::new().unwrap();
  let v = bridge
    .drive(async {
      tokio::time::sleep(Duration::from_millis(5)).await;
      "slept"
    })
    .unwrap();
  assert_eq!(v, "slept");
}

#[test]
fn sequential_drives_reuse_the_bridge() {
  let bridge = AsyncBridge::new().unwrap();
  assert_eq!(bridge.drive(async { 1 }).unwrap(), 1);
  assert_eq!(bridge.drive(async { 2 }).unwrap(), 2);
}

#[test]
fn reentry_while_busy_is_rejected() {
  let bridge = Arc::new(AsyncBridge::new().unwrap());
  let inner = bridge.clone();
  let nested = bridge
    .drive(async move {
      assert!(inner.is_busy());
      inner.drive(async { 1 })
    })
    .unwrap();
  assert!(matches!(nested, Err(BridgeError::Busy)));
  assert!(!bridge.is_busy());
}

#[test]
fn panic_in_task_surfaces_as_error() {
  let bridge = AsyncBridge::new().unwrap();
  let r = bridge.drive::<_, ()>(async { panic!("engine exploded") });
  match r {
    Err(BridgeError::Panicked(msg)) => assert!(msg.contains("engine exploded")),
    other => panic!("expected panic error, got {other:?}"),
  }
  assert!(!bridge.is_busy());
  assert_eq!(bridge.drive(async { 5 }).unwrap(), 5);
}
