//! Tests for config store selection and path resolution.

use std::path::{Path, PathBuf};

use crate::config_store::{ConfigStore, HostConfigStore, SiblingConfigStore, select_config_store};

#[test]
fn host_store_is_preferred_when_root_exists() {
  let dir = tempfile::tempdir().unwrap();
  let store = select_config_store(
    Some(dir.path().to_path_buf()),
    SiblingConfigStore::new("/elsewhere"),
  );
  assert_eq!(store.kind(), "host");
  assert_eq!(store.base_dir(), dir.path());
}

#[test]
fn missing_root_falls_back_to_sibling() {
  let store = select_config_store(
    Some(PathBuf::from("/definitely/not/a/real/dir")),
    SiblingConfigStore::new("/opt/ragflow"),
  );
  assert_eq!(store.kind(), "sibling");
  assert_eq!(store.base_dir(), Path::new("/opt/ragflow"));
}

#[test]
fn no_root_uses_sibling() {
  let store = select_config_store(None, SiblingConfigStore::new("/opt/ragflow"));
  assert_eq!(store.kind(), "sibling");
}

#[test]
fn config_path_points_into_configs_dir() {
  let store = HostConfigStore::new("/srv/flow");
  assert_eq!(
    store.config_path("rag_query_config.yml"),
    PathBuf::from("/srv/flow/configs/rag_query_config.yml")
  );
}

#[test]
fn resolve_keeps_absolute_and_joins_relative() {
  let store = HostConfigStore::new("/srv/flow");
  assert_eq!(store.resolve(Path::new("/abs/out")), PathBuf::from("/abs/out"));
  assert_eq!(
    store.resolve(Path::new("output/results.json")),
    PathBuf::from("/srv/flow/output/results.json")
  );
}

#[test]
fn discover_always_yields_a_base() {
  let store = SiblingConfigStore::discover();
  assert!(!store.base_dir().as_os_str().is_empty());
}
