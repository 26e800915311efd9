//! Where stage configuration files live.
//!
//! Two implementations of [ConfigStore]: [HostConfigStore] is rooted at a directory the
//! host names explicitly (CLI flag or `RAGFLOW_CONFIG_ROOT`); [SiblingConfigStore] looks
//! for `configs/` beside the installed binary. [select_config_store] picks one at startup
//! and every stage receives that choice.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

/// Environment variable naming the preferred configuration root.
pub const CONFIG_ROOT_ENV: &str = "RAGFLOW_CONFIG_ROOT";

/// Directory under the base that holds the per-stage YAML files.
pub const CONFIGS_DIR: &str = "configs";

/// Locates configuration files and resolves relative paths found inside them.
pub trait ConfigStore: Send + Sync + fmt::Debug {
  /// Directory containing `configs/`; relative config paths resolve against it.
  fn base_dir(&self) -> &Path;

  /// Short label for logs.
  fn kind(&self) -> &'static str;

  fn config_path(&self, file_name: &str) -> PathBuf {
    self.base_dir().join(CONFIGS_DIR).join(file_name)
  }

  fn resolve(&self, path: &Path) -> PathBuf {
    if path.is_absolute() {
      path.to_path_buf()
    } else {
      self.base_dir().join(path)
    }
  }
}

/// Store rooted at a directory chosen by the host.
#[derive(Debug, Clone)]
pub struct HostConfigStore {
  root: PathBuf,
}

impl HostConfigStore {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }
}

impl ConfigStore for HostConfigStore {
  fn base_dir(&self) -> &Path {
    &self.root
  }

  fn kind(&self) -> &'static str {
    "host"
  }
}

/// Store that finds `configs/` next to the executable's parent directory.
#[derive(Debug, Clone)]
pub struct SiblingConfigStore {
  base: PathBuf,
}

impl SiblingConfigStore {
  pub fn new(base: impl Into<PathBuf>) -> Self {
    Self { base: base.into() }
  }

  /// Walks up from the running executable looking for a `configs/` directory; falls
  /// back to the current directory.
  pub fn discover() -> Self {
    let from_exe = std::env::current_exe().ok().and_then(|exe| {
      exe
        .ancestors()
        .skip(1)
        .take(3)
        .find(|dir| dir.join(CONFIGS_DIR).is_dir())
        .map(Path::to_path_buf)
    });
    let base = from_exe
      .or_else(|| std::env::current_dir().ok())
      .unwrap_or_else(|| PathBuf::from("."));
    Self { base }
  }
}

impl ConfigStore for SiblingConfigStore {
  fn base_dir(&self) -> &Path {
    &self.base
  }

  fn kind(&self) -> &'static str {
    "sibling"
  }
}

/// Picks the host store when `preferred_root` names an existing directory, otherwise
/// the sibling fallback.
pub fn select_config_store(
  preferred_root: Option<PathBuf>,
  fallback: SiblingConfigStore,
) -> Arc<dyn ConfigStore> {
  let store: Arc<dyn ConfigStore> = match preferred_root {
    Some(root) if root.is_dir() => Arc::new(HostConfigStore::new(root)),
    Some(root) => {
      warn!(path = %root.display(), "config root does not exist, using sibling configs");
      Arc::new(fallback)
    }
    None => Arc::new(fallback),
  };
  info!(kind = store.kind(), base = %store.base_dir().display(), "config store selected");
  store
}
