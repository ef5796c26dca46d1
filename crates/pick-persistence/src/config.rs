//! Ubicación de los ficheros de estado bajo un único directorio.
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Locks más viejos que esto se consideran abandonados.
pub const DEFAULT_LOCK_STALE: Duration = Duration::from_secs(6 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub state_dir: PathBuf,
    pub lock_stale_after: Duration,
}

impl StoreConfig {
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self { state_dir: state_dir.into(),
               lock_stale_after: DEFAULT_LOCK_STALE }
    }

    pub fn with_lock_stale_after(mut self, stale: Duration) -> Self {
        self.lock_stale_after = stale;
        self
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    pub fn credential_path(&self) -> PathBuf {
        self.state_dir.join("credential.json")
    }

    pub fn markers_dir(&self) -> PathBuf {
        self.state_dir.join("markers")
    }

    pub fn run_log_path(&self) -> PathBuf {
        self.state_dir.join("runs.jsonl")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.state_dir.join("run.lock")
    }
}
