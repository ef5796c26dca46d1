//! Errores de persistencia.
//! Mapea errores de IO / serde a variantes semánticas y luego al contrato
//! `StoreError` del core.
use std::io;
use std::path::{Path, PathBuf};

use pick_core::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("io error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("corrupt record at {}: {reason}", .path.display())]
    Corrupt { path: PathBuf, reason: String },
    #[error("already exists: {}", .0.display())]
    AlreadyExists(PathBuf),
    #[error("run lock {} held by {holder}", .path.display())]
    Locked { path: PathBuf, holder: String },
    #[error("serialization: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl PersistenceError {
    pub fn io(path: &Path, source: io::Error) -> Self {
        Self::Io { path: path.to_path_buf(),
                   source }
    }

    pub fn corrupt(path: &Path, reason: impl Into<String>) -> Self {
        Self::Corrupt { path: path.to_path_buf(),
                        reason: reason.into() }
    }
}

impl From<PersistenceError> for StoreError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::Io { .. } => StoreError::Io(err.to_string()),
            PersistenceError::Corrupt { .. } | PersistenceError::Serialize(_) => StoreError::Corrupt(err.to_string()),
            PersistenceError::AlreadyExists(_) | PersistenceError::Locked { .. } => StoreError::Conflict(err.to_string()),
        }
    }
}
