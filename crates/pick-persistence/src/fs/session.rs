use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{debug, info};
use pick_core::constants::RECORD_VERSION;
use pick_core::{Credential, SessionStore, StoreError};
use serde::{Deserialize, Serialize};

use crate::atomic::{read_json, remove_if_exists, write_atomic};
use crate::error::PersistenceError;

#[derive(Debug, Serialize, Deserialize)]
struct StoredCredential {
    version: u32,
    saved_at: DateTime<Utc>,
    credential: Credential,
}

/// Credencial única en `credential.json`; cada `save` reemplaza el fichero
/// completo de forma atómica.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Option<Credential>, PersistenceError> {
        let Some(stored) = read_json::<StoredCredential>(&self.path)? else {
            debug!("no credential at {}", self.path.display());
            return Ok(None);
        };
        if stored.version != RECORD_VERSION {
            return Err(PersistenceError::corrupt(&self.path, format!("unsupported credential version {}", stored.version)));
        }
        Ok(Some(stored.credential))
    }

    fn write(&self, credential: &Credential) -> Result<(), PersistenceError> {
        let stored = StoredCredential { version: RECORD_VERSION,
                                        saved_at: Utc::now(),
                                        credential: credential.clone() };
        let bytes = serde_json::to_vec_pretty(&stored)?;
        write_atomic(&self.path, &bytes)?;
        info!("credential saved to {}", self.path.display());
        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<Credential>, StoreError> {
        Ok(self.read()?)
    }

    fn save(&mut self, credential: &Credential) -> Result<(), StoreError> {
        Ok(self.write(credential)?)
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        remove_if_exists(&self.path)?;
        debug!("credential cleared at {}", self.path.display());
        Ok(())
    }
}
