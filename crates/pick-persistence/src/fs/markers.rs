use std::path::{Path, PathBuf};

use log::info;
use pick_core::{MarkerStore, Period, StoreError, SubmissionMarker};

use crate::atomic::{read_json, write_new_atomic};
use crate::error::PersistenceError;

/// Un fichero por periodo: `submitted-<clave>.json`. Se crea una sola vez.
#[derive(Debug, Clone)]
pub struct FileMarkerStore {
    dir: PathBuf,
}

impl FileMarkerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, period: &Period) -> PathBuf {
        self.dir.join(format!("submitted-{}.json", period.key()))
    }

    fn read(&self, period: &Period) -> Result<Option<SubmissionMarker>, PersistenceError> {
        let path = self.path_for(period);
        let marker = read_json::<SubmissionMarker>(&path)?;
        match marker {
            Some(m) if m.period != *period => {
                Err(PersistenceError::corrupt(&path, format!("marker is for {} not {period}", m.period)))
            }
            other => Ok(other),
        }
    }

    fn create(&self, marker: &SubmissionMarker) -> Result<(), PersistenceError> {
        let path = self.path_for(&marker.period);
        let bytes = serde_json::to_vec_pretty(marker)?;
        write_new_atomic(&path, &bytes)?;
        info!("submission marker written: {}", path.display());
        Ok(())
    }
}

impl MarkerStore for FileMarkerStore {
    fn find(&self, period: &Period) -> Result<Option<SubmissionMarker>, StoreError> {
        Ok(self.read(period)?)
    }

    fn put(&mut self, marker: &SubmissionMarker) -> Result<(), StoreError> {
        Ok(self.create(marker)?)
    }
}
