use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use log::{debug, warn};
use pick_core::{PipelineRun, RunLog, StoreError};

use crate::atomic::ensure_parent;
use crate::error::PersistenceError;

/// Historial JSON Lines: una línea por run sellado. Sólo se abre en modo
/// append; nunca se reescribe una línea previa.
#[derive(Debug, Clone)]
pub struct JsonlRunLog {
    path: PathBuf,
}

impl JsonlRunLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_line(&self, run: &PipelineRun) -> Result<(), PersistenceError> {
        let mut line = serde_json::to_vec(run)?;
        line.push(b'\n');
        ensure_parent(&self.path)?;
        let mut file = OpenOptions::new().create(true)
                                         .read(true)
                                         .append(true)
                                         .open(&self.path)
                                         .map_err(|e| PersistenceError::io(&self.path, e))?;
        if ends_mid_line(&mut file).map_err(|e| PersistenceError::io(&self.path, e))? {
            warn!("{}: last record was cut short; starting a new line", self.path.display());
            line.insert(0, b'\n');
        }
        file.write_all(&line)
            .and_then(|_| file.sync_data())
            .map_err(|e| PersistenceError::io(&self.path, e))?;
        debug!("run {} appended to {}", run.id(), self.path.display());
        Ok(())
    }

    /// Todas las líneas legibles, en orden de escritura. Las corruptas (p.ej.
    /// una escritura interrumpida) se omiten con un `warn!`.
    pub fn read_all(&self) -> Result<Vec<PipelineRun>, PersistenceError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(PersistenceError::io(&self.path, e)),
        };
        let mut runs = Vec::new();
        for (i, line) in text.lines().enumerate().filter(|(_, l)| !l.trim().is_empty()) {
            match serde_json::from_str::<PipelineRun>(line) {
                Ok(run) => runs.push(run),
                Err(e) => warn!("{}:{}: skipping unreadable run record: {e}", self.path.display(), i + 1),
            }
        }
        Ok(runs)
    }
}

/// `true` si el fichero no está vacío y no termina en `\n` (escritura
/// interrumpida).
fn ends_mid_line(file: &mut File) -> io::Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

impl RunLog for JsonlRunLog {
    fn append(&mut self, run: &PipelineRun) -> Result<(), StoreError> {
        Ok(self.write_line(run)?)
    }

    fn recent(&self, limit: usize) -> Result<Vec<PipelineRun>, StoreError> {
        let runs = self.read_all()?;
        Ok(runs.into_iter().rev().take(limit).collect())
    }
}
