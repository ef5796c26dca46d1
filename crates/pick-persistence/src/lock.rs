//! Lock de run (adquirir-o-abortar).
//!
//! Dos runs solapados podrían enviar picks dos veces; el lock lo impide. Se
//! crea con `create_new` y se borra en `Drop`. Un lock más viejo que el
//! umbral se considera abandonado (proceso muerto) y se rompe con `warn!`.
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::time::{Duration, SystemTime};

use chrono::Utc;
use log::{debug, info, warn};

use crate::atomic::ensure_parent;
use crate::error::PersistenceError;

#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    pub fn acquire(path: &Path, stale_after: Duration) -> Result<Self, PersistenceError> {
        ensure_parent(path)?;
        // segundo intento sólo tras romper un lock abandonado
        for _ in 0..2 {
            match OpenOptions::new().write(true).create_new(true).open(path) {
                Ok(mut file) => {
                    let holder = format!("pid {} since {}\n", process::id(), Utc::now().to_rfc3339());
                    file.write_all(holder.as_bytes())
                        .and_then(|_| file.sync_all())
                        .map_err(|e| PersistenceError::io(path, e))?;
                    info!("run lock acquired: {}", path.display());
                    return Ok(Self { path: path.to_path_buf() });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    if !is_stale(path, stale_after)? {
                        let holder = fs::read_to_string(path).map(|s| s.trim().to_string())
                                                             .unwrap_or_else(|_| "unknown holder".to_string());
                        return Err(PersistenceError::Locked { path: path.to_path_buf(),
                                                              holder });
                    }
                    warn!("breaking stale run lock {} (older than {:?})", path.display(), stale_after);
                    crate::atomic::remove_if_exists(path)?;
                }
                Err(e) => return Err(PersistenceError::io(path, e)),
            }
        }
        Err(PersistenceError::Locked { path: path.to_path_buf(),
                                       holder: "a concurrent run".to_string() })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!("run lock released: {}", self.path.display()),
            Err(e) => warn!("could not release run lock {}: {e}", self.path.display()),
        }
    }
}

fn is_stale(path: &Path, stale_after: Duration) -> Result<bool, PersistenceError> {
    let modified = match fs::metadata(path).and_then(|m| m.modified()) {
        Ok(t) => t,
        // el holder lo liberó entre medias
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(true),
        Err(e) => return Err(PersistenceError::io(path, e)),
    };
    let age = SystemTime::now().duration_since(modified).unwrap_or(Duration::ZERO);
    Ok(age >= stale_after)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_is_refused_until_release() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("run.lock");
        let hour = Duration::from_secs(3600);

        let held = RunLock::acquire(&path, hour).expect("first acquire");
        match RunLock::acquire(&path, hour) {
            Err(PersistenceError::Locked { holder, .. }) => assert!(holder.contains(&process::id().to_string())),
            other => panic!("expected Locked, got {other:?}"),
        }
        drop(held);
        assert!(!path.exists());
        RunLock::acquire(&path, hour).expect("acquire after release");
    }

    #[test]
    fn stale_lock_is_broken() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("run.lock");
        fs::write(&path, "pid 1 since long ago\n").expect("write stale lock");

        let lock = RunLock::acquire(&path, Duration::ZERO).expect("stale lock broken");
        assert_eq!(lock.path(), path.as_path());
        assert!(fs::read_to_string(&path).expect("read").contains(&process::id().to_string()));
    }
}
