//! Escritura atómica: ningún lector observa un fichero a medio escribir.
//!
//! - `write_atomic`: tmp hermano + fsync + rename (reemplaza).
//! - `write_new_atomic`: igual pero falla con `AlreadyExists` si el destino
//!   existe (hard link exclusivo).
//! - `read_json`: `None` si no existe; `Corrupt` si no parsea.
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use log::{debug, warn};
use serde::de::DeserializeOwned;

use crate::error::PersistenceError;

pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PersistenceError> {
    let tmp = write_tmp(path, bytes)?;
    if let Err(e) = fs::rename(&tmp, path) {
        remove_quietly(&tmp);
        return Err(PersistenceError::io(path, e));
    }
    sync_parent(path);
    debug!("atomic write {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

pub fn write_new_atomic(path: &Path, bytes: &[u8]) -> Result<(), PersistenceError> {
    if path.exists() {
        return Err(PersistenceError::AlreadyExists(path.to_path_buf()));
    }
    let tmp = write_tmp(path, bytes)?;
    let linked = fs::hard_link(&tmp, path);
    let result = match linked {
        Ok(()) => {
            remove_quietly(&tmp);
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            remove_quietly(&tmp);
            Err(PersistenceError::AlreadyExists(path.to_path_buf()))
        }
        Err(e) => {
            // sistemas de ficheros sin hard links: rename tras re-chequear
            warn!("hard link unsupported at {} ({e}); falling back to rename", path.display());
            if path.exists() {
                remove_quietly(&tmp);
                Err(PersistenceError::AlreadyExists(path.to_path_buf()))
            } else {
                fs::rename(&tmp, path).map_err(|e| PersistenceError::io(path, e))
            }
        }
    };
    if result.is_ok() {
        sync_parent(path);
    }
    result
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, PersistenceError> {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(PersistenceError::io(path, e)),
    };
    serde_json::from_slice(&bytes).map(Some)
                                  .map_err(|e| PersistenceError::corrupt(path, e.to_string()))
}

/// Borra `path`; que no exista no es error.
pub fn remove_if_exists(path: &Path) -> Result<(), PersistenceError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(PersistenceError::io(path, e)),
    }
}

pub(crate) fn ensure_parent(path: &Path) -> Result<(), PersistenceError> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir).map_err(|e| PersistenceError::io(dir, e)),
        _ => Ok(()),
    }
}

fn write_tmp(path: &Path, bytes: &[u8]) -> Result<PathBuf, PersistenceError> {
    ensure_parent(path)?;
    let tmp = tmp_sibling(path);
    let written = OpenOptions::new().write(true)
                                    .create(true)
                                    .truncate(true)
                                    .open(&tmp)
                                    .and_then(|mut f| {
                                        f.write_all(bytes)?;
                                        f.sync_all()
                                    });
    if let Err(e) = written {
        remove_quietly(&tmp);
        return Err(PersistenceError::io(&tmp, e));
    }
    Ok(tmp)
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    path.with_file_name(format!(".{name}.tmp-{}", process::id()))
}

fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        debug!("could not remove {}: {e}", path.display());
    }
}

#[cfg(unix)]
fn sync_parent(path: &Path) {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        if let Err(e) = File::open(dir).and_then(|d| d.sync_all()) {
            debug!("directory sync failed for {}: {e}", dir.display());
        }
    }
}

#[cfg(not(unix))]
fn sync_parent(_path: &Path) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_leaves_no_tmp_behind() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("cred.json");
        write_atomic(&path, b"{\"a\":1}").expect("first write");
        write_atomic(&path, b"{\"a\":2}").expect("second write");

        let value: Option<serde_json::Value> = read_json(&path).expect("read");
        assert_eq!(value, Some(serde_json::json!({"a": 2})));
        let names: Vec<_> = fs::read_dir(path.parent().expect("parent")).expect("list")
                                                                         .filter_map(Result::ok)
                                                                         .map(|e| e.file_name())
                                                                         .collect();
        assert_eq!(names.len(), 1);
    }

    #[test]
    fn create_only_refuses_existing_target() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("marker.json");
        write_new_atomic(&path, b"1").expect("create");
        assert!(matches!(write_new_atomic(&path, b"2"), Err(PersistenceError::AlreadyExists(_))));
        assert_eq!(fs::read(&path).expect("read"), b"1");
    }

    #[test]
    fn unparsable_file_is_corrupt_and_missing_is_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("x.json");
        assert!(read_json::<serde_json::Value>(&path).expect("missing").is_none());
        fs::write(&path, b"{not json").expect("write");
        assert!(matches!(read_json::<serde_json::Value>(&path), Err(PersistenceError::Corrupt { .. })));
    }
}
