//! pick-persistence
//!
//! Almacenes en disco para el estado que sobrevive entre runs:
//! - credencial única (`credential.json`, reemplazo atómico)
//! - un marcador por periodo enviado (`markers/submitted-<periodo>.json`,
//!   creación exclusiva, nunca se sobrescribe)
//! - historial append-only (`runs.jsonl`, una línea por run sellado)
//! - lock de run (`run.lock`, adquirir-o-abortar)
//!
//! Módulos:
//! - `atomic`: escritura atómica (tmp + fsync + rename) y lectura JSON.
//! - `fs`: implementaciones de `SessionStore`, `MarkerStore` y `RunLog`.
//! - `lock`: `RunLock`.
//! - `config`: ubicación del directorio de estado.

pub mod atomic;
pub mod config;
pub mod error;
pub mod fs;
pub mod lock;

pub use config::StoreConfig;
pub use error::PersistenceError;
pub use fs::{FileMarkerStore, FileSessionStore, JsonlRunLog};
pub use lock::RunLock;
