//! Implementaciones en disco de los almacenes del core.

mod markers;
mod run_log;
mod session;

pub use markers::FileMarkerStore;
pub use run_log::JsonlRunLog;
pub use session::FileSessionStore;
