//! Notificaciones humanas derivadas de un `PipelineRun`.
//!
//! La entrega es best-effort: `deliver` registra y descarta cualquier fallo
//! del sink, nunca lo propaga al pipeline.

mod message;
mod sink;

pub use message::{Notification, Severity, NOT_STARTED_RUN_ID};
pub use sink::{deliver, FanoutNotifier, NotificationSink, NotifyError};
