use log::{info, warn};
use thiserror::Error;

use super::Notification;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("notification delivery failed via {sink}: {reason}")]
    Delivery { sink: String, reason: String },
}

pub trait NotificationSink {
    fn name(&self) -> &str;
    fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Reparte a todos los sinks; un sink que falla no impide a los demás.
#[derive(Default)]
pub struct FanoutNotifier {
    sinks: Vec<Box<dyn NotificationSink>>,
}

impl FanoutNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(mut self, sink: Box<dyn NotificationSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl NotificationSink for FanoutNotifier {
    fn name(&self) -> &str {
        "fanout"
    }

    /// Devuelve el primer error, pero sólo después de intentar todos.
    fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let mut first_err = None;
        for sink in &self.sinks {
            if let Err(e) = sink.notify(notification) {
                warn!("sink {} failed: {e}", sink.name());
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Entrega best-effort: nunca propaga el error.
pub fn deliver(sink: &dyn NotificationSink, notification: &Notification) {
    match sink.notify(notification) {
        Ok(()) => info!("notification sent ({}): {}", notification.severity, notification.title),
        Err(e) => warn!("notification dropped: {e}"),
    }
}
