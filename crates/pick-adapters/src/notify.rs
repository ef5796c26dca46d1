use log::{error, info, warn};
use pick_core::{Notification, NotificationSink, NotifyError, Severity};

use crate::command::CommandSpec;

/// Siempre presente: la notificación queda en el log del proceso.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl NotificationSink for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    fn notify(&self, n: &Notification) -> Result<(), NotifyError> {
        let hint = n.action_hint.as_deref().map(|h| format!(" -> {h}")).unwrap_or_default();
        match n.severity {
            Severity::Info => info!("[{}] {}: {}{hint}", n.run_id, n.title, n.message),
            Severity::Warning => warn!("[{}] {}: {}{hint}", n.run_id, n.title, n.message),
            Severity::Alert => error!("[{}] {}: {}{hint}", n.run_id, n.title, n.message),
        }
        Ok(())
    }
}

/// Programa de notificación (p.ej. un wrapper de notificaciones de
/// escritorio): recibe título, mensaje y subtítulo como argumentos y la
/// notificación completa como JSON por stdin.
pub struct CommandNotifier {
    spec: CommandSpec,
}

impl CommandNotifier {
    pub fn new(spec: CommandSpec) -> Self {
        Self { spec }
    }
}

impl NotificationSink for CommandNotifier {
    fn name(&self) -> &str {
        &self.spec.program
    }

    fn notify(&self, n: &Notification) -> Result<(), NotifyError> {
        let delivery = |reason: String| NotifyError::Delivery { sink: self.spec.program.clone(),
                                                                reason };
        let payload = serde_json::to_vec(n).map_err(|e| delivery(e.to_string()))?;
        let args = vec![n.title.clone(), n.message.clone(), n.subtitle.clone().unwrap_or_default()];
        self.spec.run_raw(Some(payload), &args).map_err(|e| delivery(e.to_string()))?;
        Ok(())
    }
}
