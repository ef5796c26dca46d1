use std::fmt;

use serde::Serialize;

use crate::errors::ErrorKind;
use crate::run::{PipelineRun, RunOutcome};
use crate::step::{SkipReason, StepResult, StepStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Alert,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Alert => "alert",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub severity: Severity,
    pub title: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    /// Acción concreta para el humano (p.ej. reautenticarse).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_hint: Option<String>,
    /// Step que originó la falla terminal, si la hay.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_step: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    pub run_id: String,
    pub outcome: RunOutcome,
}

impl Notification {
    /// - `SUCCESS` → `Info`
    /// - `PARTIAL` → `Warning` con la lista de steps no críticos fallidos
    /// - `FAILED` → `Alert` con el primer step crítico fallido y su error
    pub fn for_run(run: &PipelineRun, reauth_hint: Option<&str>) -> Self {
        let subtitle = run.period().map(|p| p.to_string());
        let base = |severity, title: String, message: String| Notification { severity,
                                                                              title,
                                                                              message,
                                                                              subtitle: subtitle.clone(),
                                                                              action_hint: None,
                                                                              failed_step: None,
                                                                              error_kind: None,
                                                                              run_id: run.id().to_string(),
                                                                              outcome: run.outcome() };
        match run.outcome() {
            RunOutcome::Success => base(Severity::Info, "pickflow: run succeeded".to_string(), success_message(run)),
            RunOutcome::Partial => {
                let failed: Vec<String> = run.failed_non_critical().iter().map(|r| describe(r)).collect();
                base(Severity::Warning,
                     "pickflow: picks handled, optional steps failed".to_string(),
                     format!("non-critical step(s) failed: {}", failed.join("; ")))
            }
            RunOutcome::Failed => {
                let Some(first) = run.failed_critical() else {
                    return base(Severity::Alert,
                                "pickflow: run failed".to_string(),
                                "run failed without a recorded critical failure".to_string());
                };
                let kind = first.error.as_ref().map(|e| e.kind());
                let mut n = base(Severity::Alert, format!("pickflow: run failed at {}", first.step), describe(first));
                n.failed_step = Some(first.step.clone());
                n.error_kind = kind;
                n.action_hint = action_for(kind, reauth_hint);
                n
            }
        }
    }

    /// Alerta para un run que ni siquiera empezó (configuración, lock): no
    /// hay `PipelineRun` ni entrada en el historial.
    pub fn not_started(message: impl Into<String>, kind: ErrorKind, action_hint: Option<String>) -> Self {
        Notification { severity: Severity::Alert,
                       title: "pickflow: run not started".to_string(),
                       message: message.into(),
                       subtitle: None,
                       action_hint,
                       failed_step: None,
                       error_kind: Some(kind),
                       run_id: NOT_STARTED_RUN_ID.to_string(),
                       outcome: RunOutcome::Failed }
    }
}

/// `run_id` de las alertas previas a cualquier run.
pub const NOT_STARTED_RUN_ID: &str = "not-started";

fn success_message(run: &PipelineRun) -> String {
    let already = run.steps().iter().find_map(|r| match &r.skip_reason {
                                           Some(SkipReason::AlreadySubmitted { period }) => Some(period.clone()),
                                           _ => None,
                                       });
    let done = run.steps().iter().filter(|r| r.status.is_success()).count();
    match already {
        Some(period) => format!("picks for {period} were already submitted; nothing re-sent ({done} step(s) ran)"),
        None => format!("{done} step(s) completed"),
    }
}

fn describe(result: &StepResult) -> String {
    match (&result.error, result.status) {
        (Some(err), _) => format!("{} [{}] {}", result.step, err.kind(), err),
        (None, StepStatus::Failed) => format!("{} failed", result.step),
        (None, status) => format!("{} {}", result.step, status),
    }
}

fn action_for(kind: Option<ErrorKind>, reauth_hint: Option<&str>) -> Option<String> {
    match kind? {
        ErrorKind::Auth => Some(match reauth_hint {
                                Some(hint) => format!("run `pickflow login` to refresh the credential ({hint})"),
                                None => "run `pickflow login` to refresh the credential".to_string(),
                            }),
        ErrorKind::Io => Some("check the state directory; the run did not touch the site".to_string()),
        _ => None,
    }
}
