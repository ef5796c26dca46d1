use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepStatus {
    Ok,
    /// Éxito tras al menos un reintento.
    Retried,
    Skipped,
    Failed,
}

impl StepStatus {
    pub fn is_success(self) -> bool {
        matches!(self, StepStatus::Ok | StepStatus::Retried)
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StepStatus::Ok => "OK",
            StepStatus::Retried => "RETRIED",
            StepStatus::Skipped => "SKIPPED",
            StepStatus::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// Motivo de un `Skipped`; distingue el salto legítimo por marcador del
/// bloqueo por un upstream fallido.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    AlreadySubmitted { period: String },
    Blocked { upstream: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::AlreadySubmitted { period } => write!(f, "already submitted for {period}"),
            SkipReason::Blocked { upstream } => write!(f, "blocked by {upstream}"),
        }
    }
}
