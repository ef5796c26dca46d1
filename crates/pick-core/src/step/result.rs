use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{SkipReason, StepStatus};
use crate::errors::StepError;
use crate::model::ArtifactRef;

/// Registro inmutable de la ejecución (o el salto) de un step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    pub step: String,
    pub status: StepStatus,
    pub critical: bool,
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<StepError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<SkipReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<ArtifactRef>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl StepResult {
    /// `Ok` si bastó un intento; `Retried` si hizo falta más de uno.
    pub fn ok(step: &str,
              critical: bool,
              attempts: u32,
              artifact: Option<ArtifactRef>,
              started_at: DateTime<Utc>,
              finished_at: DateTime<Utc>)
              -> Self {
        let status = if attempts > 1 { StepStatus::Retried } else { StepStatus::Ok };
        Self { step: step.to_string(),
               status,
               critical,
               attempts,
               error: None,
               skip_reason: None,
               artifact,
               started_at,
               finished_at }
    }

    pub fn failed(step: &str,
                  critical: bool,
                  attempts: u32,
                  error: StepError,
                  started_at: DateTime<Utc>,
                  finished_at: DateTime<Utc>)
                  -> Self {
        Self { step: step.to_string(),
               status: StepStatus::Failed,
               critical,
               attempts,
               error: Some(error),
               skip_reason: None,
               artifact: None,
               started_at,
               finished_at }
    }

    pub fn skipped(step: &str, critical: bool, reason: SkipReason, at: DateTime<Utc>) -> Self {
        Self { step: step.to_string(),
               status: StepStatus::Skipped,
               critical,
               attempts: 0,
               error: None,
               skip_reason: Some(reason),
               artifact: None,
               started_at: at,
               finished_at: at }
    }

    /// Resultado sintético crítico (bloqueo de sesión o diagnóstico interno).
    pub fn synthetic(step: &str, error: StepError, at: DateTime<Utc>) -> Self {
        Self::failed(step, true, 0, error, at, at)
    }

    pub fn with_artifact(mut self, artifact: ArtifactRef) -> Self {
        self.artifact = Some(artifact);
        self
    }

    pub fn is_failed(&self) -> bool {
        self.status == StepStatus::Failed
    }
}
