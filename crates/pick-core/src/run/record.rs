//! `PipelineRun`: registro sellado de un run. Se construye a través de
//! `RunRecorder` y, una vez sellado, no expone mutación alguna.
use chrono::{DateTime, Utc};
use log::error;
use serde::{Deserialize, Serialize};

use super::{RunId, RunOutcome};
use crate::constants::{PIPELINE_STEP, RECORD_VERSION};
use crate::errors::StepError;
use crate::model::Period;
use crate::session::SessionState;
use crate::step::{StepResult, StepStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineRun {
    version: u32,
    id: RunId,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    session: SessionState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    period: Option<Period>,
    steps: Vec<StepResult>,
    outcome: RunOutcome,
}

impl PipelineRun {
    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn id(&self) -> &RunId {
        &self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    /// Estado de sesión con el que el pipeline fue invocado.
    pub fn session(&self) -> SessionState {
        self.session
    }

    pub fn period(&self) -> Option<&Period> {
        self.period.as_ref()
    }

    pub fn steps(&self) -> &[StepResult] {
        &self.steps
    }

    pub fn outcome(&self) -> RunOutcome {
        self.outcome
    }

    pub fn result_for(&self, step: &str) -> Option<&StepResult> {
        self.steps.iter().find(|r| r.step == step)
    }

    pub fn failed_critical(&self) -> Option<&StepResult> {
        self.steps.iter().find(|r| r.critical && r.status == StepStatus::Failed)
    }

    pub fn failed_non_critical(&self) -> Vec<&StepResult> {
        self.steps.iter().filter(|r| !r.critical && r.status == StepStatus::Failed).collect()
    }
}

/// Acumula resultados en orden y sella el `PipelineRun`.
#[derive(Debug)]
pub struct RunRecorder {
    id: RunId,
    started_at: DateTime<Utc>,
    session: SessionState,
    period: Option<Period>,
    steps: Vec<StepResult>,
}

impl RunRecorder {
    pub fn begin(started_at: DateTime<Utc>, session: SessionState) -> Self {
        Self { id: RunId::generate(started_at),
               started_at,
               session,
               period: None,
               steps: Vec::new() }
    }

    pub fn id(&self) -> &RunId {
        &self.id
    }

    pub fn set_period(&mut self, period: Period) {
        self.period = Some(period);
    }

    pub fn record(&mut self, result: StepResult) {
        self.steps.push(result);
    }

    pub fn has_result(&self, step: &str) -> bool {
        self.steps.iter().any(|r| r.step == step)
    }

    /// Sella el run. Cada nombre de `expected` sin resultado es un bug del
    /// pipeline: se agrega un resultado sintético `pipeline` y el run queda
    /// `FAILED`.
    pub fn seal(mut self, expected: &[&str], finished_at: DateTime<Utc>) -> PipelineRun {
        let missing: Vec<&str> = expected.iter().copied().filter(|name| !self.has_result(name)).collect();
        if !missing.is_empty() {
            let detail = format!("no result recorded for step(s): {}", missing.join(", "));
            error!("run {}: {detail}", self.id);
            self.steps.push(StepResult::synthetic(PIPELINE_STEP, StepError::Internal(detail), finished_at));
        }
        let outcome = RunOutcome::aggregate(&self.steps);
        PipelineRun { version: RECORD_VERSION,
                      id: self.id,
                      started_at: self.started_at,
                      finished_at,
                      session: self.session,
                      period: self.period,
                      steps: self.steps,
                      outcome }
    }
}
