use serde::{Deserialize, Serialize};

use super::StepKind;
use crate::constants::DEFAULT_RETRY_CAP;
use crate::retry::Backoff;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    /// Repetible sin cambiar el resultado observable.
    Idempotent,
    /// A lo sumo una vez por periodo; protegido por un `SubmissionMarker`.
    EffectfulOnce,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criticality {
    Critical,
    NonCritical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepPolicy {
    pub effect: Effect,
    pub criticality: Criticality,
    /// Reintentos adicionales ante errores transitorios. Siempre 0 para
    /// `EffectfulOnce`.
    pub retry_cap: u32,
    pub backoff: Backoff,
}

impl StepPolicy {
    pub fn idempotent(criticality: Criticality) -> Self {
        Self { effect: Effect::Idempotent,
               criticality,
               retry_cap: DEFAULT_RETRY_CAP,
               backoff: Backoff::default() }
    }

    pub fn effectful_once() -> Self {
        Self { effect: Effect::EffectfulOnce,
               criticality: Criticality::Critical,
               retry_cap: 0,
               backoff: Backoff::none() }
    }

    pub fn with_retry_cap(mut self, retry_cap: u32) -> Self {
        self.retry_cap = retry_cap;
        self
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        match self.effect {
            Effect::Idempotent => 1 + self.retry_cap,
            Effect::EffectfulOnce => 1,
        }
    }

    pub fn is_critical(&self) -> bool {
        self.criticality == Criticality::Critical
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepSpec {
    pub kind: StepKind,
    pub policy: StepPolicy,
}

impl StepSpec {
    pub fn new(kind: StepKind, policy: StepPolicy) -> Self {
        Self { kind, policy }
    }

    pub fn standard(kind: StepKind) -> Self {
        Self::new(kind, kind.default_policy())
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }
}
