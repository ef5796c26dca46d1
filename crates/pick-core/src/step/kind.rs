use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Criticality, StepPolicy};
use crate::model::PayloadKind;

/// Los cinco steps del ciclo semanal, en su orden canónico.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Extract,
    Predict,
    Submit,
    Render,
    Publish,
}

impl StepKind {
    pub const ALL: [StepKind; 5] = [StepKind::Extract, StepKind::Predict, StepKind::Submit, StepKind::Render, StepKind::Publish];

    pub fn name(self) -> &'static str {
        match self {
            StepKind::Extract => "extract",
            StepKind::Predict => "predict",
            StepKind::Submit => "submit",
            StepKind::Render => "render",
            StepKind::Publish => "publish",
        }
    }

    /// Payloads que el step consume de steps previos.
    pub fn requires(self) -> &'static [PayloadKind] {
        match self {
            StepKind::Extract => &[],
            StepKind::Predict => &[PayloadKind::Matchups],
            StepKind::Submit => &[PayloadKind::Matchups, PayloadKind::Predictions],
            StepKind::Render => &[PayloadKind::Predictions],
            StepKind::Publish => &[PayloadKind::Preview],
        }
    }

    pub fn produces(self) -> Option<PayloadKind> {
        match self {
            StepKind::Extract => Some(PayloadKind::Matchups),
            StepKind::Predict => Some(PayloadKind::Predictions),
            StepKind::Submit => Some(PayloadKind::Receipt),
            StepKind::Render => Some(PayloadKind::Preview),
            StepKind::Publish => None,
        }
    }

    /// Sólo el envío de picks tiene un efecto remoto que no puede repetirse.
    pub fn has_remote_side_effect(self) -> bool {
        matches!(self, StepKind::Submit)
    }

    pub fn default_policy(self) -> StepPolicy {
        match self {
            StepKind::Extract | StepKind::Predict => StepPolicy::idempotent(Criticality::Critical),
            StepKind::Submit => StepPolicy::effectful_once(),
            StepKind::Render | StepKind::Publish => StepPolicy::idempotent(Criticality::NonCritical),
        }
    }

}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
