//! Steps de dominio como programas externos (JSON por stdin/stdout).
use log::debug;
use pick_core::providers::{MatchupExtractor, PickSubmitter, Predictor, PreviewPublisher, PreviewRenderer};
use pick_core::{Credential, MatchupSet, PredictionSet, PreviewArtifact, StepError, SubmissionReceipt};
use serde::Serialize;
use serde_json::Value;

use crate::command::{CommandError, CommandSpec};

/// Input del programa de envío.
#[derive(Debug, Serialize)]
pub struct SubmitRequest<'a> {
    pub credential: &'a Credential,
    pub picks: &'a PredictionSet,
}

pub struct CommandExtractor {
    spec: CommandSpec,
}

impl CommandExtractor {
    pub fn new(spec: CommandSpec) -> Self {
        Self { spec }
    }
}

impl MatchupExtractor for CommandExtractor {
    fn extract(&self, credential: &Credential) -> Result<MatchupSet, StepError> {
        debug!("extract via {}", self.spec.program);
        self.spec
            .run_json(credential, &[])
            .map_err(|e| e.into_step_error(StepError::Extraction))
    }
}

pub struct CommandPredictor {
    spec: CommandSpec,
}

impl CommandPredictor {
    pub fn new(spec: CommandSpec) -> Self {
        Self { spec }
    }
}

impl Predictor for CommandPredictor {
    fn predict(&self, matchups: &MatchupSet) -> Result<PredictionSet, StepError> {
        self.spec
            .run_json(matchups, &[])
            .map_err(|e| e.into_step_error(StepError::Prediction))
    }
}

/// Una invocación = un envío. El engine garantiza que no se repite.
pub struct CommandSubmitter {
    spec: CommandSpec,
}

impl CommandSubmitter {
    pub fn new(spec: CommandSpec) -> Self {
        Self { spec }
    }
}

impl PickSubmitter for CommandSubmitter {
    fn submit(&self, credential: &Credential, picks: &PredictionSet) -> Result<SubmissionReceipt, StepError> {
        let request = SubmitRequest { credential, picks };
        self.spec
            .run_json(&request, &[])
            .map_err(|e| e.into_step_error(StepError::Submission))
    }
}

pub struct CommandRenderer {
    spec: CommandSpec,
}

impl CommandRenderer {
    pub fn new(spec: CommandSpec) -> Self {
        Self { spec }
    }
}

impl PreviewRenderer for CommandRenderer {
    fn render(&self, picks: &PredictionSet) -> Result<PreviewArtifact, StepError> {
        self.spec
            .run_json(picks, &[])
            .map_err(|e| e.into_step_error(StepError::Render))
    }
}

pub struct CommandPublisher {
    spec: CommandSpec,
}

impl CommandPublisher {
    pub fn new(spec: CommandSpec) -> Self {
        Self { spec }
    }
}

impl PreviewPublisher for CommandPublisher {
    fn publish(&self, preview: &PreviewArtifact) -> Result<(), StepError> {
        // stdout vacío o no-JSON es válido: sólo importa el código de salida
        match self.spec.run_json::<_, Value>(preview, &[]) {
            Ok(_) | Err(CommandError::Decode { .. }) => Ok(()),
            Err(e) => Err(e.into_step_error(StepError::Publish)),
        }
    }
}
