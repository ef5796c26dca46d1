//! Colaboradores externos consumidos por el core a través de interfaces
//! estrechas. Las implementaciones reales (navegador, scraping, heurística de
//! predicción, render, publicación) viven fuera de este crate.
use std::time::Duration;

use thiserror::Error;

use crate::errors::StepError;
use crate::model::{Credential, MatchupSet, PredictionSet, PreviewArtifact, SubmissionReceipt};

/// Resultado negativo de un probe de vida. La distinción importa: sólo un
/// rechazo de autenticación justifica pedir un login nuevo.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProbeError {
    #[error("authentication rejected: {0}")]
    AuthRejected(String),
    #[error("transient probe failure: {0}")]
    Transient(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoginError {
    #[error("login rejected: {0}")]
    Rejected(String),
    #[error("login not completed within {0:?}")]
    TimedOut(Duration),
    #[error("login unavailable: {0}")]
    Unavailable(String),
}

/// Sesión contra el sitio: probe autenticado ligero y login interactivo.
pub trait SiteSession {
    /// Una única lectura autenticada; no realiza trabajo del pipeline.
    fn probe(&self, credential: &Credential) -> Result<(), ProbeError>;

    /// Login interactivo. Puede bloquear esperando a un humano, como mucho
    /// `wait`.
    fn login(&self, wait: Duration) -> Result<Credential, LoginError>;
}

pub trait MatchupExtractor {
    fn extract(&self, credential: &Credential) -> Result<MatchupSet, StepError>;
}

/// Función pura de su input: siempre idempotente.
pub trait Predictor {
    fn predict(&self, matchups: &MatchupSet) -> Result<PredictionSet, StepError>;
}

/// NO idempotente del lado remoto: dos llamadas pueden duplicar el envío.
pub trait PickSubmitter {
    fn submit(&self, credential: &Credential, picks: &PredictionSet) -> Result<SubmissionReceipt, StepError>;
}

pub trait PreviewRenderer {
    fn render(&self, picks: &PredictionSet) -> Result<PreviewArtifact, StepError>;
}

pub trait PreviewPublisher {
    fn publish(&self, preview: &PreviewArtifact) -> Result<(), StepError>;
}

/// Conjunto de colaboradores de dominio que el engine despacha por step.
pub struct Providers {
    pub extractor: Box<dyn MatchupExtractor>,
    pub predictor: Box<dyn Predictor>,
    pub submitter: Box<dyn PickSubmitter>,
    pub renderer: Box<dyn PreviewRenderer>,
    pub publisher: Box<dyn PreviewPublisher>,
}
