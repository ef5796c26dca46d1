//! Taxonomía de errores del core.
//!
//! - `StepError`: fallo de un step (o de la sesión) tal como queda sellado en
//!   un `StepResult`. Serializable porque viaja dentro del `RunLog`.
//! - `StoreError`: contrato de error de todos los almacenes (credencial,
//!   marcadores, historial).
//! - `DefinitionError`: definiciones de pipeline inválidas.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tipo de error de origen, reportado en notificaciones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Auth,
    Transient,
    Timeout,
    Extraction,
    Prediction,
    Submission,
    Render,
    Publish,
    Io,
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Auth => "auth",
            ErrorKind::Transient => "transient",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Extraction => "extraction",
            ErrorKind::Prediction => "prediction",
            ErrorKind::Submission => "submission",
            ErrorKind::Render => "render",
            ErrorKind::Publish => "publish",
            ErrorKind::Io => "io",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum StepError {
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("transient failure: {0}")]
    Transient(String),
    #[error("timed out after {0} ms")]
    Timeout(u64),
    #[error("extraction failed: {0}")]
    Extraction(String),
    #[error("prediction failed: {0}")]
    Prediction(String),
    #[error("submission failed: {0}")]
    Submission(String),
    #[error("render failed: {0}")]
    Render(String),
    #[error("publish failed: {0}")]
    Publish(String),
    #[error("local persistence failed: {0}")]
    Io(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl StepError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StepError::Auth(_) => ErrorKind::Auth,
            StepError::Transient(_) => ErrorKind::Transient,
            StepError::Timeout(_) => ErrorKind::Timeout,
            StepError::Extraction(_) => ErrorKind::Extraction,
            StepError::Prediction(_) => ErrorKind::Prediction,
            StepError::Submission(_) => ErrorKind::Submission,
            StepError::Render(_) => ErrorKind::Render,
            StepError::Publish(_) => ErrorKind::Publish,
            StepError::Io(_) => ErrorKind::Io,
            StepError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Sólo los fallos transitorios (red, timeout) se reintentan.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StepError::Transient(_) | StepError::Timeout(_))
    }
}

impl From<StoreError> for StepError {
    fn from(err: StoreError) -> Self {
        StepError::Io(err.to_string())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(String),
    #[error("corrupt record: {0}")]
    Corrupt(String),
    #[error("record already exists: {0}")]
    Conflict(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("pipeline has no steps")]
    Empty,
    #[error("step `{0}` declared more than once")]
    DuplicateStep(&'static str),
    #[error("step `{step}` requires {payload} but no earlier step produces it")]
    MissingProducer { step: &'static str, payload: &'static str },
    #[error("critical step `{step}` cannot follow non-critical step `{after}`")]
    CriticalAfterNonCritical { step: &'static str, after: &'static str },
    #[error("step `{0}` has a remote side effect and must be effectful-once")]
    UnguardedSideEffect(&'static str),
    #[error("step `{0}` cannot be effectful-once: only submission is guarded by a marker")]
    UnsupportedEffectfulOnce(&'static str),
    #[error("effectful-once step `{0}` cannot declare retries")]
    RetriesOnEffectful(&'static str),
}
