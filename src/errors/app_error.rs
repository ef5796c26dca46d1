use pick_core::{AuthError, OrchestratorError, StoreError};
use pick_persistence::PersistenceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Error de configuración en {var}: {reason}")]
    Config { var: &'static str, reason: String },
    #[error("Error de almacenamiento: {0}")]
    Store(#[from] StoreError),
    #[error("Otro run está en curso: {0}")]
    AlreadyRunning(String),
    #[error("Login fallido: {0}")]
    Login(#[from] AuthError),
    #[error("Run ejecutado pero no registrado: {0}")]
    RunLog(#[from] OrchestratorError),
}

impl AppError {
    pub fn config(var: &'static str, reason: impl Into<String>) -> Self {
        Self::Config { var,
                       reason: reason.into() }
    }

    /// Código de salida de la CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::AlreadyRunning(_) => 4,
            AppError::Login(_) => 1,
            AppError::Config { .. } | AppError::Store(_) | AppError::RunLog(_) => 5,
        }
    }
}

impl From<PersistenceError> for AppError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::Locked { .. } => AppError::AlreadyRunning(err.to_string()),
            other => AppError::Store(other.into()),
        }
    }
}
