use crate::constants::{AUTH_STEP, STORE_STEP};
use crate::errors::StepError;
use crate::model::Credential;
use crate::session::SessionState;

/// Precondición del pipeline: el estado de sesión evaluado y, si es `Valid`,
/// la credencial que lo respalda.
#[derive(Debug, Clone)]
pub struct Session {
    pub state: SessionState,
    pub credential: Option<Credential>,
    /// Por qué la sesión no llegó a `Valid`, si se sabe.
    pub blockage: Option<Blockage>,
}

/// Causa de un run que no pudo empezar; se registra como resultado sintético.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blockage {
    pub step: &'static str,
    pub error: StepError,
}

impl Blockage {
    pub fn auth(error: StepError) -> Self {
        Self { step: AUTH_STEP, error }
    }

    pub fn store(error: StepError) -> Self {
        Self { step: STORE_STEP, error }
    }
}

impl Session {
    pub fn valid(credential: Credential) -> Self {
        Self { state: SessionState::Valid,
               credential: Some(credential),
               blockage: None }
    }

    pub fn blocked(state: SessionState, blockage: Blockage) -> Self {
        Self { state,
               credential: None,
               blockage: Some(blockage) }
    }

    /// Estado sin causa explícita (usado por tests y por `check`).
    pub fn from_state(state: SessionState) -> Self {
        Self { state,
               credential: None,
               blockage: None }
    }

    /// Bloqueo a registrar si el estado no es `Valid`.
    pub fn blockage_or_default(&self) -> Blockage {
        match &self.blockage {
            Some(b) => b.clone(),
            None => Blockage::auth(StepError::Auth(format!("session is {}", self.state))),
        }
    }
}
