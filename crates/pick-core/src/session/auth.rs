//! Login interactivo acotado.
//!
//! Es un punto de suspensión explícito: puede requerir a un humano, espera
//! como mucho `LoginPolicy::wait` y nunca se invoca más de
//! `MAX_LOGIN_ATTEMPTS_PER_RUN` veces por run. En modo desatendido falla de
//! inmediato y de forma ruidosa (`HumanRequired`).
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{error, info, warn};
use thiserror::Error;

use super::SessionStore;
use crate::constants::MAX_LOGIN_ATTEMPTS_PER_RUN;
use crate::errors::{StepError, StoreError};
use crate::model::Credential;
use crate::providers::{LoginError, SiteSession};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("interactive login required but this run is unattended")]
    HumanRequired,
    #[error("login rejected: {0}")]
    Rejected(String),
    #[error("login not completed within {0:?}")]
    TimedOut(Duration),
    #[error("login attempts exhausted for this run ({0})")]
    AttemptsExhausted(u32),
    #[error("credential store failed: {0}")]
    Store(StoreError),
}

impl AuthError {
    pub fn into_step_error(self) -> StepError {
        match self {
            AuthError::Store(e) => e.into(),
            other => StepError::Auth(other.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoginPolicy {
    /// Si es `false` el run es desatendido y no se intenta login.
    pub interactive: bool,
    /// Intentos por run; se acota a `[1, MAX_LOGIN_ATTEMPTS_PER_RUN]`.
    pub max_attempts: u32,
    /// Espera máxima por intento.
    pub wait: Duration,
    /// Vida estimada si el sitio no informa expiración.
    pub credential_ttl: chrono::Duration,
}

impl Default for LoginPolicy {
    fn default() -> Self {
        Self { interactive: false,
               max_attempts: 1,
               wait: Duration::from_secs(600),
               credential_ttl: chrono::Duration::days(30) }
    }
}

impl LoginPolicy {
    pub fn attempts_allowed(&self) -> u32 {
        self.max_attempts.clamp(1, MAX_LOGIN_ATTEMPTS_PER_RUN)
    }
}

pub struct Authenticator<'a> {
    site: &'a dyn SiteSession,
    policy: LoginPolicy,
    attempts: u32,
}

impl<'a> Authenticator<'a> {
    pub fn new(site: &'a dyn SiteSession, policy: LoginPolicy) -> Self {
        Self { site,
               policy,
               attempts: 0 }
    }

    /// Invocaciones de login consumidas por esta instancia (una por run).
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Obtiene una credencial fresca y la delega a `store.save`.
    pub fn login(&mut self, store: &mut dyn SessionStore, now: DateTime<Utc>) -> Result<Credential, AuthError> {
        if !self.policy.interactive {
            error!("credential needs a fresh interactive login but the run is unattended");
            return Err(AuthError::HumanRequired);
        }
        let allowed = self.policy.attempts_allowed();
        let mut last = None;
        while self.attempts < allowed {
            self.attempts += 1;
            info!("interactive login attempt {}/{allowed} (waiting up to {:?})", self.attempts, self.policy.wait);
            match self.site.login(self.policy.wait) {
                Ok(credential) => {
                    let credential = self.stamp(credential, now);
                    store.save(&credential).map_err(AuthError::Store)?;
                    info!("fresh credential saved");
                    return Ok(credential);
                }
                Err(LoginError::TimedOut(wait)) => {
                    warn!("login attempt {} timed out after {wait:?}", self.attempts);
                    last = Some(AuthError::TimedOut(wait));
                }
                Err(e) => {
                    warn!("login attempt {} failed: {e}", self.attempts);
                    last = Some(AuthError::Rejected(e.to_string()));
                }
            }
        }
        Err(last.unwrap_or(AuthError::AttemptsExhausted(self.attempts)))
    }

    fn stamp(&self, credential: Credential, now: DateTime<Utc>) -> Credential {
        let credential = if credential.expires_at.is_none() {
            credential.with_expiry(now + self.policy.credential_ttl)
        } else {
            credential
        };
        credential.validated_at(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::InMemorySessionStore;
    use crate::testing::ScriptedSite;

    fn interactive(max_attempts: u32) -> LoginPolicy {
        LoginPolicy { interactive: true,
                      max_attempts,
                      ..LoginPolicy::default() }
    }

    #[test]
    fn unattended_run_never_calls_login() {
        let site = ScriptedSite::accepting();
        let mut store = InMemorySessionStore::new();
        let mut auth = Authenticator::new(&site, LoginPolicy::default());
        assert_eq!(auth.login(&mut store, Utc::now()), Err(AuthError::HumanRequired));
        assert_eq!(site.calls().count("login"), 0);
    }

    #[test]
    fn successful_login_is_saved_with_expiry_estimate() {
        let site = ScriptedSite::accepting();
        let mut store = InMemorySessionStore::new();
        let now = Utc::now();
        let cred = Authenticator::new(&site, interactive(1)).login(&mut store, now).expect("login");
        assert_eq!(cred.expires_at, Some(now + chrono::Duration::days(30)));
        assert_eq!(store.load().expect("load"), Some(cred));
        assert_eq!(store.saves(), 1);
    }

    #[test]
    fn attempts_are_capped_even_when_policy_asks_for_more() {
        let site = ScriptedSite::accepting().with_login_failure(LoginError::Rejected("captcha".into()));
        let mut store = InMemorySessionStore::new();
        let mut auth = Authenticator::new(&site, interactive(10));
        let err = auth.login(&mut store, Utc::now()).unwrap_err();
        assert_eq!(err, AuthError::Rejected("login rejected: captcha".into()));
        assert_eq!(auth.attempts(), MAX_LOGIN_ATTEMPTS_PER_RUN);
        assert_eq!(site.calls().count("login"), MAX_LOGIN_ATTEMPTS_PER_RUN as usize);

        // una segunda llamada en el mismo run no vuelve a invocar al sitio
        let again = auth.login(&mut store, Utc::now()).unwrap_err();
        assert_eq!(again, AuthError::AttemptsExhausted(MAX_LOGIN_ATTEMPTS_PER_RUN));
        assert_eq!(site.calls().count("login"), MAX_LOGIN_ATTEMPTS_PER_RUN as usize);
    }
}
