//! Decide, antes de cualquier step, si la credencial persistida es usable.
use chrono::{DateTime, Utc};
use log::{debug, info, warn};

use super::SessionState;
use crate::model::Credential;
use crate::providers::{ProbeError, SiteSession};

pub struct SessionGuard<'a> {
    site: &'a dyn SiteSession,
}

impl<'a> SessionGuard<'a> {
    pub fn new(site: &'a dyn SiteSession) -> Self {
        Self { site }
    }

    /// Política:
    /// - ausente → `Expired`
    /// - mal formada → `Invalid` (sin probe)
    /// - probe ok → `Valid`; rechazo de auth → `Expired`; otro fallo → `Unknown`
    ///
    /// La expiración estimada es sólo una pista para el log: una cookie
    /// auxiliar vencida no invalida la sesión, sólo el sitio puede hacerlo.
    /// Nunca devuelve `Valid` sin un probe exitoso.
    pub fn evaluate(&self, credential: Option<&Credential>, now: DateTime<Utc>) -> SessionState {
        let Some(credential) = credential else {
            debug!("no credential stored");
            return SessionState::Expired;
        };
        if !credential.is_well_formed() {
            warn!("stored credential is malformed");
            return SessionState::Invalid;
        }
        if credential.is_expired_at(now) {
            info!("credential expiry estimate has passed; probing anyway");
        }
        match self.site.probe(credential) {
            Ok(()) => SessionState::Valid,
            Err(ProbeError::AuthRejected(reason)) => {
                warn!("liveness probe rejected the credential: {reason}");
                SessionState::Expired
            }
            Err(ProbeError::Transient(reason)) => {
                warn!("liveness probe inconclusive: {reason}");
                SessionState::Unknown
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedSite;
    use chrono::Duration;
    use serde_json::json;

    fn cred() -> Credential {
        Credential::new(json!({"cookies": [{"name": "pid", "value": "1"}]}), Utc::now())
    }

    #[test]
    fn absent_credential_is_expired_without_probe() {
        let site = ScriptedSite::accepting();
        assert_eq!(SessionGuard::new(&site).evaluate(None, Utc::now()), SessionState::Expired);
        assert_eq!(site.calls().count("probe"), 0);
    }

    #[test]
    fn probe_outcomes_map_to_states() {
        let ok = ScriptedSite::accepting();
        assert_eq!(SessionGuard::new(&ok).evaluate(Some(&cred()), Utc::now()), SessionState::Valid);

        let rejected = ScriptedSite::rejecting("401");
        assert_eq!(SessionGuard::new(&rejected).evaluate(Some(&cred()), Utc::now()), SessionState::Expired);

        let flaky = ScriptedSite::unreachable("connection reset");
        assert_eq!(SessionGuard::new(&flaky).evaluate(Some(&cred()), Utc::now()), SessionState::Unknown);
    }

    #[test]
    fn malformed_credential_skips_the_probe() {
        let site = ScriptedSite::accepting();
        let now = Utc::now();
        let malformed = Credential::new(json!({"cookies": []}), now);
        assert_eq!(SessionGuard::new(&site).evaluate(Some(&malformed), now), SessionState::Invalid);
        assert_eq!(site.calls().count("probe"), 0);
    }

    #[test]
    fn past_expiry_estimate_is_decided_by_the_probe() {
        let now = Utc::now();
        let stale = cred().with_expiry(now - Duration::hours(1));

        let ok = ScriptedSite::accepting();
        assert_eq!(SessionGuard::new(&ok).evaluate(Some(&stale), now), SessionState::Valid);
        assert_eq!(ok.calls().count("probe"), 1);

        let rejected = ScriptedSite::rejecting("401");
        assert_eq!(SessionGuard::new(&rejected).evaluate(Some(&stale), now), SessionState::Expired);

        let flaky = ScriptedSite::unreachable("timeout");
        assert_eq!(SessionGuard::new(&flaky).evaluate(Some(&stale), now), SessionState::Unknown);
    }
}
