//! Un run completo tal como lo dispara el scheduler:
//! store → guard → (login acotado) → pipeline → run log → notificación.
use chrono::Utc;
use log::{error, info, warn};
use thiserror::Error;

use super::{Blockage, PipelineEngine, Session};
use crate::errors::{StepError, StoreError};
use crate::marker::MarkerStore;
use crate::notify::{deliver, Notification, NotificationSink};
use crate::providers::SiteSession;
use crate::run::{PipelineRun, RunLog};
use crate::session::{AuthError, Authenticator, LoginPolicy, SessionGuard, SessionState, SessionStore};

#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// El run se ejecutó y se notificó, pero no quedó en el historial.
    #[error("sealed run could not be appended to the run log: {source}")]
    RunLog { run: Box<PipelineRun>, source: StoreError },
}

pub struct Orchestrator<S, M, L>
    where S: SessionStore,
          M: MarkerStore,
          L: RunLog
{
    site: Box<dyn SiteSession>,
    store: S,
    engine: PipelineEngine<M>,
    run_log: L,
    notifier: Box<dyn NotificationSink>,
    login: LoginPolicy,
    reauth_hint: Option<String>,
}

impl<S, M, L> Orchestrator<S, M, L>
    where S: SessionStore,
          M: MarkerStore,
          L: RunLog
{
    pub fn new(site: Box<dyn SiteSession>,
               store: S,
               engine: PipelineEngine<M>,
               run_log: L,
               notifier: Box<dyn NotificationSink>)
               -> Self {
        Self { site,
               store,
               engine,
               run_log,
               notifier,
               login: LoginPolicy::default(),
               reauth_hint: None }
    }

    pub fn with_login_policy(mut self, login: LoginPolicy) -> Self {
        self.login = login;
        self
    }

    pub fn with_reauth_hint(mut self, hint: impl Into<String>) -> Self {
        self.reauth_hint = Some(hint.into());
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn markers(&self) -> &M {
        self.engine.markers()
    }

    pub fn run_log(&self) -> &L {
        &self.run_log
    }

    /// Punto de entrada del scheduler. Siempre produce un `PipelineRun`
    /// sellado y notifica; sólo falla si el run no pudo registrarse.
    pub fn run_once(&mut self) -> Result<PipelineRun, OrchestratorError> {
        let session = self.establish_session();
        let run = self.engine.run(&session);

        let logged = self.run_log.append(&run);
        if let Err(e) = &logged {
            error!("run {} not appended to run log: {e}", run.id());
        }
        deliver(self.notifier.as_ref(), &Notification::for_run(&run, self.reauth_hint.as_deref()));

        match logged {
            Ok(()) => Ok(run),
            Err(source) => Err(OrchestratorError::RunLog { run: Box::new(run),
                                                           source }),
        }
    }

    fn establish_session(&mut self) -> Session {
        let now = Utc::now();
        let stored = match self.store.load() {
            Ok(c) => c,
            Err(e) => {
                error!("credential store unreadable: {e}");
                return Session::blocked(SessionState::Unknown, Blockage::store(e.into()));
            }
        };
        let guard = SessionGuard::new(self.site.as_ref());
        let state = guard.evaluate(stored.as_ref(), now);
        info!("session evaluated as {state}");

        match (state, stored) {
            (SessionState::Valid, Some(credential)) => Session::valid(credential),
            (SessionState::Valid, None) => {
                Session::blocked(state, Blockage::auth(StepError::Internal("VALID without credential".to_string())))
            }
            (state, _) if !state.needs_login() => {
                let err = StepError::Transient("liveness probe inconclusive; credential kept, run halted".to_string());
                Session::blocked(state, Blockage::auth(err))
            }
            (state, _) => {
                if let Err(e) = self.store.clear() {
                    error!("could not clear stale credential: {e}");
                    return Session::blocked(state, Blockage::store(e.into()));
                }
                let mut auth = Authenticator::new(self.site.as_ref(), self.login.clone());
                let fresh = match auth.login(&mut self.store, now) {
                    Ok(c) => c,
                    Err(AuthError::Store(e)) => return Session::blocked(state, Blockage::store(e.into())),
                    Err(e) => {
                        error!("reauthentication failed: {e}");
                        return Session::blocked(state, Blockage::auth(e.into_step_error()));
                    }
                };
                let again = guard.evaluate(Some(&fresh), Utc::now());
                if again.is_valid() {
                    Session::valid(fresh)
                } else {
                    warn!("fresh credential evaluated as {again}");
                    let err = StepError::Auth(format!("fresh credential evaluated as {again}"));
                    Session::blocked(again, Blockage::auth(err))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{AUTH_STEP, STORE_STEP};
    use crate::errors::ErrorKind;
    use crate::marker::InMemoryMarkerStore;
    use crate::model::{Credential, Period};
    use crate::notify::Severity;
    use crate::providers::ProbeError;
    use crate::retry::NoSleep;
    use crate::run::{InMemoryRunLog, RunOutcome};
    use crate::session::InMemorySessionStore;
    use crate::testing::{fresh_credential, CallLog, RecordingNotifier, ScriptedSite, Scripts};

    type TestOrchestrator = Orchestrator<InMemorySessionStore, InMemoryMarkerStore, InMemoryRunLog>;

    fn build(site: ScriptedSite, store: InMemorySessionStore, calls: &CallLog, notifier: &RecordingNotifier) -> TestOrchestrator {
        let engine = PipelineEngine::builder(Scripts::happy(calls, Period::new("2024-2025", 3), 16).into_providers(),
                                             InMemoryMarkerStore::new()).sleeper(Box::new(NoSleep))
                                                                        .build();
        Orchestrator::new(Box::new(site), store, engine, InMemoryRunLog::new(), Box::new(notifier.clone()))
    }

    #[test]
    fn unattended_run_without_credential_fails_loudly_at_authentication() {
        let calls = CallLog::default();
        let notifier = RecordingNotifier::default();
        let site = ScriptedSite::accepting().sharing(&calls);
        let mut orch = build(site, InMemorySessionStore::new(), &calls, &notifier)
            .with_reauth_hint("https://example.org/login");

        let run = orch.run_once().expect("run logged");
        assert_eq!(run.outcome(), RunOutcome::Failed);
        assert_eq!(run.steps().len(), 1);
        assert_eq!(run.steps()[0].step, AUTH_STEP);
        assert!(calls.entries().is_empty(), "no probe, login, or domain call expected");

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].severity, Severity::Alert);
        assert_eq!(sent[0].error_kind, Some(ErrorKind::Auth));
        assert_eq!(orch.run_log().runs().len(), 1);
    }

    #[test]
    fn probe_network_error_halts_without_reauthenticating() {
        let calls = CallLog::default();
        let notifier = RecordingNotifier::default();
        let site = ScriptedSite::unreachable("dns failure").sharing(&calls);
        let policy = LoginPolicy { interactive: true,
                                   ..LoginPolicy::default() };
        let mut orch = build(site, InMemorySessionStore::with_credential(fresh_credential()), &calls, &notifier)
            .with_login_policy(policy);

        let run = orch.run_once().expect("run logged");
        assert_eq!(run.session(), SessionState::Unknown);
        assert_eq!(run.outcome(), RunOutcome::Failed);
        assert_eq!(calls.count("login"), 0);
        assert_eq!(calls.count("extract"), 0);
        assert!(orch.store().load().expect("load").is_some(), "credential must be kept");
    }

    #[test]
    fn rejected_credential_is_replaced_by_one_interactive_login() {
        let calls = CallLog::default();
        let notifier = RecordingNotifier::default();
        let site = ScriptedSite::accepting().queue_probe(Err(ProbeError::AuthRejected("401".into())))
                                            .sharing(&calls);
        let policy = LoginPolicy { interactive: true,
                                   ..LoginPolicy::default() };
        let mut orch = build(site, InMemorySessionStore::with_credential(fresh_credential()), &calls, &notifier)
            .with_login_policy(policy);

        let run = orch.run_once().expect("run logged");
        assert_eq!(run.outcome(), RunOutcome::Success);
        assert_eq!(calls.count("login"), 1);
        assert_eq!(calls.count("probe"), 2);
        assert_eq!(orch.store().saves(), 1);
        assert_eq!(calls.position("login"), Some(1));
        assert!(calls.position("extract") > calls.position("login"));
    }

    #[test]
    fn second_login_failure_is_fatal_for_the_run() {
        let calls = CallLog::default();
        let notifier = RecordingNotifier::default();
        let site = ScriptedSite::rejecting("401").with_login_failure(crate::providers::LoginError::Rejected("mfa".into()))
                                                 .sharing(&calls);
        let policy = LoginPolicy { interactive: true,
                                   max_attempts: 2,
                                   ..LoginPolicy::default() };
        let mut orch = build(site, InMemorySessionStore::with_credential(fresh_credential()), &calls, &notifier)
            .with_login_policy(policy);

        let run = orch.run_once().expect("run logged");
        assert_eq!(run.outcome(), RunOutcome::Failed);
        assert_eq!(calls.count("login"), 2);
        assert_eq!(run.steps()[0].step, AUTH_STEP);
        assert_eq!(notifier.sent()[0].severity, Severity::Alert);
    }

    #[test]
    fn past_expiry_estimate_keeps_a_credential_the_site_accepts() {
        let calls = CallLog::default();
        let notifier = RecordingNotifier::default();
        let site = ScriptedSite::accepting().sharing(&calls);
        let stale = fresh_credential().with_expiry(Utc::now() - chrono::Duration::minutes(1));
        let mut orch = build(site, InMemorySessionStore::with_credential(stale.clone()), &calls, &notifier);

        let run = orch.run_once().expect("run logged");
        assert_eq!(run.session(), SessionState::Valid);
        assert_eq!(run.outcome(), RunOutcome::Success);
        assert_eq!(calls.count("probe"), 1);
        assert_eq!(calls.count("login"), 0);
        assert_eq!(orch.store().load().expect("load"), Some(stale));
    }

    #[test]
    fn notifier_failure_does_not_escape_the_run() {
        let calls = CallLog::default();
        let notifier = RecordingNotifier::failing();
        let site = ScriptedSite::accepting().sharing(&calls);
        let mut orch = build(site, InMemorySessionStore::with_credential(fresh_credential()), &calls, &notifier);

        let run = orch.run_once().expect("delivery failure is swallowed");
        assert_eq!(run.outcome(), RunOutcome::Success);
        assert_eq!(notifier.sent().len(), 1);
    }

    #[test]
    fn unreadable_store_is_pipeline_fatal() {
        struct BrokenStore;
        impl SessionStore for BrokenStore {
            fn load(&self) -> Result<Option<Credential>, StoreError> {
                Err(StoreError::Corrupt("credential.json".into()))
            }
            fn save(&mut self, _c: &Credential) -> Result<(), StoreError> {
                Err(StoreError::Io("read-only".into()))
            }
            fn clear(&mut self) -> Result<(), StoreError> {
                Ok(())
            }
        }

        let calls = CallLog::default();
        let notifier = RecordingNotifier::default();
        let engine = PipelineEngine::builder(Scripts::happy(&calls, Period::new("2024-2025", 3), 2).into_providers(),
                                             InMemoryMarkerStore::new()).sleeper(Box::new(NoSleep))
                                                                        .build();
        let mut orch = Orchestrator::new(Box::new(ScriptedSite::accepting()),
                                         BrokenStore,
                                         engine,
                                         InMemoryRunLog::new(),
                                         Box::new(notifier.clone()));

        let run = orch.run_once().expect("run logged");
        assert_eq!(run.steps()[0].step, STORE_STEP);
        assert_eq!(notifier.sent()[0].error_kind, Some(ErrorKind::Io));
        assert!(calls.entries().is_empty());
    }
}
