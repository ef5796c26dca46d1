//! Fakes guionados para tests (feature `test-support`).
//!
//! Todos los colaboradores comparten un `CallLog` para poder verificar el
//! orden de invocación entre sesión y steps.
use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use serde_json::json;

use crate::errors::StepError;
use crate::model::{Credential, Matchup, MatchupSet, Period, Pick, PredictionSet, PreviewArtifact, SubmissionReceipt};
use crate::notify::{Notification, NotificationSink, NotifyError, Severity};
use crate::providers::{LoginError, MatchupExtractor, PickSubmitter, Predictor, PreviewPublisher, PreviewRenderer, ProbeError,
                       Providers, SiteSession};
use crate::run::RunOutcome;

/// Registro compartido de invocaciones, en orden.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Rc<RefCell<Vec<String>>>);

impl CallLog {
    pub fn push(&self, name: &str) {
        self.0.borrow_mut().push(name.to_string());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.0.borrow().iter().filter(|c| *c == name).count()
    }

    /// Índice de la primera invocación de `name`.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.0.borrow().iter().position(|c| c == name)
    }
}

/// Respuestas encoladas y, agotada la cola, una respuesta por defecto.
#[derive(Debug)]
pub struct Script<T, E> {
    queue: VecDeque<Result<T, E>>,
    fallback: Result<T, E>,
}

impl<T: Clone, E: Clone> Script<T, E> {
    pub fn new(fallback: Result<T, E>) -> Self {
        Self { queue: VecDeque::new(),
               fallback }
    }

    pub fn next(&mut self) -> Result<T, E> {
        self.queue.pop_front().unwrap_or_else(|| self.fallback.clone())
    }
}

/// Colaborador de step guionado; `name` es lo que registra en el `CallLog`.
#[derive(Debug)]
pub struct Scripted<T> {
    name: &'static str,
    calls: CallLog,
    script: RefCell<Script<T, StepError>>,
}

impl<T: Clone> Scripted<T> {
    pub fn new(name: &'static str, calls: &CallLog, fallback: Result<T, StepError>) -> Self {
        Self { name,
               calls: calls.clone(),
               script: RefCell::new(Script::new(fallback)) }
    }

    pub fn set_fallback(&mut self, fallback: Result<T, StepError>) {
        self.script.get_mut().fallback = fallback;
    }

    /// Las próximas `times` invocaciones fallan con `err`.
    pub fn fail_times(&mut self, times: usize, err: StepError) {
        for _ in 0..times {
            self.script.get_mut().queue.push_back(Err(err.clone()));
        }
    }

    fn call(&self) -> Result<T, StepError> {
        self.calls.push(self.name);
        self.script.borrow_mut().next()
    }
}

impl MatchupExtractor for Scripted<MatchupSet> {
    fn extract(&self, _credential: &Credential) -> Result<MatchupSet, StepError> {
        self.call()
    }
}

impl Predictor for Scripted<PredictionSet> {
    fn predict(&self, _matchups: &MatchupSet) -> Result<PredictionSet, StepError> {
        self.call()
    }
}

impl PickSubmitter for Scripted<SubmissionReceipt> {
    fn submit(&self, _credential: &Credential, _picks: &PredictionSet) -> Result<SubmissionReceipt, StepError> {
        self.call()
    }
}

impl PreviewRenderer for Scripted<PreviewArtifact> {
    fn render(&self, _picks: &PredictionSet) -> Result<PreviewArtifact, StepError> {
        self.call()
    }
}

impl PreviewPublisher for Scripted<()> {
    fn publish(&self, _preview: &PreviewArtifact) -> Result<(), StepError> {
        self.call()
    }
}

/// Los cinco colaboradores de dominio, guionados.
pub struct Scripts {
    pub extract: Scripted<MatchupSet>,
    pub predict: Scripted<PredictionSet>,
    pub submit: Scripted<SubmissionReceipt>,
    pub render: Scripted<PreviewArtifact>,
    pub publish: Scripted<()>,
    predictions: PredictionSet,
}

impl Scripts {
    /// Todo tiene éxito: `games` partidos, el local siempre gana.
    pub fn happy(calls: &CallLog, period: Period, games: usize) -> Self {
        let matchups = sample_matchups(period.clone(), games);
        let predictions = home_picks(&matchups);
        let receipt = SubmissionReceipt { period: period.clone(),
                                          picks_submitted: games,
                                          submitted_at: Utc::now(),
                                          confirmation: Some("CONF-1".to_string()) };
        let preview = PreviewArtifact { period,
                                        files: vec![PathBuf::from("preview.png")] };
        Self { extract: Scripted::new("extract", calls, Ok(matchups)),
               predict: Scripted::new("predict", calls, Ok(predictions.clone())),
               submit: Scripted::new("submit", calls, Ok(receipt)),
               render: Scripted::new("render", calls, Ok(preview)),
               publish: Scripted::new("publish", calls, Ok(())),
               predictions }
    }

    /// Las predicciones que `predict` devuelve por defecto.
    pub fn predictions(&self) -> PredictionSet {
        self.predictions.clone()
    }

    pub fn into_providers(self) -> Providers {
        Providers { extractor: Box::new(self.extract),
                    predictor: Box::new(self.predict),
                    submitter: Box::new(self.submit),
                    renderer: Box::new(self.render),
                    publisher: Box::new(self.publish) }
    }
}

/// Sitio guionado: probe y login registran `probe`/`login`.
#[derive(Debug)]
pub struct ScriptedSite {
    calls: CallLog,
    probe: RefCell<Script<(), ProbeError>>,
    login: RefCell<Script<Credential, LoginError>>,
}

impl ScriptedSite {
    fn with_probe(fallback: Result<(), ProbeError>) -> Self {
        Self { calls: CallLog::default(),
               probe: RefCell::new(Script::new(fallback)),
               login: RefCell::new(Script::new(Ok(login_credential()))) }
    }

    pub fn accepting() -> Self {
        Self::with_probe(Ok(()))
    }

    pub fn rejecting(reason: &str) -> Self {
        Self::with_probe(Err(ProbeError::AuthRejected(reason.to_string())))
    }

    pub fn unreachable(reason: &str) -> Self {
        Self::with_probe(Err(ProbeError::Transient(reason.to_string())))
    }

    /// Encola una respuesta de probe previa a la de por defecto.
    pub fn queue_probe(self, response: Result<(), ProbeError>) -> Self {
        self.probe.borrow_mut().queue.push_back(response);
        self
    }

    pub fn with_login_failure(self, err: LoginError) -> Self {
        self.login.borrow_mut().fallback = Err(err);
        self
    }

    pub fn sharing(mut self, calls: &CallLog) -> Self {
        self.calls = calls.clone();
        self
    }

    pub fn calls(&self) -> &CallLog {
        &self.calls
    }
}

impl SiteSession for ScriptedSite {
    fn probe(&self, _credential: &Credential) -> Result<(), ProbeError> {
        self.calls.push("probe");
        self.probe.borrow_mut().next()
    }

    fn login(&self, _wait: Duration) -> Result<Credential, LoginError> {
        self.calls.push("login");
        self.login.borrow_mut().next()
    }
}

/// Guarda cada notificación; opcionalmente falla después de guardarla.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    sent: Rc<RefCell<Vec<Notification>>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self { sent: Rc::default(),
               fail: true }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.borrow().clone()
    }

    pub fn sample() -> Notification {
        Notification { severity: Severity::Info,
                       title: "pickflow: run succeeded".to_string(),
                       message: "5 step(s) completed".to_string(),
                       subtitle: None,
                       action_hint: None,
                       failed_step: None,
                       error_kind: None,
                       run_id: "20240912T143005Z-00000000".to_string(),
                       outcome: RunOutcome::Success }
    }
}

impl NotificationSink for RecordingNotifier {
    fn name(&self) -> &str {
        "recording"
    }

    fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.sent.borrow_mut().push(notification.clone());
        if self.fail {
            return Err(NotifyError::Delivery { sink: "recording".to_string(),
                                               reason: "scripted failure".to_string() });
        }
        Ok(())
    }
}

pub fn sample_matchups(period: Period, games: usize) -> MatchupSet {
    let matchups = (1..=games).map(|i| Matchup::new(format!("AWAY{i}"), format!("HOME{i}"))).collect();
    MatchupSet { period, matchups }
}

pub fn home_picks(matchups: &MatchupSet) -> PredictionSet {
    let picks = matchups.matchups
                        .iter()
                        .map(|m| Pick { away_team: m.away_team.clone(),
                                        home_team: m.home_team.clone(),
                                        winner: m.home_team.clone() })
                        .collect();
    PredictionSet { period: matchups.period.clone(),
                    picks }
}

/// Credencial bien formada, obtenida ahora, vigente 30 días.
pub fn fresh_credential() -> Credential {
    let now = Utc::now();
    Credential::new(json!({"cookies": [{"name": "pid", "value": "stored"}]}), now).with_expiry(now + ChronoDuration::days(30))
}

fn login_credential() -> Credential {
    Credential::new(json!({"cookies": [{"name": "pid", "value": "fresh"}]}), Utc::now())
}
