//! Wiring de stores y adaptadores concretos, y los casos de uso de la CLI.
use std::time::Duration;

use chrono::Utc;
use log::{error, info};
use pick_adapters::{CommandExtractor, CommandNotifier, CommandPredictor, CommandPublisher, CommandRenderer, CommandSite,
                    CommandSpec, CommandSubmitter, LogNotifier};
use pick_core::notify::deliver;
use pick_core::retry::Backoff;
use pick_core::{Authenticator, Credential, ErrorKind, FanoutNotifier, LoginPolicy, Notification, Orchestrator, PipelineDefinition, PipelineEngine,
                PipelineRun, Providers, RunLog, SessionGuard, SessionState, SessionStore};
use pick_persistence::{FileMarkerStore, FileSessionStore, JsonlRunLog, RunLock};

use crate::config::AppConfig;
use crate::errors::AppError;

pub type FileOrchestrator = Orchestrator<FileSessionStore, FileMarkerStore, JsonlRunLog>;

const NOTIFY_TIMEOUT: Duration = Duration::from_secs(30);

fn spec(var: &'static str, line: Option<&str>, timeout: Duration) -> Result<CommandSpec, AppError> {
    let line = line.ok_or_else(|| AppError::config(var, "required but not set"))?;
    CommandSpec::parse(line, timeout).map_err(|e| AppError::config(var, e.to_string()))
}

pub fn build_site(cfg: &AppConfig) -> Result<CommandSite, AppError> {
    let c = &cfg.commands;
    Ok(CommandSite::new(spec("PICKFLOW_PROBE_CMD", c.probe.as_deref(), cfg.step_timeout)?,
                        spec("PICKFLOW_LOGIN_CMD", c.login.as_deref(), cfg.login.wait)?))
}

pub fn build_providers(cfg: &AppConfig) -> Result<Providers, AppError> {
    let c = &cfg.commands;
    let t = cfg.step_timeout;
    Ok(Providers { extractor: Box::new(CommandExtractor::new(spec("PICKFLOW_EXTRACT_CMD", c.extract.as_deref(), t)?)),
                   predictor: Box::new(CommandPredictor::new(spec("PICKFLOW_PREDICT_CMD", c.predict.as_deref(), t)?)),
                   submitter: Box::new(CommandSubmitter::new(spec("PICKFLOW_SUBMIT_CMD", c.submit.as_deref(), t)?)),
                   renderer: Box::new(CommandRenderer::new(spec("PICKFLOW_RENDER_CMD", c.render.as_deref(), t)?)),
                   publisher: Box::new(CommandPublisher::new(spec("PICKFLOW_PUBLISH_CMD", c.publish.as_deref(), t)?)) })
}

pub fn build_notifier(cfg: &AppConfig) -> Result<FanoutNotifier, AppError> {
    let notifier = FanoutNotifier::new().with_sink(Box::new(LogNotifier));
    match cfg.commands.notify.as_deref() {
        Some(line) => {
            let cmd = spec("PICKFLOW_NOTIFY_CMD", Some(line), NOTIFY_TIMEOUT)?;
            Ok(notifier.with_sink(Box::new(CommandNotifier::new(cmd))))
        }
        None => Ok(notifier),
    }
}

pub fn build_orchestrator(cfg: &AppConfig) -> Result<FileOrchestrator, AppError> {
    let definition = PipelineDefinition::standard_with(cfg.retry_cap, Backoff::new(cfg.backoff_ms));
    let engine = PipelineEngine::builder(build_providers(cfg)?, FileMarkerStore::new(cfg.store.markers_dir())).definition(definition)
                                                                                                           .build();
    let orchestrator = Orchestrator::new(Box::new(build_site(cfg)?),
                                         FileSessionStore::new(cfg.store.credential_path()),
                                         engine,
                                         JsonlRunLog::new(cfg.store.run_log_path()),
                                         Box::new(build_notifier(cfg)?)).with_login_policy(cfg.login.clone());
    Ok(match &cfg.reauth_hint {
        Some(hint) => orchestrator.with_reauth_hint(hint.clone()),
        None => orchestrator,
    })
}

/// Entrada del scheduler: un run bajo el lock de run. Un fallo antes del
/// run (wiring, lock) también se notifica; el orquestador ya notificó los
/// runs que sí empezaron.
pub fn run_scheduled(cfg: &AppConfig) -> Result<PipelineRun, AppError> {
    let result = build_orchestrator(cfg).and_then(|mut orchestrator| {
                                            let _lock = RunLock::acquire(&cfg.store.lock_path(), cfg.store.lock_stale_after)?;
                                            Ok(orchestrator.run_once()?)
                                        });
    if let Err(e) = &result {
        alert_not_started(cfg.commands.notify.as_deref(), e);
    }
    result
}

/// Notifica un run que no llegó a empezar. Con `notify_cmd` inutilizable la
/// alerta queda sólo en el log.
pub fn alert_not_started(notify_cmd: Option<&str>, err: &AppError) {
    if matches!(err, AppError::RunLog(_)) {
        return;
    }
    let mut sinks = FanoutNotifier::new().with_sink(Box::new(LogNotifier));
    if let Some(line) = notify_cmd {
        match CommandSpec::parse(line, NOTIFY_TIMEOUT) {
            Ok(cmd) => sinks = sinks.with_sink(Box::new(CommandNotifier::new(cmd))),
            Err(e) => error!("PICKFLOW_NOTIFY_CMD unusable: {e}"),
        }
    }
    let (kind, hint) = match err {
        AppError::AlreadyRunning(_) => {
            (ErrorKind::Io, Some("another pickflow run holds the lock; it is released when that run ends".to_string()))
        }
        AppError::Config { var, .. } => (ErrorKind::Internal, Some(format!("fix {var} in the environment or .env"))),
        AppError::Store(_) => (ErrorKind::Io, Some("check the state directory".to_string())),
        AppError::Login(_) => (ErrorKind::Auth, Some("run `pickflow login`".to_string())),
        AppError::RunLog(_) => (ErrorKind::Io, None),
    };
    deliver(&sinks, &Notification::not_started(err.to_string(), kind, hint));
}

/// Login interactivo explícito; respeta espera e intentos configurados.
pub fn login(cfg: &AppConfig) -> Result<Credential, AppError> {
    let site = build_site(cfg)?;
    let mut store = FileSessionStore::new(cfg.store.credential_path());
    let _lock = RunLock::acquire(&cfg.store.lock_path(), cfg.store.lock_stale_after)?;
    let policy = LoginPolicy { interactive: true,
                               ..cfg.login.clone() };
    let credential = Authenticator::new(&site, policy).login(&mut store, Utc::now())?;
    info!("credential stored at {}", store.path().display());
    Ok(credential)
}

/// Evalúa la credencial persistida sin ejecutar el pipeline.
pub fn check(cfg: &AppConfig) -> Result<SessionState, AppError> {
    let site = build_site(cfg)?;
    let stored = FileSessionStore::new(cfg.store.credential_path()).load()?;
    Ok(SessionGuard::new(&site).evaluate(stored.as_ref(), Utc::now()))
}

pub fn history(cfg: &AppConfig, limit: usize) -> Result<Vec<PipelineRun>, AppError> {
    Ok(JsonlRunLog::new(cfg.store.run_log_path()).recent(limit)?)
}

/// Una línea por run: `<id> <outcome> [periodo] step=STATUS ...`.
pub fn summarize(run: &PipelineRun) -> String {
    let steps: Vec<String> = run.steps().iter().map(|r| format!("{}={}", r.step, r.status)).collect();
    match run.period() {
        Some(period) => format!("{} {} [{}] {}", run.id(), run.outcome(), period, steps.join(" ")),
        None => format!("{} {} {}", run.id(), run.outcome(), steps.join(" ")),
    }
}
