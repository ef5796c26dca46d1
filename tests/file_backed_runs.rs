//! Runs completos vía `app` contra programas `sh` y estado en disco.
#![cfg(unix)]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use pick_core::testing::fresh_credential;
use pick_core::{RunOutcome, SessionState, SessionStore, StepStatus};
use pick_persistence::{FileSessionStore, RunLock};
use pickflow::app;
use pickflow::config::AppConfig;
use pickflow::errors::AppError;

const PERIOD: &str = r#"{"season":"2024-2025","week":3}"#;

struct Fixture {
    dir: tempfile::TempDir,
}

impl Fixture {
    fn new() -> Self {
        let fx = Self { dir: tempfile::tempdir().expect("tempdir") };
        let matchups = format!(r#"{{"period":{PERIOD},"matchups":[{{"away_team":"SEAHAWKS","home_team":"LIONS"}},{{"away_team":"BEARS","home_team":"PACKERS"}}]}}"#);
        let picks = format!(r#"{{"period":{PERIOD},"picks":[{{"away_team":"SEAHAWKS","home_team":"LIONS","winner":"LIONS"}},{{"away_team":"BEARS","home_team":"PACKERS","winner":"BEARS"}}]}}"#);
        let receipt = format!(r#"{{"period":{PERIOD},"picks_submitted":2,"submitted_at":"2024-09-12T14:30:05Z","confirmation":"CONF-7"}}"#);
        let preview = format!(r#"{{"period":{PERIOD},"files":["preview.png"]}}"#);
        let submits = fx.path("submits.log");

        fx.script("probe.sh", "cat >/dev/null\nexit 0\n");
        fx.script("login.sh", &format!("echo login >> '{}'\nexit 1\n", fx.path("logins.log").display()));
        fx.script("extract.sh", &format!("cat >/dev/null\nprintf '%s' '{matchups}'\n"));
        fx.script("predict.sh", &format!("cat >/dev/null\nprintf '%s' '{picks}'\n"));
        fx.script("submit.sh",
                  &format!("cat >/dev/null\necho submitted >> '{}'\nprintf '%s' '{receipt}'\n", submits.display()));
        fx.script("render.sh", &format!("cat >/dev/null\nprintf '%s' '{preview}'\n"));
        fx.script("publish.sh", "cat >/dev/null\nexit 0\n");
        fx.script("notify.sh", &format!("cat >/dev/null\necho \"$1\" >> '{}'\n", fx.path("alerts.log").display()));
        fx
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn script(&self, name: &str, body: &str) {
        fs::write(self.path(name), body).expect("write script");
    }

    fn config(&self) -> AppConfig {
        let dir = self.dir.path().to_path_buf();
        AppConfig::from_vars(move |var: &str| {
            let cmd = |name: &str| Some(format!("sh {}", dir.join(name).display()));
            match var {
                "PICKFLOW_STATE_DIR" => Some(dir.join("state").display().to_string()),
                "PICKFLOW_BACKOFF_MS" => Some("0".to_string()),
                "PICKFLOW_STEP_TIMEOUT_SECS" => Some("10".to_string()),
                "PICKFLOW_REAUTH_HINT" => Some("run `pickflow login` on the desktop".to_string()),
                "PICKFLOW_PROBE_CMD" => cmd("probe.sh"),
                "PICKFLOW_LOGIN_CMD" => cmd("login.sh"),
                "PICKFLOW_EXTRACT_CMD" => cmd("extract.sh"),
                "PICKFLOW_PREDICT_CMD" => cmd("predict.sh"),
                "PICKFLOW_SUBMIT_CMD" => cmd("submit.sh"),
                "PICKFLOW_RENDER_CMD" => cmd("render.sh"),
                "PICKFLOW_PUBLISH_CMD" => cmd("publish.sh"),
                "PICKFLOW_NOTIFY_CMD" => cmd("notify.sh"),
                _ => None,
            }
        }).expect("config")
    }

    fn store_credential(&self, cfg: &AppConfig) {
        FileSessionStore::new(cfg.store.credential_path()).save(&fresh_credential())
                                                          .expect("seed credential");
    }

    fn lines(&self, name: &str) -> usize {
        read_lines(&self.path(name))
    }

    fn alerts(&self) -> Vec<String> {
        fs::read_to_string(self.path("alerts.log")).map(|s| s.lines().map(str::to_string).collect())
                                                   .unwrap_or_default()
    }
}

fn read_lines(path: &Path) -> usize {
    fs::read_to_string(path).map(|s| s.lines().count()).unwrap_or(0)
}

#[test]
fn second_scheduled_run_in_same_week_does_not_resubmit() {
    let fx = Fixture::new();
    let cfg = fx.config();
    fx.store_credential(&cfg);

    let first = app::run_scheduled(&cfg).expect("first run");
    assert_eq!(first.outcome(), RunOutcome::Success, "{}", app::summarize(&first));
    let second = app::run_scheduled(&cfg).expect("second run");
    assert_eq!(second.outcome(), RunOutcome::Success);
    assert_eq!(second.result_for("submit").map(|r| r.status), Some(StepStatus::Skipped));

    assert_eq!(fx.lines("submits.log"), 1);
    assert_eq!(fs::read_dir(cfg.store.markers_dir()).expect("markers dir").count(), 1);
    assert!(!cfg.store.lock_path().exists(), "lock released after each run");

    let history = app::history(&cfg, 10).expect("history");
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].id(), second.id());
    assert!(app::summarize(&history[0]).contains("[2024-2025/week-3]"));
    assert!(app::summarize(&history[0]).contains("submit=SKIPPED"));
}

#[test]
fn overlapping_run_is_refused_without_a_record() {
    let fx = Fixture::new();
    let cfg = fx.config();
    fx.store_credential(&cfg);
    let _held = RunLock::acquire(&cfg.store.lock_path(), Duration::from_secs(3600)).expect("hold lock");

    let err = app::run_scheduled(&cfg).unwrap_err();
    assert!(matches!(err, AppError::AlreadyRunning(_)), "{err}");
    assert_eq!(err.exit_code(), 4);
    assert_eq!(fx.lines("submits.log"), 0);
    assert!(app::history(&cfg, 10).expect("history").is_empty());
    assert_eq!(fx.alerts(), vec!["pickflow: run not started".to_string()]);
}

#[test]
fn missing_collaborator_command_is_alerted_not_just_printed() {
    let fx = Fixture::new();
    let mut cfg = fx.config();
    fx.store_credential(&cfg);
    cfg.commands.submit = None;

    let err = app::run_scheduled(&cfg).unwrap_err();
    assert!(matches!(err, AppError::Config { var: "PICKFLOW_SUBMIT_CMD", .. }), "{err}");
    assert_eq!(fx.alerts(), vec!["pickflow: run not started".to_string()]);
    assert!(app::history(&cfg, 10).expect("history").is_empty());
    assert!(!cfg.store.lock_path().exists());
}

#[test]
fn unattended_run_without_credential_never_opens_a_login() {
    let fx = Fixture::new();
    let cfg = fx.config();

    let run = app::run_scheduled(&cfg).expect("run is recorded");
    assert_eq!(run.outcome(), RunOutcome::Failed);
    assert_eq!(run.session(), SessionState::Expired);
    assert_eq!(run.steps().len(), 1);
    assert_eq!(fx.lines("logins.log"), 0);
    assert_eq!(fx.lines("submits.log"), 0);
    assert_eq!(app::history(&cfg, 10).expect("history").len(), 1);
}

#[test]
fn check_reports_probe_verdict() {
    let fx = Fixture::new();
    let cfg = fx.config();
    assert_eq!(app::check(&cfg).expect("check"), SessionState::Expired);

    fx.store_credential(&cfg);
    assert_eq!(app::check(&cfg).expect("check"), SessionState::Valid);

    fx.script("probe.sh", "cat >/dev/null\nexit 77\n");
    assert_eq!(app::check(&cfg).expect("check"), SessionState::Expired);
    fx.script("probe.sh", "cat >/dev/null\nexit 75\n");
    assert_eq!(app::check(&cfg).expect("check"), SessionState::Unknown);
}

#[test]
fn explicit_login_reports_failure_and_releases_the_lock() {
    let fx = Fixture::new();
    let cfg = fx.config();

    let err = app::login(&cfg).unwrap_err();
    assert!(matches!(err, AppError::Login(_)), "{err}");
    assert_eq!(fx.lines("logins.log"), 1);
    assert!(!cfg.store.lock_path().exists());
}
