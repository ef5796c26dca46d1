//! Almacenes en disco contra un directorio temporal.

use chrono::Utc;
use pick_core::run::RunRecorder;
use pick_core::step::StepResult;
use pick_core::testing::fresh_credential;
use pick_core::{ArtifactRef, MarkerStore, PayloadKind, Period, RunId, RunLog, RunOutcome, SessionState, SessionStore,
                StoreError, SubmissionMarker, SubmissionReceipt};
use pick_persistence::{FileMarkerStore, FileSessionStore, JsonlRunLog, StoreConfig};

fn config() -> (tempfile::TempDir, StoreConfig) {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = StoreConfig::new(dir.path().join("state"));
    (dir, cfg)
}

fn marker(period: Period) -> SubmissionMarker {
    let now = Utc::now();
    let receipt = SubmissionReceipt { period: period.clone(),
                                      picks_submitted: 16,
                                      submitted_at: now,
                                      confirmation: Some("CONF-9".into()) };
    SubmissionMarker { receipt_ref: ArtifactRef::of(PayloadKind::Receipt, &receipt).expect("hash"),
                       period,
                       run_id: RunId::generate(now),
                       receipt,
                       marked_at: now }
}

fn sealed_run(step: &str) -> pick_core::PipelineRun {
    let now = Utc::now();
    let mut rec = RunRecorder::begin(now, SessionState::Valid);
    rec.record(StepResult::ok(step, true, 1, None, now, now));
    rec.seal(&[step], now)
}

#[test]
fn credential_save_replaces_and_clear_removes() {
    let (_dir, cfg) = config();
    let mut store = FileSessionStore::new(cfg.credential_path());
    assert_eq!(store.load().expect("empty load"), None);

    let first = fresh_credential();
    store.save(&first).expect("save");
    let second = fresh_credential().validated_at(Utc::now());
    store.save(&second).expect("overwrite");
    assert_eq!(store.load().expect("load"), Some(second));

    store.clear().expect("clear");
    store.clear().expect("clear is idempotent");
    assert_eq!(store.load().expect("load after clear"), None);
}

#[test]
fn corrupt_credential_file_is_reported_not_ignored() {
    let (_dir, cfg) = config();
    std::fs::create_dir_all(cfg.state_dir()).expect("mkdir");
    std::fs::write(cfg.credential_path(), b"{\"version\":1,").expect("truncated write");

    let store = FileSessionStore::new(cfg.credential_path());
    assert!(matches!(store.load(), Err(StoreError::Corrupt(_))));
}

#[test]
fn marker_is_created_once_per_period() {
    let (_dir, cfg) = config();
    let mut markers = FileMarkerStore::new(cfg.markers_dir());
    let week3 = Period::new("2024-2025", 3);

    assert!(markers.find(&week3).expect("find").is_none());
    markers.put(&marker(week3.clone())).expect("put");
    assert!(matches!(markers.put(&marker(week3.clone())), Err(StoreError::Conflict(_))));

    let found = markers.find(&week3).expect("find").expect("marker present");
    assert_eq!(found.receipt.confirmation.as_deref(), Some("CONF-9"));
    assert!(markers.path_for(&week3).ends_with("submitted-2024-2025-week-3.json"));
    assert!(markers.find(&Period::new("2024-2025", 4)).expect("find").is_none());
}

#[test]
fn run_log_appends_and_lists_newest_first() {
    let (_dir, cfg) = config();
    let mut log = JsonlRunLog::new(cfg.run_log_path());
    assert!(log.recent(10).expect("empty").is_empty());

    let a = sealed_run("extract");
    let b = sealed_run("predict");
    log.append(&a).expect("append a");
    log.append(&b).expect("append b");

    let recent = log.recent(10).expect("recent");
    assert_eq!(recent, vec![b.clone(), a]);
    assert_eq!(log.recent(1).expect("recent 1"), vec![b]);
    assert_eq!(recent[0].outcome(), RunOutcome::Success);
}

#[test]
fn interrupted_line_does_not_hide_other_runs() {
    let (_dir, cfg) = config();
    let mut log = JsonlRunLog::new(cfg.run_log_path());
    log.append(&sealed_run("extract")).expect("append");

    let mut text = std::fs::read_to_string(cfg.run_log_path()).expect("read");
    text.push_str("{\"version\":1,\"id\":\"trunc");
    text.push('\n');
    std::fs::write(cfg.run_log_path(), text).expect("rewrite for test");
    log.append(&sealed_run("predict")).expect("append after corrupt line");

    let all = log.read_all().expect("read all");
    assert_eq!(all.len(), 2);
    assert_eq!(all[1].steps()[0].step, "predict");
}

#[test]
fn append_after_torn_write_starts_on_a_fresh_line() {
    let (_dir, cfg) = config();
    let mut log = JsonlRunLog::new(cfg.run_log_path());
    log.append(&sealed_run("extract")).expect("append");

    // escritura cortada a mitad de línea, sin salto final
    let mut text = std::fs::read_to_string(cfg.run_log_path()).expect("read");
    text.push_str("{\"version\":1,\"id\":\"trunc");
    std::fs::write(cfg.run_log_path(), text).expect("rewrite for test");
    log.append(&sealed_run("predict")).expect("append after torn line");
    log.append(&sealed_run("submit")).expect("append again");

    let steps: Vec<String> = log.read_all()
                                .expect("read all")
                                .iter()
                                .map(|r| r.steps()[0].step.clone())
                                .collect();
    assert_eq!(steps, vec!["extract", "predict", "submit"]);
}
