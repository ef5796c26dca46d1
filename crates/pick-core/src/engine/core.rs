//! Ejecución secuencial de los steps de un run.
//!
//! Invariantes:
//! - ningún step arranca si la sesión no es `Valid` (un único resultado
//!   sintético describe el bloqueo)
//! - un step sólo invoca a su colaborador si todos sus inputs fueron
//!   producidos por steps previos ya sellados
//! - una falla crítica bloquea el resto (`SKIPPED`, `Blocked`)
//! - el envío consulta el marcador antes de invocar y lo escribe después
use chrono::Utc;
use log::{debug, error, info};
use serde::Serialize;

use super::context::RunContext;
use super::{EngineBuilder, Session};
use crate::constants::PIPELINE_STEP;
use crate::errors::StepError;
use crate::marker::{MarkerStore, SubmissionMarker};
use crate::model::{ArtifactRef, Credential, PayloadKind};
use crate::providers::Providers;
use crate::retry::{with_retry, Sleeper};
use crate::run::{PipelineRun, RunId, RunRecorder};
use crate::step::{PipelineDefinition, SkipReason, StepKind, StepResult, StepSpec};

pub struct PipelineEngine<M: MarkerStore> {
    definition: PipelineDefinition,
    providers: Providers,
    markers: M,
    sleeper: Box<dyn Sleeper>,
}

impl<M: MarkerStore> PipelineEngine<M> {
    #[inline]
    pub fn builder(providers: Providers, markers: M) -> EngineBuilder<M> {
        EngineBuilder::new(providers, markers)
    }

    pub(crate) fn from_parts(definition: PipelineDefinition,
                             providers: Providers,
                             markers: M,
                             sleeper: Box<dyn Sleeper>)
                             -> Self {
        Self { definition,
               providers,
               markers,
               sleeper }
    }

    pub fn definition(&self) -> &PipelineDefinition {
        &self.definition
    }

    pub fn markers(&self) -> &M {
        &self.markers
    }

    /// Ejecuta un run completo y devuelve el `PipelineRun` sellado.
    pub fn run(&mut self, session: &Session) -> PipelineRun {
        let started = Utc::now();
        let mut rec = RunRecorder::begin(started, session.state);

        if !session.state.is_valid() {
            let blockage = session.blockage_or_default();
            error!("run {}: session {} -> no step will start ({})", rec.id(), session.state, blockage.error);
            rec.record(StepResult::synthetic(blockage.step, blockage.error, started));
            return rec.seal(&[], Utc::now());
        }
        let Some(credential) = session.credential.as_ref() else {
            let err = StepError::Internal("session marked VALID without a credential".to_string());
            error!("run {}: {err}", rec.id());
            rec.record(StepResult::synthetic(PIPELINE_STEP, err, started));
            return rec.seal(&[], Utc::now());
        };

        let run_id = rec.id().clone();
        let mut ctx = RunContext::default();
        let mut halted_by: Option<&'static str> = None;
        let specs: Vec<StepSpec> = self.definition.steps().to_vec();

        for spec in specs {
            let critical = spec.policy.is_critical();
            if let Some(upstream) = halted_by {
                rec.record(StepResult::skipped(spec.name(),
                                               critical,
                                               SkipReason::Blocked { upstream: upstream.to_string() },
                                               Utc::now()));
                continue;
            }
            if let Some(missing) = spec.kind.requires().iter().find(|p| !ctx.has(**p)) {
                let upstream = self.definition
                                   .producer_of(*missing)
                                   .map(StepKind::name)
                                   .unwrap_or(PIPELINE_STEP);
                info!("step {}: input {missing} unavailable, blocked by {upstream}", spec.name());
                rec.record(StepResult::skipped(spec.name(),
                                               critical,
                                               SkipReason::Blocked { upstream: upstream.to_string() },
                                               Utc::now()));
                continue;
            }

            let result = self.execute(&spec, credential, &mut ctx, &run_id);
            if spec.kind == StepKind::Extract {
                if let Some(m) = &ctx.matchups {
                    rec.set_period(m.period.clone());
                }
            }
            if result.is_failed() {
                let detail = result.error.as_ref().map(ToString::to_string).unwrap_or_default();
                error!("step {} FAILED after {} attempt(s): {detail}", result.step, result.attempts);
                if critical {
                    halted_by = Some(spec.name());
                }
            } else {
                info!("step {} {}", result.step, result.status);
            }
            rec.record(result);
        }

        let run = rec.seal(&self.definition.names(), Utc::now());
        info!("run {} sealed: {}", run.id(), run.outcome());
        run
    }

    fn execute(&mut self, spec: &StepSpec, credential: &Credential, ctx: &mut RunContext, run_id: &RunId) -> StepResult {
        match spec.kind {
            StepKind::Extract => {
                let extractor = &self.providers.extractor;
                let (result, value) = self.attempt(spec, Some(PayloadKind::Matchups), |n| {
                    debug!("extract attempt {n}");
                    let set = extractor.extract(credential)?;
                    if set.is_empty() {
                        return Err(StepError::Extraction(format!("no matchups found for {}", set.period)));
                    }
                    Ok(set)
                });
                ctx.matchups = value;
                result
            }
            StepKind::Predict => {
                let predictor = &self.providers.predictor;
                let Some(matchups) = ctx.matchups.as_ref() else {
                    return missing_input(spec, PayloadKind::Matchups);
                };
                let (result, value) = self.attempt(spec, Some(PayloadKind::Predictions), |n| {
                    debug!("predict attempt {n} over {} matchups", matchups.len());
                    let picks = predictor.predict(matchups)?;
                    picks.check_against(matchups).map_err(StepError::Prediction)?;
                    Ok(picks)
                });
                ctx.predictions = value;
                result
            }
            StepKind::Submit => self.submit(spec, credential, ctx, run_id),
            StepKind::Render => {
                let renderer = &self.providers.renderer;
                let Some(picks) = ctx.predictions.as_ref() else {
                    return missing_input(spec, PayloadKind::Predictions);
                };
                let (result, value) = self.attempt(spec, Some(PayloadKind::Preview), |n| {
                    debug!("render attempt {n}");
                    renderer.render(picks)
                });
                ctx.preview = value;
                result
            }
            StepKind::Publish => {
                let publisher = &self.providers.publisher;
                let Some(preview) = ctx.preview.as_ref() else {
                    return missing_input(spec, PayloadKind::Preview);
                };
                let (result, _) = self.attempt(spec, None, |n| {
                    debug!("publish attempt {n}");
                    publisher.publish(preview)
                });
                result
            }
        }
    }

    /// Step idempotente: reintentos acotados por política.
    fn attempt<T, F>(&self, spec: &StepSpec, produces: Option<PayloadKind>, f: F) -> (StepResult, Option<T>)
        where T: Serialize,
              F: FnMut(u32) -> Result<T, StepError>
    {
        let started = Utc::now();
        let outcome = with_retry(spec.name(),
                                 spec.policy.max_attempts(),
                                 &spec.policy.backoff,
                                 self.sleeper.as_ref(),
                                 f);
        let critical = spec.policy.is_critical();
        let value = match outcome.result {
            Ok(v) => v,
            Err(e) => return (StepResult::failed(spec.name(), critical, outcome.attempts, e, started, Utc::now()), None),
        };
        let artifact = match produces.map(|kind| ArtifactRef::of(kind, &value)).transpose() {
            Ok(a) => a,
            Err(e) => return (StepResult::failed(spec.name(), critical, outcome.attempts, e, started, Utc::now()), None),
        };
        (StepResult::ok(spec.name(), critical, outcome.attempts, artifact, started, Utc::now()), Some(value))
    }

    /// Step `EffectfulOnce`: marcador → un único intento → marcador.
    fn submit(&mut self, spec: &StepSpec, credential: &Credential, ctx: &mut RunContext, run_id: &RunId) -> StepResult {
        let started = Utc::now();
        let critical = spec.policy.is_critical();
        let Some(picks) = ctx.predictions.as_ref() else {
            return missing_input(spec, PayloadKind::Predictions);
        };
        let period = picks.period.clone();

        match self.markers.find(&period) {
            Err(e) => {
                return StepResult::failed(spec.name(), critical, 0, e.into(), started, Utc::now());
            }
            Ok(Some(marker)) => {
                info!("picks for {period} already submitted by run {}; not re-sending", marker.run_id);
                ctx.receipt = Some(marker.receipt);
                return StepResult::skipped(spec.name(), critical, SkipReason::AlreadySubmitted { period: period.to_string() }, started)
                    .with_artifact(marker.receipt_ref);
            }
            Ok(None) => {}
        }

        debug!("submitting {} picks for {period} (single attempt)", picks.len());
        let receipt = match self.providers.submitter.submit(credential, picks) {
            Ok(r) => r,
            Err(e) => return StepResult::failed(spec.name(), critical, 1, e, started, Utc::now()),
        };
        let receipt_ref = match ArtifactRef::of(PayloadKind::Receipt, &receipt) {
            Ok(r) => r,
            Err(e) => {
                let err = StepError::Io(format!("submission accepted but marker not persisted: {e}"));
                return StepResult::failed(spec.name(), critical, 1, err, started, Utc::now());
            }
        };
        let marker = SubmissionMarker { period,
                                        run_id: run_id.clone(),
                                        receipt: receipt.clone(),
                                        receipt_ref: receipt_ref.clone(),
                                        marked_at: Utc::now() };
        if let Err(e) = self.markers.put(&marker) {
            let err = StepError::Io(format!("submission accepted but marker not persisted: {e}"));
            return StepResult::failed(spec.name(), critical, 1, err, started, Utc::now());
        }
        ctx.receipt = Some(receipt);
        StepResult::ok(spec.name(), critical, 1, Some(receipt_ref), started, Utc::now())
    }
}

// Inalcanzable con una definición validada: el driver ya bloquea steps sin
// input.
fn missing_input(spec: &StepSpec, payload: PayloadKind) -> StepResult {
    let now = Utc::now();
    StepResult::failed(spec.name(),
                       spec.policy.is_critical(),
                       0,
                       StepError::Internal(format!("{payload} missing at dispatch")),
                       now,
                       now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::AUTH_STEP;
    use crate::marker::InMemoryMarkerStore;
    use crate::model::Period;
    use crate::retry::NoSleep;
    use crate::run::RunOutcome;
    use crate::session::SessionState;
    use crate::step::StepStatus;
    use crate::testing::{fresh_credential, CallLog, Scripts};

    fn engine(scripts: Scripts) -> PipelineEngine<InMemoryMarkerStore> {
        PipelineEngine::builder(scripts.into_providers(), InMemoryMarkerStore::new()).sleeper(Box::new(NoSleep))
                                                                                     .build()
    }

    #[test]
    fn happy_path_runs_all_five_steps_in_order() {
        let calls = CallLog::default();
        let mut engine = engine(Scripts::happy(&calls, Period::new("2024-2025", 3), 16));
        let run = engine.run(&Session::valid(fresh_credential()));

        assert_eq!(run.outcome(), RunOutcome::Success);
        assert_eq!(run.steps().len(), 5);
        assert!(run.steps().iter().all(|r| r.status == StepStatus::Ok));
        assert_eq!(calls.entries(), vec!["extract", "predict", "submit", "render", "publish"]);
        assert_eq!(run.period(), Some(&Period::new("2024-2025", 3)));
        assert_eq!(engine.markers().len(), 1);
    }

    #[test]
    fn non_valid_session_records_single_synthetic_result() {
        let calls = CallLog::default();
        let mut engine = engine(Scripts::happy(&calls, Period::new("2024-2025", 3), 4));
        let run = engine.run(&Session::from_state(SessionState::Unknown));

        assert_eq!(run.outcome(), RunOutcome::Failed);
        assert_eq!(run.steps().len(), 1);
        assert_eq!(run.steps()[0].step, AUTH_STEP);
        assert!(calls.entries().is_empty());
    }

    #[test]
    fn empty_extraction_is_a_critical_failure() {
        let calls = CallLog::default();
        let mut scripts = Scripts::happy(&calls, Period::new("2024-2025", 3), 4);
        scripts.extract.set_fallback(Ok(crate::model::MatchupSet { period: Period::new("2024-2025", 3),
                                                                    matchups: vec![] }));
        let run = engine(scripts).run(&Session::valid(fresh_credential()));

        assert_eq!(run.outcome(), RunOutcome::Failed);
        let extract = run.result_for("extract").expect("extract result");
        assert_eq!(extract.error.as_ref().map(StepError::kind), Some(crate::errors::ErrorKind::Extraction));
        assert_eq!(extract.attempts, 1);
        for name in ["predict", "submit", "render", "publish"] {
            let r = run.result_for(name).expect("blocked result");
            assert_eq!(r.status, StepStatus::Skipped);
            assert_eq!(r.skip_reason, Some(SkipReason::Blocked { upstream: "extract".into() }));
        }
        assert_eq!(calls.entries(), vec!["extract"]);
    }

    #[test]
    fn malformed_predictions_fail_predict_without_submitting() {
        let calls = CallLog::default();
        let mut scripts = Scripts::happy(&calls, Period::new("2024-2025", 3), 4);
        let mut short = scripts.predictions();
        short.picks.pop();
        scripts.predict.set_fallback(Ok(short));
        let run = engine(scripts).run(&Session::valid(fresh_credential()));

        let predict = run.result_for("predict").expect("predict result");
        assert_eq!(predict.status, StepStatus::Failed);
        assert!(predict.error.as_ref().is_some_and(|e| e.to_string().contains("expected 4 picks, got 3")));
        assert_eq!(calls.count("submit"), 0);
    }

    #[test]
    fn submit_failure_is_not_retried() {
        let calls = CallLog::default();
        let mut scripts = Scripts::happy(&calls, Period::new("2024-2025", 3), 4);
        scripts.submit.set_fallback(Err(StepError::Transient("gateway timeout".into())));
        let mut engine = engine(scripts);
        let run = engine.run(&Session::valid(fresh_credential()));

        assert_eq!(run.outcome(), RunOutcome::Failed);
        assert_eq!(run.result_for("submit").map(|r| r.attempts), Some(1));
        assert_eq!(calls.count("submit"), 1);
        assert!(engine.markers().is_empty());
    }

    #[test]
    fn render_failure_blocks_publish_but_run_is_partial() {
        let calls = CallLog::default();
        let mut scripts = Scripts::happy(&calls, Period::new("2024-2025", 3), 4);
        scripts.render.set_fallback(Err(StepError::Render("font missing".into())));
        let run = engine(scripts).run(&Session::valid(fresh_credential()));

        assert_eq!(run.outcome(), RunOutcome::Partial);
        let publish = run.result_for("publish").expect("publish result");
        assert_eq!(publish.skip_reason, Some(SkipReason::Blocked { upstream: "render".into() }));
        assert_eq!(calls.count("publish"), 0);
    }
}
