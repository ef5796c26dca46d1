//! Definición validada de un pipeline.
//!
//! Reglas (verificadas al construir, no al ejecutar):
//! - al menos un step y ningún step repetido
//! - cada payload requerido lo produce un step anterior
//! - el step con efecto remoto debe ser `EffectfulOnce`, sin reintentos
//! - `EffectfulOnce` sólo para el step con efecto remoto (único con marcador)
//! - ningún step crítico después de uno no crítico
use std::collections::HashSet;

use super::{Effect, StepKind, StepPolicy, StepSpec};
use crate::errors::DefinitionError;
use crate::model::PayloadKind;
use crate::retry::Backoff;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineDefinition {
    steps: Vec<StepSpec>,
}

impl PipelineDefinition {
    pub fn new(steps: Vec<StepSpec>) -> Result<Self, DefinitionError> {
        if steps.is_empty() {
            return Err(DefinitionError::Empty);
        }
        let mut seen = HashSet::new();
        let mut produced: HashSet<PayloadKind> = HashSet::new();
        let mut last_non_critical: Option<&'static str> = None;

        for spec in &steps {
            let name = spec.name();
            if !seen.insert(spec.kind) {
                return Err(DefinitionError::DuplicateStep(name));
            }
            match (spec.kind.has_remote_side_effect(), spec.policy.effect) {
                (true, Effect::Idempotent) => return Err(DefinitionError::UnguardedSideEffect(name)),
                (false, Effect::EffectfulOnce) => return Err(DefinitionError::UnsupportedEffectfulOnce(name)),
                _ => {}
            }
            if spec.policy.effect == Effect::EffectfulOnce && spec.policy.retry_cap > 0 {
                return Err(DefinitionError::RetriesOnEffectful(name));
            }
            if let Some(missing) = spec.kind.requires().iter().find(|p| !produced.contains(*p)) {
                return Err(DefinitionError::MissingProducer { step: name,
                                                              payload: missing.as_str() });
            }
            if spec.policy.is_critical() {
                if let Some(after) = last_non_critical {
                    return Err(DefinitionError::CriticalAfterNonCritical { step: name, after });
                }
            } else {
                last_non_critical = Some(name);
            }
            if let Some(out) = spec.kind.produces() {
                produced.insert(out);
            }
        }
        Ok(Self { steps })
    }

    /// extract → predict → submit → render → publish con políticas por defecto.
    pub fn standard() -> Self {
        Self { steps: StepKind::ALL.iter().map(|k| StepSpec::standard(*k)).collect() }
    }

    /// Igual que `standard()` pero con retry cap y backoff propios para los
    /// steps idempotentes.
    pub fn standard_with(retry_cap: u32, backoff: Backoff) -> Self {
        let steps = StepKind::ALL.iter()
                                 .map(|k| {
                                     let policy = k.default_policy();
                                     let policy = match policy.effect {
                                         Effect::Idempotent => policy.with_retry_cap(retry_cap).with_backoff(backoff),
                                         Effect::EffectfulOnce => policy,
                                     };
                                     StepSpec::new(*k, policy)
                                 })
                                 .collect();
        Self { steps }
    }

    pub fn steps(&self) -> &[StepSpec] {
        &self.steps
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.steps.iter().map(StepSpec::name).collect()
    }

    pub fn policy_of(&self, kind: StepKind) -> Option<&StepPolicy> {
        self.steps.iter().find(|s| s.kind == kind).map(|s| &s.policy)
    }

    /// Step que produce `payload`, si está en la definición.
    pub fn producer_of(&self, payload: PayloadKind) -> Option<StepKind> {
        self.steps.iter().map(|s| s.kind).find(|k| k.produces() == Some(payload))
    }
}
