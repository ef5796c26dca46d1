//! Builder de `PipelineEngine`: providers y marcadores son obligatorios;
//! definición y sleeper tienen valores por defecto.
use super::PipelineEngine;
use crate::marker::MarkerStore;
use crate::providers::Providers;
use crate::retry::{Sleeper, ThreadSleeper};
use crate::step::PipelineDefinition;

pub struct EngineBuilder<M: MarkerStore> {
    providers: Providers,
    markers: M,
    definition: PipelineDefinition,
    sleeper: Box<dyn Sleeper>,
}

impl<M: MarkerStore> EngineBuilder<M> {
    pub(crate) fn new(providers: Providers, markers: M) -> Self {
        Self { providers,
               markers,
               definition: PipelineDefinition::standard(),
               sleeper: Box::new(ThreadSleeper) }
    }

    pub fn definition(mut self, definition: PipelineDefinition) -> Self {
        self.definition = definition;
        self
    }

    pub fn sleeper(mut self, sleeper: Box<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn build(self) -> PipelineEngine<M> {
        PipelineEngine::from_parts(self.definition, self.providers, self.markers, self.sleeper)
    }
}
