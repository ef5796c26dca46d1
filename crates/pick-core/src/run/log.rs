use crate::errors::StoreError;

use super::PipelineRun;

/// Historial append-only de runs sellados. Sólo diagnóstico: el pipeline
/// nunca lo lee para decidir.
pub trait RunLog {
    fn append(&mut self, run: &PipelineRun) -> Result<(), StoreError>;

    /// Los `limit` runs más recientes, el más reciente primero.
    fn recent(&self, limit: usize) -> Result<Vec<PipelineRun>, StoreError>;
}

#[derive(Debug, Default)]
pub struct InMemoryRunLog {
    runs: Vec<PipelineRun>,
}

impl InMemoryRunLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn runs(&self) -> &[PipelineRun] {
        &self.runs
    }
}

impl RunLog for InMemoryRunLog {
    fn append(&mut self, run: &PipelineRun) -> Result<(), StoreError> {
        self.runs.push(run.clone());
        Ok(())
    }

    fn recent(&self, limit: usize) -> Result<Vec<PipelineRun>, StoreError> {
        Ok(self.runs.iter().rev().take(limit).cloned().collect())
    }
}
