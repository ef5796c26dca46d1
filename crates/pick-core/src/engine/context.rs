use crate::model::{MatchupSet, PayloadKind, PredictionSet, PreviewArtifact, SubmissionReceipt};

/// Payloads producidos durante un run. Cada slot se escribe una sola vez,
/// por el step que lo produce.
#[derive(Debug, Default)]
pub(crate) struct RunContext {
    pub matchups: Option<MatchupSet>,
    pub predictions: Option<PredictionSet>,
    pub receipt: Option<SubmissionReceipt>,
    pub preview: Option<PreviewArtifact>,
}

impl RunContext {
    pub fn has(&self, payload: PayloadKind) -> bool {
        match payload {
            PayloadKind::Matchups => self.matchups.is_some(),
            PayloadKind::Predictions => self.predictions.is_some(),
            PayloadKind::Receipt => self.receipt.is_some(),
            PayloadKind::Preview => self.preview.is_some(),
        }
    }
}
