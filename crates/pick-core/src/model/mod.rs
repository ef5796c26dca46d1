//! Modelo de datos: credencial opaca, payloads entre steps y referencias a
//! artifacts.

mod artifact;
mod credential;
mod payload;

pub use artifact::{ArtifactRef, PayloadKind};
pub use credential::Credential;
pub use payload::{Matchup, MatchupSet, Period, Pick, PredictionSet, PreviewArtifact, SubmissionReceipt};
