//! Registro de runs: identificador, agregación de outcome, sellado y el
//! `RunLog` append-only.

mod id;
mod log;
mod outcome;
mod record;

pub use id::RunId;
pub use log::{InMemoryRunLog, RunLog};
pub use outcome::RunOutcome;
pub use record::{PipelineRun, RunRecorder};
