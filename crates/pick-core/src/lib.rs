//! pick-core: orquestador secuencial del ciclo semanal de picks.
//!
//! Piezas principales:
//! - `session`: modelo de credencial, `SessionGuard` y `Authenticator`.
//! - `step` + `engine`: pipeline extract → predict → submit → render → publish
//!   con políticas de idempotencia, reintento y criticidad por step.
//! - `run`: registro sellado (`PipelineRun`) y el `RunLog` append-only.
//! - `notify`: traducción de un run a una notificación humana.
//! - `marker`: marcador durable "ya enviado para el periodo K".
pub mod constants;
pub mod engine;
pub mod errors;
pub mod hashing;
pub mod marker;
pub mod model;
pub mod notify;
pub mod providers;
pub mod retry;
pub mod run;
pub mod session;
pub mod step;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use engine::{Blockage, Orchestrator, OrchestratorError, PipelineEngine, Session};
pub use errors::{DefinitionError, ErrorKind, StepError, StoreError};
pub use marker::{InMemoryMarkerStore, MarkerStore, SubmissionMarker};
pub use model::{ArtifactRef, Credential, MatchupSet, PayloadKind, Period, PredictionSet, PreviewArtifact, SubmissionReceipt};
pub use notify::{FanoutNotifier, Notification, NotificationSink, NotifyError, Severity};
pub use providers::{LoginError, ProbeError, Providers, SiteSession};
pub use run::{InMemoryRunLog, PipelineRun, RunId, RunLog, RunOutcome};
pub use session::{AuthError, Authenticator, InMemorySessionStore, LoginPolicy, SessionGuard, SessionState, SessionStore};
pub use step::{Criticality, Effect, PipelineDefinition, SkipReason, StepKind, StepPolicy, StepResult, StepSpec, StepStatus};
