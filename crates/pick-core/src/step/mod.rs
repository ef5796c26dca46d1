//! Steps del pipeline: qué son, qué políticas declaran y cómo quedan
//! registrados.

mod definition;
mod kind;
mod policy;
mod result;
mod status;

pub use definition::PipelineDefinition;
pub use kind::StepKind;
pub use policy::{Criticality, Effect, StepPolicy, StepSpec};
pub use result::StepResult;
pub use status::{SkipReason, StepStatus};
