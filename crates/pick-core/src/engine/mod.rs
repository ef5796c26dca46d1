//! Motor del pipeline y orquestador de un run completo.
//!
//! - `PipelineEngine`: recorre la definición en orden, aplicando por step la
//!   política de reintento, criticidad y marcador.
//! - `Orchestrator`: sesión (store → guard → login acotado) + engine +
//!   `RunLog` + notificación.

mod builder;
mod context;
mod core;
mod gate;
mod orchestrator;

pub use builder::EngineBuilder;
pub use core::PipelineEngine;
pub use gate::{Blockage, Session};
pub use orchestrator::{Orchestrator, OrchestratorError};
