//! Constantes del orquestador.
//!
//! Los nombres de steps sintéticos forman parte del contrato observable del
//! `RunLog`: cambiarlos rompe la lectura de historiales previos.

/// Reintentos por defecto de un step idempotente (intentos totales = 1 + cap).
pub const DEFAULT_RETRY_CAP: u32 = 2;

/// Base del backoff exponencial entre reintentos.
pub const DEFAULT_BACKOFF_MS: u64 = 500;

/// Techo de espera entre dos intentos.
pub const MAX_BACKOFF_MS: u64 = 30_000;

/// Límite duro de invocaciones de login interactivo por run.
pub const MAX_LOGIN_ATTEMPTS_PER_RUN: u32 = 2;

/// Step sintético que describe un bloqueo de autenticación.
pub const AUTH_STEP: &str = "authentication";

/// Step sintético que describe un fallo del almacén de credenciales.
pub const STORE_STEP: &str = "session-store";

/// Step sintético de diagnóstico (bug del pipeline: step sin resultado).
pub const PIPELINE_STEP: &str = "pipeline";

/// Versión del formato de `PipelineRun` persistido.
pub const RECORD_VERSION: u32 = 1;
