//! pickflow
//!
//! Ciclo semanal de picks, desatendido: sesión → extract → predict → submit
//! → render → publish, con historial y notificación por run.
//!
//! - `config`: variables `PICKFLOW_*` (y `.env`).
//! - `app`: wiring de stores en disco y adaptadores por comando.
//! - `errors`: `AppError` y códigos de salida.

pub mod app;
pub mod config;
pub mod errors;
