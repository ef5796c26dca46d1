//! Errores de la aplicación (capa CLI / wiring).

pub mod app_error;

pub use app_error::AppError;
