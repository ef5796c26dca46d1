//! pick-adapters
//!
//! Colaboradores externos implementados como programas: cada invocación
//! recibe su input como JSON por stdin y devuelve su output como JSON por
//! stdout, con un timeout por invocación.
//!
//! Convención de códigos de salida:
//! - `0`: éxito
//! - `75` (`EX_TEMPFAIL`): fallo transitorio, reintentable
//! - `77` (`EX_NOPERM`): autenticación rechazada
//! - otro: fallo de dominio del step
//!
//! Módulos:
//! - `command`: ejecución con timeout y clasificación de fallos.
//! - `site`: probe y login (`SiteSession`).
//! - `providers`: extract / predict / submit / render / publish.
//! - `notify`: sinks de notificación (log y comando).

pub mod command;
pub mod notify;
pub mod providers;
pub mod site;

pub use command::{CommandError, CommandSpec};
pub use notify::{CommandNotifier, LogNotifier};
pub use providers::{CommandExtractor, CommandPredictor, CommandPublisher, CommandRenderer, CommandSubmitter, SubmitRequest};
pub use site::CommandSite;
