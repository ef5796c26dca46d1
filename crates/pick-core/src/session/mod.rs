//! Ciclo de vida de la sesión: almacén de credencial, evaluación previa al
//! pipeline y login interactivo acotado.

mod auth;
mod guard;
mod state;
mod store;

pub use auth::{AuthError, Authenticator, LoginPolicy};
pub use guard::SessionGuard;
pub use state::SessionState;
pub use store::{InMemorySessionStore, SessionStore};
