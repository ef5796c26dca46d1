use std::fmt;

use serde::{Deserialize, Serialize};

/// Estado de la sesión, derivado en cada run (nunca persistido como tal).
///
/// - `Valid`: el probe de vida aceptó la credencial.
/// - `Expired`: no hay credencial o el sitio la rechazó.
/// - `Invalid`: la credencial existe pero está mal formada.
/// - `Unknown`: el probe falló por una causa no ligada a autenticación; no
///   se puede continuar, pero tampoco está probado que la credencial sea mala.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    Unknown,
    Valid,
    Expired,
    Invalid,
}

impl SessionState {
    pub fn is_valid(self) -> bool {
        matches!(self, SessionState::Valid)
    }

    /// `Expired`/`Invalid` justifican reautenticar; `Unknown` no.
    pub fn needs_login(self) -> bool {
        matches!(self, SessionState::Expired | SessionState::Invalid)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Unknown => "UNKNOWN",
            SessionState::Valid => "VALID",
            SessionState::Expired => "EXPIRED",
            SessionState::Invalid => "INVALID",
        };
        f.write_str(s)
    }
}
