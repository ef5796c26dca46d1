//! Credencial persistida (bundle de cookies/tokens) que sustituye a un login
//! interactivo. El core no interpreta el `blob` salvo para un chequeo
//! estructural barato.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    /// Material opaco de autenticación (p.ej. storage state del navegador).
    pub blob: Value,
    pub obtained_at: DateTime<Utc>,
    /// Estimación de expiración; `None` si se desconoce.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    /// Última vez que un probe de vida aceptó la credencial.
    #[serde(default)]
    pub last_validated: Option<DateTime<Utc>>,
}

impl Credential {
    pub fn new(blob: Value, obtained_at: DateTime<Utc>) -> Self {
        Self { blob,
               obtained_at,
               expires_at: None,
               last_validated: None }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn validated_at(mut self, at: DateTime<Utc>) -> Self {
        self.last_validated = Some(at);
        self
    }

    /// Chequeo estructural: blob no vacío y, si trae lista `cookies`, que no
    /// esté vacía.
    pub fn is_well_formed(&self) -> bool {
        match &self.blob {
            Value::Null => false,
            Value::Bool(_) | Value::Number(_) => true,
            Value::String(s) => !s.is_empty(),
            Value::Array(items) => !items.is_empty(),
            Value::Object(map) => {
                if map.is_empty() {
                    return false;
                }
                match map.get("cookies") {
                    None => true,
                    Some(Value::Array(cookies)) => !cookies.is_empty(),
                    Some(_) => false,
                }
            }
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }
}
