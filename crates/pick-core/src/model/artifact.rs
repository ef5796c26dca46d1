//! Referencia a un artifact producido por un step: tipo de payload + hash
//! blake3 sobre su JSON canónico. Es lo que queda en el `RunLog`; el payload
//! completo nunca se persiste ahí.
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::StepError;
use crate::hashing::hash_value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadKind {
    Matchups,
    Predictions,
    Receipt,
    Preview,
}

impl PayloadKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PayloadKind::Matchups => "matchups",
            PayloadKind::Predictions => "predictions",
            PayloadKind::Receipt => "receipt",
            PayloadKind::Preview => "preview",
        }
    }
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub kind: PayloadKind,
    pub hash: String,
}

impl ArtifactRef {
    pub fn of<T: Serialize>(kind: PayloadKind, payload: &T) -> Result<Self, StepError> {
        let value = serde_json::to_value(payload).map_err(|e| StepError::Internal(format!("cannot hash {kind} payload: {e}")))?;
        Ok(Self { kind,
                  hash: hash_value(&value) })
    }
}
