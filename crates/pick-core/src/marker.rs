//! Marcador durable "ya enviado para el periodo K".
//!
//! Es la única garantía contra el doble envío cuando un run se repite tras un
//! fallo parcial: el step de envío lo consulta antes de invocar al
//! colaborador y lo escribe inmediatamente después de un envío aceptado.
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::StoreError;
use crate::model::{ArtifactRef, Period, SubmissionReceipt};
use crate::run::RunId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionMarker {
    pub period: Period,
    pub run_id: RunId,
    pub receipt: SubmissionReceipt,
    pub receipt_ref: ArtifactRef,
    pub marked_at: DateTime<Utc>,
}

pub trait MarkerStore {
    fn find(&self, period: &Period) -> Result<Option<SubmissionMarker>, StoreError>;

    /// Crea el marcador. Nunca sobrescribe: si ya existe devuelve
    /// `StoreError::Conflict`.
    fn put(&mut self, marker: &SubmissionMarker) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
pub struct InMemoryMarkerStore {
    markers: HashMap<String, SubmissionMarker>,
}

impl InMemoryMarkerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

impl MarkerStore for InMemoryMarkerStore {
    fn find(&self, period: &Period) -> Result<Option<SubmissionMarker>, StoreError> {
        Ok(self.markers.get(&period.key()).cloned())
    }

    fn put(&mut self, marker: &SubmissionMarker) -> Result<(), StoreError> {
        let key = marker.period.key();
        if self.markers.contains_key(&key) {
            return Err(StoreError::Conflict(format!("submission marker for {}", marker.period)));
        }
        self.markers.insert(key, marker.clone());
        Ok(())
    }
}
