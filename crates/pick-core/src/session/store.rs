use crate::errors::StoreError;
use crate::model::Credential;

/// Almacén de la (única) credencial persistida.
///
/// Contrato: `load`/`save` son atómicos; ningún lector observa una credencial
/// escrita a medias. `save` reemplaza por completo la anterior (sin merge).
pub trait SessionStore {
    fn load(&self) -> Result<Option<Credential>, StoreError>;
    fn save(&mut self, credential: &Credential) -> Result<(), StoreError>;
    fn clear(&mut self) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    current: Option<Credential>,
    saves: usize,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(credential: Credential) -> Self {
        Self { current: Some(credential),
               saves: 0 }
    }

    /// Cantidad de `save` observados (útil para verificar reautenticaciones).
    pub fn saves(&self) -> usize {
        self.saves
    }
}

impl SessionStore for InMemorySessionStore {
    fn load(&self) -> Result<Option<Credential>, StoreError> {
        Ok(self.current.clone())
    }

    fn save(&mut self, credential: &Credential) -> Result<(), StoreError> {
        self.current = Some(credential.clone());
        self.saves += 1;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.current = None;
        Ok(())
    }
}
