//! Sesión contra el sitio mediante dos programas: probe y login.
//!
//! - probe: recibe la credencial por stdin; `0` vigente, `77` rechazada,
//!   cualquier otro resultado (incluido timeout) es inconcluso.
//! - login: interactivo; su timeout es la espera máxima de la política.
//!   Imprime el storage state del navegador (o una `Credential` completa).
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use log::{debug, info};
use pick_core::{Credential, LoginError, ProbeError, SiteSession};
use serde_json::Value;

use crate::command::{CommandError, CommandSpec, EXIT_NOPERM};

pub struct CommandSite {
    probe: CommandSpec,
    login: CommandSpec,
}

impl CommandSite {
    pub fn new(probe: CommandSpec, login: CommandSpec) -> Self {
        Self { probe, login }
    }
}

impl SiteSession for CommandSite {
    fn probe(&self, credential: &Credential) -> Result<(), ProbeError> {
        match self.probe.run_json::<_, Value>(credential, &[]) {
            Ok(_) => Ok(()),
            // el probe puede no imprimir nada: basta el código de salida
            Err(CommandError::Decode { .. }) => Ok(()),
            Err(e) if e.exit_code() == Some(EXIT_NOPERM) => Err(ProbeError::AuthRejected(e.to_string())),
            Err(e) => Err(ProbeError::Transient(e.to_string())),
        }
    }

    fn login(&self, wait: Duration) -> Result<Credential, LoginError> {
        info!("starting interactive login (up to {wait:?})");
        let out = self.login.with_timeout(wait).run_raw(None, &[]).map_err(|e| match e {
                                                                       CommandError::TimedOut { after, .. } => LoginError::TimedOut(after),
                                                                       e if e.exit_code() == Some(EXIT_NOPERM) => LoginError::Rejected(e.to_string()),
                                                                       e => LoginError::Unavailable(e.to_string()),
                                                                   })?;
        let value: Value = serde_json::from_slice(&out).map_err(|e| LoginError::Unavailable(format!("login output is not JSON: {e}")))?;
        Ok(credential_from_output(value, Utc::now()))
    }
}

/// Acepta una `Credential` serializada o un storage state crudo; en el
/// segundo caso la expiración se estima con la cookie persistente que más
/// tarde vence. Las cookies de analítica de vida corta no acortan la
/// estimación.
pub fn credential_from_output(value: Value, now: DateTime<Utc>) -> Credential {
    if let Ok(credential) = serde_json::from_value::<Credential>(value.clone()) {
        return credential;
    }
    let expiry = latest_cookie_expiry(&value);
    debug!("login produced raw state; cookie expiry estimate: {expiry:?}");
    let credential = Credential::new(value, now);
    match expiry {
        Some(at) => credential.with_expiry(at),
        None => credential,
    }
}

fn latest_cookie_expiry(state: &Value) -> Option<DateTime<Utc>> {
    state.get("cookies")?
         .as_array()?
         .iter()
         .filter_map(|c| c.get("expires").and_then(Value::as_f64))
         .filter(|secs| *secs > 0.0)
         .filter_map(|secs| Utc.timestamp_opt(secs as i64, 0).single())
         .max()
}
