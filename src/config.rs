//! Configuración de la aplicación.
//! Carga `.env` una sola vez y lee las variables `PICKFLOW_*`; un valor
//! inválido es un error que nombra la variable, nunca un default silencioso.
use std::env;
use std::str::FromStr;
use std::time::Duration;

use dotenvy::dotenv;
use once_cell::sync::Lazy;
use pick_core::constants::{DEFAULT_BACKOFF_MS, DEFAULT_RETRY_CAP, MAX_LOGIN_ATTEMPTS_PER_RUN};
use pick_core::LoginPolicy;
use pick_persistence::StoreConfig;

use crate::errors::AppError;

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

pub const DEFAULT_STATE_DIR: &str = ".pickflow";
pub const DEFAULT_STEP_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_LOGIN_TIMEOUT_SECS: u64 = 600;
pub const DEFAULT_CREDENTIAL_TTL_DAYS: i64 = 30;
pub const DEFAULT_LOCK_STALE_SECS: u64 = 6 * 60 * 60;

/// Sólo `PICKFLOW_NOTIFY_CMD`: permite alertar aunque el resto de la
/// configuración sea inválida.
pub fn notify_command_from_env() -> Option<String> {
    Lazy::force(&DOTENV_LOADED);
    env::var("PICKFLOW_NOTIFY_CMD").ok()
                                   .map(|v| v.trim().to_string())
                                   .filter(|v| !v.is_empty())
}

/// Líneas de comando de los colaboradores externos. Opcionales aquí: cada
/// comando de la CLI exige sólo las que usa.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandLines {
    pub probe: Option<String>,
    pub login: Option<String>,
    pub extract: Option<String>,
    pub predict: Option<String>,
    pub submit: Option<String>,
    pub render: Option<String>,
    pub publish: Option<String>,
    pub notify: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub retry_cap: u32,
    pub backoff_ms: u64,
    pub step_timeout: Duration,
    pub login: LoginPolicy,
    pub reauth_hint: Option<String>,
    pub commands: CommandLines,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        // asegura que .env se haya cargado
        Lazy::force(&DOTENV_LOADED);
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Igual que `from_env` pero con un origen de variables inyectable.
    pub fn from_vars<F>(get: F) -> Result<Self, AppError>
        where F: Fn(&str) -> Option<String>
    {
        let lookup = |key: &str| get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let state_dir = lookup("PICKFLOW_STATE_DIR").unwrap_or_else(|| DEFAULT_STATE_DIR.to_string());
        let lock_stale = parse(&lookup, "PICKFLOW_LOCK_STALE_SECS", DEFAULT_LOCK_STALE_SECS)?;
        let store = StoreConfig::new(state_dir).with_lock_stale_after(Duration::from_secs(lock_stale));

        let login_attempts = parse(&lookup, "PICKFLOW_LOGIN_ATTEMPTS", 1u32)?;
        if login_attempts == 0 || login_attempts > MAX_LOGIN_ATTEMPTS_PER_RUN {
            return Err(AppError::config("PICKFLOW_LOGIN_ATTEMPTS",
                                        format!("must be between 1 and {MAX_LOGIN_ATTEMPTS_PER_RUN}, got {login_attempts}")));
        }
        let ttl_days = parse(&lookup, "PICKFLOW_CREDENTIAL_TTL_DAYS", DEFAULT_CREDENTIAL_TTL_DAYS)?;
        if ttl_days <= 0 {
            return Err(AppError::config("PICKFLOW_CREDENTIAL_TTL_DAYS", "must be positive"));
        }
        let login = LoginPolicy { interactive: parse_bool(&lookup, "PICKFLOW_INTERACTIVE_LOGIN", false)?,
                                  max_attempts: login_attempts,
                                  wait: Duration::from_secs(parse(&lookup, "PICKFLOW_LOGIN_TIMEOUT_SECS", DEFAULT_LOGIN_TIMEOUT_SECS)?),
                                  credential_ttl: chrono::Duration::days(ttl_days) };

        let step_timeout_secs = parse(&lookup, "PICKFLOW_STEP_TIMEOUT_SECS", DEFAULT_STEP_TIMEOUT_SECS)?;
        if step_timeout_secs == 0 {
            return Err(AppError::config("PICKFLOW_STEP_TIMEOUT_SECS", "must be positive"));
        }

        let commands = CommandLines { probe: lookup("PICKFLOW_PROBE_CMD"),
                                      login: lookup("PICKFLOW_LOGIN_CMD"),
                                      extract: lookup("PICKFLOW_EXTRACT_CMD"),
                                      predict: lookup("PICKFLOW_PREDICT_CMD"),
                                      submit: lookup("PICKFLOW_SUBMIT_CMD"),
                                      render: lookup("PICKFLOW_RENDER_CMD"),
                                      publish: lookup("PICKFLOW_PUBLISH_CMD"),
                                      notify: lookup("PICKFLOW_NOTIFY_CMD") };

        Ok(Self { store,
                  retry_cap: parse(&lookup, "PICKFLOW_RETRY_CAP", DEFAULT_RETRY_CAP)?,
                  backoff_ms: parse(&lookup, "PICKFLOW_BACKOFF_MS", DEFAULT_BACKOFF_MS)?,
                  step_timeout: Duration::from_secs(step_timeout_secs),
                  login,
                  reauth_hint: lookup("PICKFLOW_REAUTH_HINT"),
                  commands })
    }
}

fn parse<T, G>(get: &G, var: &'static str, default: T) -> Result<T, AppError>
    where T: FromStr,
          T::Err: std::fmt::Display,
          G: Fn(&str) -> Option<String>
{
    match get(var) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|e| AppError::config(var, format!("invalid value {raw:?}: {e}"))),
    }
}

fn parse_bool<G>(get: &G, var: &'static str, default: bool) -> Result<bool, AppError>
    where G: Fn(&str) -> Option<String>
{
    match get(var).map(|v| v.to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(AppError::config(var, format!("expected a boolean, got {v:?}"))),
        },
    }
}
