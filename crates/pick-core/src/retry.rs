//! Reintento con backoff exponencial para steps idempotentes.
//!
//! Política:
//! - Intentos totales: `max_attempts` (1 + retry cap del step).
//! - Sólo se reintentan errores `is_retryable()` (transitorios y timeouts).
//! - Backoff: `base_ms * 2^(n-1)` antes del reintento n, con techo `max_ms`.
//! - Logs: se emite `warn!` por reintento agendado.
use std::time::Duration;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_BACKOFF_MS, MAX_BACKOFF_MS};
use crate::errors::StepError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backoff {
    pub base_ms: u64,
    pub max_ms: u64,
}

impl Default for Backoff {
    fn default() -> Self {
        Self { base_ms: DEFAULT_BACKOFF_MS,
               max_ms: MAX_BACKOFF_MS }
    }
}

impl Backoff {
    pub fn new(base_ms: u64) -> Self {
        Self { base_ms,
               max_ms: MAX_BACKOFF_MS.max(base_ms) }
    }

    pub const fn none() -> Self {
        Self { base_ms: 0, max_ms: 0 }
    }

    /// Espera previa al reintento número `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exp = retry.saturating_sub(1).min(20);
        let ms = self.base_ms.saturating_mul(1u64 << exp).min(self.max_ms);
        Duration::from_millis(ms)
    }
}

/// Abstracción del sueño entre intentos (los tests no duermen).
pub trait Sleeper {
    fn sleep(&self, delay: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, delay: Duration) {
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoSleep;

impl Sleeper for NoSleep {
    fn sleep(&self, _delay: Duration) {}
}

pub struct RetryOutcome<T> {
    pub result: Result<T, StepError>,
    pub attempts: u32,
}

/// Ejecuta `f` hasta `max_attempts` veces. `f` recibe el número de intento.
pub fn with_retry<T, F>(step: &str,
                        max_attempts: u32,
                        backoff: &Backoff,
                        sleeper: &dyn Sleeper,
                        mut f: F)
                        -> RetryOutcome<T>
    where F: FnMut(u32) -> Result<T, StepError>
{
    let max_attempts = max_attempts.max(1);
    let mut attempts = 0;
    loop {
        attempts += 1;
        match f(attempts) {
            Err(e) if e.is_retryable() && attempts < max_attempts => {
                let delay = backoff.delay_for(attempts);
                warn!("step {step}: retryable error (attempt {attempts}/{max_attempts}): {e} -> sleeping {}ms",
                      delay.as_millis());
                sleeper.sleep(delay);
            }
            result => return RetryOutcome { result, attempts },
        }
    }
}
