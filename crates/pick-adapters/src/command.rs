//! Ejecución de un programa externo con timeout.
//!
//! stdout y stderr se drenan en hilos propios para que un hijo que escribe
//! mucho no quede bloqueado; el proceso se sondea con `try_wait` hasta el
//! deadline y se mata si lo excede. El deadline cubre también el drenado:
//! un nieto que hereda los pipes (un navegador, un `sleep &`) no alarga el
//! step. En unix el hijo encabeza su propio grupo de procesos y el timeout
//! mata al grupo entero.
use std::io::{Read, Write};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, warn};
use pick_core::StepError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

pub const EXIT_TEMPFAIL: i32 = 75;
pub const EXIT_NOPERM: i32 = 77;

const POLL_INTERVAL: Duration = Duration::from_millis(20);
const STDERR_TAIL: usize = 400;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command line")]
    Empty,
    #[error("unbalanced quote in command line: {0}")]
    UnbalancedQuote(String),
    #[error("could not start {program}: {reason}")]
    Spawn { program: String, reason: String },
    #[error("{program} timed out after {after:?}")]
    TimedOut { program: String, after: Duration },
    #[error("{program} exited with {}: {stderr}", .code.map_or_else(|| "signal".to_string(), |c| c.to_string()))]
    Exit { program: String, code: Option<i32>, stderr: String },
    #[error("{program} produced unreadable output: {reason}")]
    Decode { program: String, reason: String },
    #[error("io with {program}: {reason}")]
    Io { program: String, reason: String },
}

impl CommandError {
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            CommandError::Exit { code, .. } => *code,
            _ => None,
        }
    }

    /// Clasifica el fallo para el engine: timeout → `Timeout`, 75 →
    /// `Transient`, 77 → `Auth`, resto → error de dominio del step.
    pub fn into_step_error(self, domain: fn(String) -> StepError) -> StepError {
        match &self {
            CommandError::TimedOut { after, .. } => StepError::Timeout(u64::try_from(after.as_millis()).unwrap_or(u64::MAX)),
            CommandError::Exit { code: Some(EXIT_TEMPFAIL), .. } => StepError::Transient(self.to_string()),
            CommandError::Exit { code: Some(EXIT_NOPERM), .. } => StepError::Auth(self.to_string()),
            _ => domain(self.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Duration,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self { program: program.into(),
               args: Vec::new(),
               timeout }
    }

    pub fn with_args<I, A>(mut self, args: I) -> Self
        where I: IntoIterator<Item = A>,
              A: Into<String>
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_timeout(&self, timeout: Duration) -> Self {
        Self { timeout,
               ..self.clone() }
    }

    /// Separa por espacios; comillas simples o dobles agrupan.
    pub fn parse(line: &str, timeout: Duration) -> Result<Self, CommandError> {
        let words = split_words(line)?;
        let mut words = words.into_iter();
        let program = words.next().ok_or(CommandError::Empty)?;
        Ok(Self { program,
                  args: words.collect(),
                  timeout })
    }

    /// Ejecuta con `input` por stdin y devuelve stdout crudo.
    pub fn run_raw(&self, input: Option<Vec<u8>>, extra_args: &[String]) -> Result<Vec<u8>, CommandError> {
        let started = Instant::now();
        let mut command = Command::new(&self.program);
        command.args(&self.args)
               .args(extra_args)
               .stdin(if input.is_some() { Stdio::piped() } else { Stdio::null() })
               .stdout(Stdio::piped())
               .stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }
        let mut child = command.spawn()
                               .map_err(|e| CommandError::Spawn { program: self.program.clone(),
                                                                  reason: e.to_string() })?;
        if let (Some(bytes), Some(mut stdin)) = (input, child.stdin.take()) {
            // un hijo que no lee stdin no debe bloquearnos
            thread::spawn(move || {
                if let Err(e) = stdin.write_all(&bytes) {
                    debug!("stdin closed early: {e}");
                }
            });
        }
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = self.wait_until_deadline(&mut child, started)?;
        let out = self.collect(&stdout, child.id(), started)?;
        let err = String::from_utf8_lossy(&self.collect(&stderr, child.id(), started)?).into_owned();
        debug!("{} finished with {status} in {:?}", self.program, started.elapsed());

        if status.success() {
            Ok(out)
        } else {
            Err(CommandError::Exit { program: self.program.clone(),
                                     code: status.code(),
                                     stderr: tail(&err) })
        }
    }

    /// `input` serializado a JSON por stdin; stdout parseado como `T`.
    pub fn run_json<I, T>(&self, input: &I, extra_args: &[String]) -> Result<T, CommandError>
        where I: Serialize + ?Sized,
              T: DeserializeOwned
    {
        let bytes = serde_json::to_vec(input).map_err(|e| CommandError::Io { program: self.program.clone(),
                                                                             reason: format!("encode input: {e}") })?;
        let out = self.run_raw(Some(bytes), extra_args)?;
        serde_json::from_slice(&out).map_err(|e| CommandError::Decode { program: self.program.clone(),
                                                                        reason: e.to_string() })
    }

    fn wait_until_deadline(&self, child: &mut Child, started: Instant) -> Result<std::process::ExitStatus, CommandError> {
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) if started.elapsed() >= self.timeout => {
                    warn!("{} exceeded {:?}; killing", self.program, self.timeout);
                    kill_group(child.id());
                    if let Err(e) = child.kill() {
                        debug!("kill failed: {e}");
                    }
                    let _ = child.wait();
                    return Err(self.timed_out());
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    let _ = child.kill();
                    return Err(CommandError::Io { program: self.program.clone(),
                                                  reason: e.to_string() });
                }
            }
        }
    }

    /// Espera el drenado de un pipe dentro del tiempo que le queda al step.
    fn collect(&self, pipe: &Receiver<Vec<u8>>, pid: u32, started: Instant) -> Result<Vec<u8>, CommandError> {
        let remaining = self.timeout.saturating_sub(started.elapsed());
        match pipe.recv_timeout(remaining) {
            Ok(buf) => Ok(buf),
            Err(RecvTimeoutError::Disconnected) => Ok(Vec::new()),
            Err(RecvTimeoutError::Timeout) => {
                warn!("{} exited but its output stayed open past {:?}; killing its process group",
                      self.program,
                      self.timeout);
                kill_group(pid);
                Err(self.timed_out())
            }
        }
    }

    fn timed_out(&self) -> CommandError {
        CommandError::TimedOut { program: self.program.clone(),
                                 after: self.timeout }
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut p) = pipe {
            if let Err(e) = p.read_to_end(&mut buf) {
                debug!("pipe read failed: {e}");
            }
        }
        // el receptor pudo rendirse por timeout
        let _ = tx.send(buf);
    });
    rx
}

/// Mata el grupo de procesos que encabeza `pid` (hijo y nietos).
#[cfg(unix)]
fn kill_group(pid: u32) {
    let status = Command::new("kill").args(["-KILL", "--", &format!("-{pid}")])
                                     .stdin(Stdio::null())
                                     .stdout(Stdio::null())
                                     .stderr(Stdio::null())
                                     .status();
    if let Err(e) = status {
        debug!("could not signal process group {pid}: {e}");
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: u32) {}

fn tail(stderr: &str) -> String {
    let trimmed = stderr.trim();
    let count = trimmed.chars().count();
    if count <= STDERR_TAIL {
        return trimmed.to_string();
    }
    trimmed.chars().skip(count - STDERR_TAIL).collect()
}

fn split_words(line: &str) -> Result<Vec<String>, CommandError> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;
    for c in line.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), c) => current.push(c),
            (None, '\'' | '"') => {
                quote = Some(c);
                in_word = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            (None, c) => {
                current.push(c);
                in_word = true;
            }
        }
    }
    if quote.is_some() {
        return Err(CommandError::UnbalancedQuote(line.to_string()));
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_groups_quoted_words() {
        let spec = CommandSpec::parse("python3 scripts/extract.py --out 'my dir/x.json' \"\"", Duration::from_secs(1)).expect("parse");
        assert_eq!(spec.program, "python3");
        assert_eq!(spec.args, vec!["scripts/extract.py", "--out", "my dir/x.json", ""]);
    }

    #[test]
    fn parse_rejects_empty_and_unbalanced() {
        assert_eq!(CommandSpec::parse("   ", Duration::from_secs(1)), Err(CommandError::Empty));
        assert!(matches!(CommandSpec::parse("run 'oops", Duration::from_secs(1)), Err(CommandError::UnbalancedQuote(_))));
    }

    #[test]
    fn exit_codes_are_classified() {
        let exit = |code| CommandError::Exit { program: "x".into(),
                                               code: Some(code),
                                               stderr: String::new() };
        assert_eq!(exit(EXIT_TEMPFAIL).into_step_error(StepError::Extraction).kind(), pick_core::ErrorKind::Transient);
        assert_eq!(exit(EXIT_NOPERM).into_step_error(StepError::Extraction).kind(), pick_core::ErrorKind::Auth);
        assert_eq!(exit(1).into_step_error(StepError::Extraction).kind(), pick_core::ErrorKind::Extraction);
        let timeout = CommandError::TimedOut { program: "x".into(),
                                               after: Duration::from_millis(250) };
        assert_eq!(timeout.into_step_error(StepError::Submission), StepError::Timeout(250));
    }
}
