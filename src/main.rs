use pickflow::app;
use pickflow::config::{self, AppConfig};
use pickflow::errors::AppError;

const USAGE: &str = "uso: pickflow <run | login | check | history [--limit N]>";

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    // CLI mínima: `pickflow run`, `pickflow login`, `pickflow check`, `pickflow history [--limit N]`
    let args: Vec<String> = std::env::args().collect();
    let code = match args.get(1).map(String::as_str) {
        Some("run") => cmd_run(),
        Some("login") => with_config(cmd_login),
        Some("check") => with_config(cmd_check),
        Some("history") => match parse_limit(&args[2..]) {
            Some(limit) => with_config(|cfg| cmd_history(cfg, limit)),
            None => {
                eprintln!("{USAGE}");
                2
            }
        },
        _ => {
            eprintln!("{USAGE}");
            2
        }
    };
    std::process::exit(code);
}

fn with_config<F>(f: F) -> i32
    where F: FnOnce(&AppConfig) -> Result<i32, AppError>
{
    let result = AppConfig::from_env().and_then(|cfg| f(&cfg));
    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("[pickflow] {e}");
            e.exit_code()
        }
    }
}

// `run` alerta también cuando la configuración no carga: nadie lee el
// stderr del scheduler.
fn cmd_run() -> i32 {
    let cfg = match AppConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            app::alert_not_started(config::notify_command_from_env().as_deref(), &e);
            eprintln!("[pickflow] {e}");
            return e.exit_code();
        }
    };
    match app::run_scheduled(&cfg) {
        Ok(run) => {
            println!("{}", app::summarize(&run));
            run.outcome().exit_code()
        }
        Err(e) => {
            eprintln!("[pickflow] {e}");
            e.exit_code()
        }
    }
}

fn cmd_login(cfg: &AppConfig) -> Result<i32, AppError> {
    let credential = app::login(cfg)?;
    match credential.expires_at {
        Some(at) => println!("login ok; credential valid until about {at}"),
        None => println!("login ok"),
    }
    Ok(0)
}

fn cmd_check(cfg: &AppConfig) -> Result<i32, AppError> {
    let state = app::check(cfg)?;
    println!("{state}");
    Ok(if state.is_valid() { 0 } else { 1 })
}

fn cmd_history(cfg: &AppConfig, limit: usize) -> Result<i32, AppError> {
    for run in app::history(cfg, limit)? {
        println!("{}", app::summarize(&run));
    }
    Ok(0)
}

fn parse_limit(rest: &[String]) -> Option<usize> {
    match rest {
        [] => Some(10),
        [flag, n] if flag == "--limit" => n.parse().ok().filter(|n| *n > 0),
        _ => None,
    }
}
