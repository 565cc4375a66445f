//! Binary entrypoint for the `automate` script runner.
use std::{
    fs,
    path::{Path, PathBuf},
    process,
    sync::Arc,
    thread,
    time::Duration,
};

use automate_engine::{Engine, EngineConfig, EvalError, check_syntax};
use clap::{Parser, Subcommand};
use logging::{self as logshared, LogArgs};
use tracing::{debug, warn};

use crate::fixture::FixtureHost;

/// Replayed host answers.
mod fixture;

/// Exit code for a script that failed.
const EXIT_FAILURE: i32 = 1;
/// Exit code for a script stopped by the watchdog.
const EXIT_CANCELLED: i32 = 130;

#[derive(Parser, Debug)]
#[command(name = "automate", about = "Run automation scripts against a host", version)]
/// Command-line interface for the `automate` binary.
struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    command: Command,

    /// Logging controls
    #[command(flatten)]
    log: LogArgs,
}

#[derive(Subcommand, Debug)]
/// Top-level CLI subcommands.
enum Command {
    /// Evaluate a script and print its completion value.
    Run {
        /// Script to run.
        script: PathBuf,

        /// Engine configuration (RON).
        #[arg(long)]
        config: Option<PathBuf>,

        /// JSON fixture of canned host answers; without one every request goes unanswered.
        #[arg(long)]
        host: Option<PathBuf>,

        /// Interrupt the script after this many milliseconds.
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// Compile a script without running it.
    Check {
        /// Script to check.
        script: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    logshared::init(&cli.log);

    let code = match &cli.command {
        Command::Run {
            script,
            config,
            host,
            timeout_ms,
        } => run(script, config.as_deref(), host.as_deref(), *timeout_ms),
        Command::Check { script } => check(script),
    };
    process::exit(code);
}

/// Read a script, reporting failures on stderr.
fn read_script(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(source) => Some(source),
        Err(e) => {
            eprintln!("failed to read {}: {e}", path.display());
            None
        }
    }
}

/// `automate run`.
fn run(script: &Path, config: Option<&Path>, host: Option<&Path>, timeout_ms: Option<u64>) -> i32 {
    let Some(source) = read_script(script) else {
        return EXIT_FAILURE;
    };
    let config = match config.map(EngineConfig::load).transpose() {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => {
            eprintln!("{e}");
            return EXIT_FAILURE;
        }
    };
    let host = match host.map(FixtureHost::load).transpose() {
        Ok(host) => host.unwrap_or_default(),
        Err(e) => {
            eprintln!("{e}");
            return EXIT_FAILURE;
        }
    };

    let mut engine = Engine::new(config);
    engine.initialize(Arc::new(host));

    if let Some(ms) = timeout_ms {
        let handle = engine.interrupt_handle();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(ms));
            warn!(timeout_ms = ms, "script timed out; interrupting");
            handle.interrupt();
        });
    }

    let name = script.display().to_string();
    debug!(script = %name, "running");
    match engine.evaluate(&source, &name) {
        Ok(value) => {
            println!("{value}");
            0
        }
        Err(EvalError::Exited) => 0,
        Err(e) if e.is_cancelled() => {
            eprintln!("{e}");
            EXIT_CANCELLED
        }
        Err(e) => {
            eprintln!("{}", e.pretty());
            EXIT_FAILURE
        }
    }
}

/// `automate check`.
fn check(script: &Path) -> i32 {
    let Some(source) = read_script(script) else {
        return EXIT_FAILURE;
    };
    match check_syntax(&source, &script.display().to_string()) {
        Ok(()) => {
            println!("OK");
            0
        }
        Err(e) => {
            eprintln!("{}", e.pretty());
            EXIT_FAILURE
        }
    }
}
