//! jsmash - Randomized program generator for stress-testing script runtimes.
//!
//! # Usage
//!
//! ```bash
//! # Generate forever, piping each program into a runtime
//! jsmash run -- d8 --fuzzing
//!
//! # Record 10000 steps to a replay log
//! jsmash run --seed 5489 --max-steps 10000 --record run.jsonl -- d8
//!
//! # Play a log back, then keep generating where it left off
//! jsmash replay run.jsonl --continue -- d8
//!
//! # Shrink a log to the steps that still crash the runtime
//! jsmash reduce run.jsonl --threw "Assertion failure" -- d8
//!
//! # Print the default configuration
//! jsmash print-config > jsmash.toml
//! ```

mod config;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use jsmash_driver::{
    oracle, Driver, ExecutionOutcome, LoggingConfig, PauseControl, ReduceConfig, Reducer,
    RunState, SessionConfig,
};
use jsmash_history::{ReplayLog, ReplayLogReader, ReplayLogWriter};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// CLI arguments for jsmash.
#[derive(Parser, Debug)]
#[command(
    name = "jsmash",
    about = "Randomized program generator for stress-testing script runtimes",
    version
)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, value_name = "LEVEL", global = true)]
    log_level: Option<String>,

    /// Enable JSON log output.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate and execute programs.
    Run(RunArgs),
    /// Execute the programs of a replay log.
    Replay(ReplayArgs),
    /// Shrink a replay log to a smaller log that is still interesting.
    Reduce(ReduceArgs),
    /// Print the default configuration and exit.
    PrintConfig,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// PRNG seed; random when unset.
    #[arg(long)]
    seed: Option<u32>,

    /// Stop after this many steps.
    #[arg(long, value_name = "N")]
    max_steps: Option<u64>,

    /// Steps per chunk.
    #[arg(long, value_name = "N")]
    chunk_size: Option<u64>,

    /// Pause between chunks in milliseconds.
    #[arg(long, value_name = "MS")]
    interval_ms: Option<u64>,

    /// Store a PRNG checkpoint every N steps.
    #[arg(long, value_name = "N")]
    checkpoint_every: Option<u64>,

    /// Depth budget of each statement.
    #[arg(long)]
    depth: Option<i32>,

    /// Record every step to this replay log.
    #[arg(long, value_name = "FILE")]
    record: Option<PathBuf>,

    /// Chance per token assembly of corrupting the output.
    #[arg(long, value_name = "P")]
    torture_probability: Option<f64>,

    /// Chance per dispatch of substituting a random generator.
    #[arg(long, value_name = "P")]
    escape_hatch_probability: Option<f64>,

    /// Write the run report to this file instead of stdout.
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,

    /// Runtime command; the program is written to its stdin.
    #[arg(last = true, value_name = "COMMAND")]
    oracle: Vec<String>,
}

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Replay log to play.
    #[arg(value_name = "LOG")]
    log: PathBuf,

    /// Keep generating after the log is exhausted.
    #[arg(long = "continue")]
    continue_after_log: bool,

    /// Stop after this many steps.
    #[arg(long, value_name = "N")]
    max_steps: Option<u64>,

    /// Write the run report to this file instead of stdout.
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,

    /// Runtime command; the program is written to its stdin.
    #[arg(last = true, value_name = "COMMAND")]
    oracle: Vec<String>,
}

#[derive(Args, Debug)]
pub struct ReduceArgs {
    /// Replay log to reduce.
    #[arg(value_name = "LOG")]
    log: PathBuf,

    /// Where to write the reduced log [default: LOG with a .reduced.jsonl extension].
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// A thrown message containing this is interesting (repeatable).
    #[arg(long, value_name = "TEXT")]
    threw: Vec<String>,

    /// A timeout is interesting.
    #[arg(long)]
    timeout_is_interesting: bool,

    /// Maximum reduction iterations.
    #[arg(long, value_name = "N")]
    max_iterations: Option<usize>,

    /// Runtime command; the program is written to its stdin.
    #[arg(last = true, value_name = "COMMAND")]
    oracle: Vec<String>,
}

/// Initialize tracing/logging.
fn init_tracing(config: &LoggingConfig, json_logs: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .context("Failed to parse log filter")?;

    let format = if json_logs || config.format == "json" {
        "json"
    } else {
        &config.format
    };

    // Logs go to stderr; stdout carries reports.
    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;
        }
        "compact" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().pretty().with_writer(std::io::stderr))
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;
        }
    }

    Ok(())
}

/// Resolves when Ctrl+C or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

async fn run_session(config: SessionConfig, report_path: Option<&Path>) -> Result<()> {
    let oracle = oracle::from_config(&config.oracle).context("Failed to set up oracle")?;
    let control = PauseControl::new();
    let run_state = RunState::new(&config.session, control.clone());
    let driver = Driver::new(&config, oracle)
        .context("Failed to create driver")?
        .with_run_state(run_state);

    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received, stopping after the current step");
        control.stop();
    });

    let report = driver.run().await.context("Session failed")?;
    let json = serde_json::to_string_pretty(&report)?;
    match report_path {
        Some(path) => {
            tokio::fs::write(path, json)
                .await
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            info!(path = %path.display(), "Report written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

async fn reduce_log(config: SessionConfig, args: &ReduceArgs) -> Result<()> {
    let log = ReplayLogReader::new(&args.log)
        .read_lenient()
        .await
        .with_context(|| format!("Failed to read {}", args.log.display()))?;
    let oracle = oracle::from_config(&config.oracle).context("Failed to set up oracle")?;

    let policy = config.stop.clone();
    let is_interesting = move |outcome: &ExecutionOutcome| match outcome {
        ExecutionOutcome::Threw(message) => policy.matches_threw(message),
        ExecutionOutcome::TimedOut => policy.on_timeout,
        ExecutionOutcome::Completed(_) => false,
    };

    let mut reduce_config = ReduceConfig::default();
    if let Some(max_iterations) = args.max_iterations {
        reduce_config.max_iterations = max_iterations;
    }
    let reduction = Reducer::new(reduce_config)
        .reduce(log.entries(), &*oracle, is_interesting)
        .await
        .context("Reduction failed")?;

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| args.log.with_extension("reduced.jsonl"));
    let (header, _) = log.into_parts();
    let reduced = ReplayLog::from_entries(header, reduction.entries)?;
    ReplayLogWriter::write_log(&output, &reduced)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;

    info!(
        output = %output.display(),
        kept = reduced.len(),
        "Reduced log written"
    );
    println!("{}", serde_json::to_string_pretty(&reduction.stats)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = CliArgs::parse();

    if let Command::PrintConfig = args.command {
        println!("{}", SessionConfig::default().to_toml()?);
        return Ok(());
    }

    // Load configuration
    let mut config = config::load(args.config.as_deref())?;
    config::merge_cli_args(&mut config, &args);
    config.validate().context("Invalid configuration")?;

    init_tracing(&config.logging, args.json_logs)?;

    info!(version = env!("CARGO_PKG_VERSION"), "jsmash starting");

    let result = match &args.command {
        Command::Run(run) => {
            let (seed, drawn) = config::ensure_seed(&mut config);
            if drawn {
                info!(seed, "No seed configured, drew a random seed");
            }
            run_session(config, run.report.as_deref()).await
        }
        Command::Replay(replay) => run_session(config, replay.report.as_deref()).await,
        Command::Reduce(reduce) => reduce_log(config, reduce).await,
        Command::PrintConfig => Ok(()),
    };

    if let Err(e) = &result {
        error!(error = %e, "jsmash failed");
    }
    result
}
