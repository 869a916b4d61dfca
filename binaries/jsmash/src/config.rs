//! Loading the session configuration and applying command line overrides.

use std::path::Path;

use anyhow::Context;
use jsmash_driver::{RunMode, SessionConfig};
use rand::Rng;

use crate::{CliArgs, Command};

/// Loads configuration from a file, or the defaults when no file is given.
pub fn load(path: Option<&Path>) -> anyhow::Result<SessionConfig> {
    match path {
        Some(path) => SessionConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(SessionConfig::default()),
    }
}

/// Merges CLI arguments into the configuration.
pub fn merge_cli_args(config: &mut SessionConfig, args: &CliArgs) {
    if let Some(ref level) = args.log_level {
        config.logging.level = level.clone();
    }

    match &args.command {
        Command::Run(run) => {
            let session = &mut config.session;
            if let Some(seed) = run.seed {
                session.seed = Some(seed);
            }
            if let Some(max_steps) = run.max_steps {
                session.max_steps = Some(max_steps);
            }
            if let Some(chunk_size) = run.chunk_size {
                session.chunk_size = chunk_size;
            }
            if let Some(interval_ms) = run.interval_ms {
                session.interval_ms = interval_ms;
            }
            if let Some(checkpoint_every) = run.checkpoint_every {
                session.checkpoint_every = checkpoint_every;
            }
            if let Some(depth) = run.depth {
                session.start_depth = depth;
            }

            if let Some(ref path) = run.record {
                session.mode = RunMode::Record;
                session.log_path = Some(path.clone());
            } else if session.mode == RunMode::Replay {
                session.mode = RunMode::Immediate;
            }
            session.continue_after_log = false;

            if let Some(p) = run.torture_probability {
                config.grammar.torture_probability = p;
            }
            if let Some(p) = run.escape_hatch_probability {
                config.grammar.escape_hatch_probability = p;
            }
            merge_oracle(config, &run.oracle);
        }
        Command::Replay(replay) => {
            config.session.mode = RunMode::Replay;
            config.session.log_path = Some(replay.log.clone());
            config.session.continue_after_log = replay.continue_after_log;
            if let Some(max_steps) = replay.max_steps {
                config.session.max_steps = Some(max_steps);
            }
            merge_oracle(config, &replay.oracle);
        }
        Command::Reduce(reduce) => {
            if !reduce.threw.is_empty() {
                config.stop.threw_substrings = reduce.threw.clone();
            }
            if reduce.timeout_is_interesting {
                config.stop.on_timeout = true;
            }
            merge_oracle(config, &reduce.oracle);
        }
        Command::PrintConfig => {}
    }
}

fn merge_oracle(config: &mut SessionConfig, command: &[String]) {
    if !command.is_empty() {
        config.oracle.command = command.to_vec();
    }
}

/// Fills in a random seed when none is configured.
///
/// Returns the seed and whether it was drawn.
pub fn ensure_seed(config: &mut SessionConfig) -> (u32, bool) {
    match config.session.seed {
        Some(seed) => (seed, false),
        None => {
            let seed = rand::thread_rng().gen::<u32>();
            config.session.seed = Some(seed);
            (seed, true)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::path::PathBuf;

    #[test]
    fn test_load_default_and_file() {
        let config = load(None).unwrap();
        assert_eq!(config, SessionConfig::default());

        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("jsmash.toml");
        std::fs::write(&path, "[session]\nseed = 9\nchunk_size = 5\n").unwrap();
        let config = load(Some(path.as_path())).unwrap();
        assert_eq!(config.session.seed, Some(9));
        assert_eq!(config.session.chunk_size, 5);

        let missing = temp_dir.path().join("missing.toml");
        let err = load(Some(missing.as_path())).unwrap_err();
        assert!(err.to_string().contains("missing.toml"));
    }

    #[test]
    fn test_merge_run_args() {
        let mut config = SessionConfig::default();
        let args = CliArgs::parse_from([
            "jsmash",
            "--log-level",
            "debug",
            "run",
            "--seed",
            "5489",
            "--max-steps",
            "50",
            "--record",
            "out/run.jsonl",
            "--torture-probability",
            "0",
            "--",
            "d8",
            "--fuzzing",
        ]);
        merge_cli_args(&mut config, &args);

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.session.seed, Some(5489));
        assert_eq!(config.session.max_steps, Some(50));
        assert_eq!(config.session.mode, RunMode::Record);
        assert_eq!(config.session.log_path, Some(PathBuf::from("out/run.jsonl")));
        assert_eq!(config.grammar.torture_probability, 0.0);
        assert_eq!(config.oracle.command, ["d8", "--fuzzing"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_merge_replay_args() {
        let mut config = SessionConfig::default();
        let args = CliArgs::parse_from(["jsmash", "replay", "run.jsonl", "--continue"]);
        merge_cli_args(&mut config, &args);

        assert_eq!(config.session.mode, RunMode::Replay);
        assert_eq!(config.session.log_path, Some(PathBuf::from("run.jsonl")));
        assert!(config.session.continue_after_log);
        assert!(config.oracle.command.is_empty());
    }

    #[test]
    fn test_merge_reduce_args() {
        let mut config = SessionConfig::default();
        config.stop.on_timeout = false;
        let args = CliArgs::parse_from([
            "jsmash",
            "reduce",
            "run.jsonl",
            "--threw",
            "CRASH",
            "--timeout-is-interesting",
        ]);
        merge_cli_args(&mut config, &args);

        assert_eq!(config.stop.threw_substrings, ["CRASH"]);
        assert!(config.stop.on_timeout);
    }

    #[test]
    fn test_ensure_seed() {
        let mut config = SessionConfig::default();
        config.session.seed = Some(1);
        assert_eq!(ensure_seed(&mut config), (1, false));

        config.session.seed = None;
        let (seed, drawn) = ensure_seed(&mut config);
        assert!(drawn);
        assert_eq!(config.session.seed, Some(seed));
    }
}
