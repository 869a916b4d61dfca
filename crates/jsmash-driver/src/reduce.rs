//! Replay log reduction by delta debugging.
//!
//! Implements DDMIN from "Simplifying and Isolating Failure-Inducing Input"
//! (Zeller & Hildebrandt, 2002) over replay log entries. A candidate is a
//! subset of the entries, kept in log order; it is checked by running the
//! concatenation of its texts through the oracle as one program, so state
//! built up by earlier steps is visible to later ones just as in the
//! original session.

use std::time::{Duration, Instant};

use jsmash_history::ReplayLogEntry;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::error::{ReduceError, ReduceResult};
use crate::oracle::{ExecutionOutcome, Oracle};

/// Reduction limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReduceConfig {
    /// Maximum DDMIN iterations.
    pub max_iterations: usize,
    /// Give up after this long.
    pub max_duration: Option<Duration>,
    /// Re-check the final candidate.
    pub verify_final: bool,
}

impl Default for ReduceConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1_000,
            max_duration: None,
            verify_final: true,
        }
    }
}

/// Statistics collected during reduction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReductionStats {
    pub original_size: usize,
    pub final_size: usize,
    /// Oracle runs, including the initial and final checks
    pub checks_performed: usize,
    pub successful_removals: usize,
    pub failed_removals: usize,
    pub granularity_increases: usize,
    pub iterations: usize,
    pub duration_ms: u64,
}

impl ReductionStats {
    /// Fraction of entries removed.
    pub fn reduction_ratio(&self) -> f64 {
        if self.original_size == 0 {
            return 0.0;
        }
        1.0 - self.final_size as f64 / self.original_size as f64
    }
}

/// The smallest interesting subset found.
#[derive(Debug, Clone)]
pub struct Reduction {
    pub entries: Vec<ReplayLogEntry>,
    pub stats: ReductionStats,
}

/// Reduce `entries` with the default limits.
pub async fn reduce_log<F>(
    entries: &[ReplayLogEntry],
    oracle: &dyn Oracle,
    is_interesting: F,
) -> ReduceResult<Reduction>
where
    F: Fn(&ExecutionOutcome) -> bool + Send + Sync,
{
    Reducer::new(ReduceConfig::default())
        .reduce(entries, oracle, is_interesting)
        .await
}

/// Delta debugging reducer.
#[derive(Debug, Clone, Default)]
pub struct Reducer {
    config: ReduceConfig,
}

impl Reducer {
    pub fn new(config: ReduceConfig) -> Self {
        Self { config }
    }

    /// Find a small subset of `entries` that is still interesting.
    pub async fn reduce<F>(
        &self,
        entries: &[ReplayLogEntry],
        oracle: &dyn Oracle,
        is_interesting: F,
    ) -> ReduceResult<Reduction>
    where
        F: Fn(&ExecutionOutcome) -> bool + Send + Sync,
    {
        if entries.is_empty() {
            return Err(ReduceError::EmptyLog);
        }

        let start = Instant::now();
        let mut check = Checker {
            oracle,
            is_interesting: &is_interesting,
            stats: ReductionStats {
                original_size: entries.len(),
                ..ReductionStats::default()
            },
        };

        info!(
            original_size = entries.len(),
            oracle = oracle.name(),
            "Starting log reduction"
        );

        if !check.run(entries).await? {
            return Err(ReduceError::NotInteresting);
        }

        let reduced = self.ddmin(entries.to_vec(), &mut check, start).await?;

        if self.config.verify_final && reduced.len() < entries.len() && !check.run(&reduced).await? {
            warn!("Reduced log no longer interesting");
            return Err(ReduceError::LostInterest);
        }

        let mut stats = check.stats;
        stats.final_size = reduced.len();
        stats.duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        info!(
            original_size = stats.original_size,
            final_size = stats.final_size,
            checks = stats.checks_performed,
            duration_ms = stats.duration_ms,
            "Log reduction complete"
        );

        Ok(Reduction {
            entries: reduced,
            stats,
        })
    }

    async fn ddmin(
        &self,
        entries: Vec<ReplayLogEntry>,
        check: &mut Checker<'_>,
        start: Instant,
    ) -> ReduceResult<Vec<ReplayLogEntry>> {
        let mut current = entries;
        let mut n = 2;
        let mut iteration = 0;

        while current.len() >= 2 {
            iteration += 1;
            check.stats.iterations = iteration;
            if iteration > self.config.max_iterations {
                return Err(ReduceError::MaxIterationsReached(self.config.max_iterations));
            }
            if let Some(limit) = self.config.max_duration {
                if start.elapsed() > limit {
                    return Err(ReduceError::Timeout(limit));
                }
            }

            trace!(
                iteration,
                current_size = current.len(),
                granularity = n,
                "DDMIN iteration"
            );

            let chunks = split_into_chunks(&current, n);
            let mut reduced = false;

            for (i, chunk) in chunks.iter().enumerate() {
                if check.run(chunk).await? {
                    debug!(chunk_index = i, chunk_size = chunk.len(), "Reduced to subset");
                    current = chunk.clone();
                    n = 2;
                    reduced = true;
                    check.stats.successful_removals += 1;
                    break;
                }
                check.stats.failed_removals += 1;
            }
            if reduced {
                continue;
            }

            if chunks.len() > 2 {
                for i in 0..chunks.len() {
                    let complement = complement_of(&chunks, i);
                    if check.run(&complement).await? {
                        debug!(
                            chunk_index = i,
                            removed = current.len() - complement.len(),
                            "Reduced to complement"
                        );
                        current = complement;
                        n = (n - 1).max(2);
                        reduced = true;
                        check.stats.successful_removals += 1;
                        break;
                    }
                    check.stats.failed_removals += 1;
                }
                if reduced {
                    continue;
                }
            }

            if n >= current.len() {
                debug!(final_size = current.len(), "Maximum granularity reached");
                break;
            }
            n = (2 * n).min(current.len());
            check.stats.granularity_increases += 1;
        }

        Ok(current)
    }
}

struct Checker<'a> {
    oracle: &'a dyn Oracle,
    is_interesting: &'a (dyn Fn(&ExecutionOutcome) -> bool + Send + Sync),
    stats: ReductionStats,
}

impl Checker<'_> {
    async fn run(&mut self, candidate: &[ReplayLogEntry]) -> ReduceResult<bool> {
        self.stats.checks_performed += 1;
        let program = join_texts(candidate);
        let timeout = candidate.iter().filter_map(|e| e.timeout_override()).max();
        let outcome = self.oracle.execute(&program, timeout).await?;
        let interesting = (self.is_interesting)(&outcome);
        trace!(size = candidate.len(), interesting, "Candidate checked");
        Ok(interesting)
    }
}

/// Texts of `entries` joined into one program.
pub fn join_texts(entries: &[ReplayLogEntry]) -> String {
    let mut program = String::new();
    for entry in entries {
        program.push_str(&entry.text);
        program.push('\n');
    }
    program
}

fn split_into_chunks(entries: &[ReplayLogEntry], n: usize) -> Vec<Vec<ReplayLogEntry>> {
    if n == 0 || entries.is_empty() {
        return Vec::new();
    }
    let chunk_size = entries.len().div_ceil(n);
    entries.chunks(chunk_size).map(|c| c.to_vec()).collect()
}

fn complement_of(chunks: &[Vec<ReplayLogEntry>], skip: usize) -> Vec<ReplayLogEntry> {
    chunks
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != skip)
        .flat_map(|(_, chunk)| chunk.iter().cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{BlockingOracle, NullOracle};

    fn entries(n: u64) -> Vec<ReplayLogEntry> {
        (1..=n)
            .map(|i| ReplayLogEntry::new(i, format!("s{i};")))
            .collect()
    }

    /// Throws when both `s3;` and `s11;` are present.
    fn pair_oracle() -> BlockingOracle {
        BlockingOracle::new("pair", Duration::from_secs(1), |program| {
            let lines: Vec<&str> = program.lines().collect();
            if lines.contains(&"s3;") && lines.contains(&"s11;") {
                ExecutionOutcome::Threw("crash".to_string())
            } else {
                ExecutionOutcome::Completed(String::new())
            }
        })
    }

    #[tokio::test]
    async fn test_reduces_to_interacting_pair() {
        let oracle = pair_oracle();
        let reduction = reduce_log(&entries(16), &oracle, ExecutionOutcome::is_threw)
            .await
            .unwrap();

        let kept: Vec<u64> = reduction.entries.iter().map(|e| e.sequence).collect();
        assert_eq!(kept, [3, 11]);
        assert_eq!(reduction.stats.original_size, 16);
        assert_eq!(reduction.stats.final_size, 2);
        assert!(reduction.stats.checks_performed > 2);
        assert!(reduction.stats.reduction_ratio() > 0.8);
    }

    #[tokio::test]
    async fn test_single_culprit() {
        let oracle = BlockingOracle::new("one", Duration::from_secs(1), |program| {
            if program.contains("s7;") {
                ExecutionOutcome::TimedOut
            } else {
                ExecutionOutcome::Completed(String::new())
            }
        });
        let reduction = reduce_log(&entries(9), &oracle, ExecutionOutcome::is_timed_out)
            .await
            .unwrap();
        assert_eq!(reduction.entries.len(), 1);
        assert_eq!(reduction.entries[0].text, "s7;");
    }

    #[tokio::test]
    async fn test_not_interesting() {
        let oracle = NullOracle::default();
        let err = reduce_log(&entries(4), &oracle, ExecutionOutcome::is_threw)
            .await
            .unwrap_err();
        assert!(matches!(err, ReduceError::NotInteresting));

        let err = reduce_log(&[], &oracle, ExecutionOutcome::is_threw)
            .await
            .unwrap_err();
        assert!(matches!(err, ReduceError::EmptyLog));
    }

    #[tokio::test]
    async fn test_iteration_limit() {
        let reducer = Reducer::new(ReduceConfig {
            max_iterations: 1,
            ..ReduceConfig::default()
        });
        let oracle = pair_oracle();
        let err = reducer
            .reduce(&entries(16), &oracle, ExecutionOutcome::is_threw)
            .await
            .unwrap_err();
        assert!(matches!(err, ReduceError::MaxIterationsReached(1)));
    }

    #[test]
    fn test_join_texts() {
        assert_eq!(join_texts(&entries(2)), "s1;\ns2;\n");
        let chunks = split_into_chunks(&entries(5), 2);
        assert_eq!(chunks.len(), 2);
        assert_eq!(complement_of(&chunks, 0).len(), 2);
    }
}
