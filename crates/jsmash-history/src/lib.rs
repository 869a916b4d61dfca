//! # jsmash-history
//!
//! Replay log persistence for jsmash sessions.
//!
//! A replay log is a JSON-lines file: one header line identifying the session
//! and seed, then one line per generated step. Steps periodically carry a
//! full PRNG checkpoint, which is enough to regenerate every later step
//! without replaying the whole log.
//!
//! ## Architecture
//!
//! - **Entry**: Header and entry records with CRC32 integrity checks
//! - **Writer**: Append-only async log writer
//! - **Reader**: Strict and lenient log readers
//! - **Log**: In-memory log with truncation and checkpoint lookup
//!
//! ## Example
//!
//! ```rust,ignore
//! use jsmash_history::{LogHeader, ReplayLogEntry, ReplayLogReader, ReplayLogWriter};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut writer = ReplayLogWriter::create("run.jsonl", LogHeader::new(5489)).await?;
//!     writer.append(&ReplayLogEntry::new(1, "x = 1;")).await?;
//!     writer.flush().await?;
//!
//!     let log = ReplayLogReader::new("run.jsonl").read().await?;
//!     assert_eq!(log.entries().len(), 1);
//!     Ok(())
//! }
//! ```

pub mod checkpoint;
pub mod entry;
pub mod log;
pub mod reader;
pub mod writer;

pub use checkpoint::{checkpoints, ResumePoint};
pub use entry::{LogHeader, LogLine, ReplayLogEntry, LOG_VERSION};
pub use log::ReplayLog;
pub use reader::ReplayLogReader;
pub use writer::ReplayLogWriter;

/// Error types for the history module
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Replay log has no header line")]
    MissingHeader,

    #[error("Unsupported replay log version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("Unexpected header at line {line}")]
    UnexpectedHeader { line: usize },

    #[error("Malformed line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    #[error("Corrupted entry at line {line} (sequence {sequence})")]
    Corrupted { line: usize, sequence: u64 },

    #[error("Out-of-order entry: sequence {sequence} after {previous}")]
    OutOfOrder { sequence: u64, previous: u64 },

    #[error("Invalid checkpoint at sequence {0}")]
    InvalidCheckpoint(u64),
}

pub type Result<T> = std::result::Result<T, HistoryError>;
