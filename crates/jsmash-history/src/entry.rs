//! Records stored in a replay log.

use std::time::Duration;

use chrono::{DateTime, Utc};
use jsmash_core::PrngState;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Format version written to every header.
pub const LOG_VERSION: u32 = 1;

/// First line of every replay log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogHeader {
    /// Format version
    pub version: u32,
    /// Identifier of the recording session
    pub session_id: Uuid,
    /// Seed the session was started with
    pub seed: u32,
    /// When the log was created
    pub created_at: DateTime<Utc>,
}

impl LogHeader {
    /// A header for a new session.
    pub fn new(seed: u32) -> Self {
        Self {
            version: LOG_VERSION,
            session_id: Uuid::new_v4(),
            seed,
            created_at: Utc::now(),
        }
    }
}

/// One generated step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayLogEntry {
    /// Step number, strictly increasing within a log
    pub sequence: u64,
    /// The generated text, verbatim
    pub text: String,
    /// PRNG state right after this step was generated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint: Option<PrngState>,
    /// Whether this step closed a chunk
    #[serde(default)]
    pub chunk_boundary: bool,
    /// Per-step oracle timeout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_override_ms: Option<u64>,
    /// Per-step pause after a chunk boundary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_override_ms: Option<u64>,
    /// CRC32 checksum for integrity verification
    pub checksum: u32,
}

impl ReplayLogEntry {
    /// Create a new entry with its checksum filled in.
    pub fn new(sequence: u64, text: impl Into<String>) -> Self {
        let mut entry = Self {
            sequence,
            text: text.into(),
            checkpoint: None,
            chunk_boundary: false,
            timeout_override_ms: None,
            interval_override_ms: None,
            checksum: 0,
        };
        entry.seal();
        entry
    }

    pub fn with_checkpoint(mut self, checkpoint: PrngState) -> Self {
        self.checkpoint = Some(checkpoint);
        self.seal();
        self
    }

    pub fn with_chunk_boundary(mut self, chunk_boundary: bool) -> Self {
        self.chunk_boundary = chunk_boundary;
        self.seal();
        self
    }

    pub fn with_timeout_override(mut self, timeout: Duration) -> Self {
        self.timeout_override_ms = Some(duration_millis(timeout));
        self.seal();
        self
    }

    pub fn with_interval_override(mut self, interval: Duration) -> Self {
        self.interval_override_ms = Some(duration_millis(interval));
        self.seal();
        self
    }

    pub fn timeout_override(&self) -> Option<Duration> {
        self.timeout_override_ms.map(Duration::from_millis)
    }

    pub fn interval_override(&self) -> Option<Duration> {
        self.interval_override_ms.map(Duration::from_millis)
    }

    /// Recompute the checksum after a field was changed.
    pub fn seal(&mut self) {
        self.checksum = self.calculate_checksum();
    }

    /// Calculate the CRC32 checksum over every field but the checksum.
    pub fn calculate_checksum(&self) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&self.sequence.to_le_bytes());
        hasher.update(&(self.text.len() as u64).to_le_bytes());
        hasher.update(self.text.as_bytes());
        match &self.checkpoint {
            Some(state) => {
                hasher.update(&[1]);
                hasher.update(&(state.index as u64).to_le_bytes());
                for word in &state.words {
                    hasher.update(&word.to_le_bytes());
                }
            }
            None => hasher.update(&[0]),
        }
        hasher.update(&[u8::from(self.chunk_boundary)]);
        for value in [self.timeout_override_ms, self.interval_override_ms] {
            match value {
                Some(ms) => {
                    hasher.update(&[1]);
                    hasher.update(&ms.to_le_bytes());
                }
                None => hasher.update(&[0]),
            }
        }
        hasher.finalize()
    }

    /// Verify the integrity of this entry.
    pub fn verify(&self) -> bool {
        self.checksum == self.calculate_checksum()
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// One line of a replay log file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LogLine {
    Header(LogHeader),
    Entry(ReplayLogEntry),
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsmash_core::Mt19937;

    #[test]
    fn test_entry_checksum() {
        let entry = ReplayLogEntry::new(1, "x = 1;")
            .with_chunk_boundary(true)
            .with_checkpoint(Mt19937::new(3).export_state());
        assert!(entry.verify());
    }

    #[test]
    fn test_entry_checksum_tamper_detection() {
        let mut entry = ReplayLogEntry::new(1, "x = 1;");
        entry.text.push(';');
        assert!(!entry.verify());

        let mut entry = ReplayLogEntry::new(1, "x = 1;").with_checkpoint(Mt19937::new(3).export_state());
        if let Some(state) = entry.checkpoint.as_mut() {
            state.words[100] ^= 1;
        }
        assert!(!entry.verify());
    }

    #[test]
    fn test_line_tagging() {
        let line = LogLine::Entry(ReplayLogEntry::new(7, "f();").with_timeout_override(Duration::from_millis(250)));
        let json = serde_json::to_string(&line).unwrap();
        assert!(json.starts_with("{\"kind\":\"entry\""));
        assert!(json.contains("\"timeout_override_ms\":250"));
        assert!(!json.contains("checkpoint"));

        let back: LogLine = serde_json::from_str(&json).unwrap();
        assert_eq!(back, line);

        let header = serde_json::to_string(&LogLine::Header(LogHeader::new(5489))).unwrap();
        assert!(header.contains("\"kind\":\"header\""));
        assert!(header.contains("\"seed\":5489"));
    }
}
