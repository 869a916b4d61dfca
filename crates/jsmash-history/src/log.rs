//! In-memory replay log.

use crate::checkpoint::ResumePoint;
use crate::entry::{LogHeader, LogLine, ReplayLogEntry};
use crate::reader::LineParser;
use crate::{HistoryError, Result};

/// A header and its entries, in sequence order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayLog {
    header: LogHeader,
    entries: Vec<ReplayLogEntry>,
}

impl ReplayLog {
    pub fn new(header: LogHeader) -> Self {
        Self {
            header,
            entries: Vec::new(),
        }
    }

    /// Build a log from entries, checking their order.
    pub fn from_entries(header: LogHeader, entries: Vec<ReplayLogEntry>) -> Result<Self> {
        let mut log = Self::new(header);
        for entry in entries {
            log.push(entry)?;
        }
        Ok(log)
    }

    /// Append an entry; sequences must strictly increase.
    pub fn push(&mut self, entry: ReplayLogEntry) -> Result<()> {
        if let Some(previous) = self.last_sequence() {
            if entry.sequence <= previous {
                return Err(HistoryError::OutOfOrder {
                    sequence: entry.sequence,
                    previous,
                });
            }
        }
        self.entries.push(entry);
        Ok(())
    }

    pub fn header(&self) -> &LogHeader {
        &self.header
    }

    pub fn entries(&self) -> &[ReplayLogEntry] {
        &self.entries
    }

    pub fn into_parts(self) -> (LogHeader, Vec<ReplayLogEntry>) {
        (self.header, self.entries)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last_sequence(&self) -> Option<u64> {
        self.entries.last().map(|e| e.sequence)
    }

    /// Drop every entry with a sequence greater than `sequence`.
    pub fn truncate_after(&mut self, sequence: u64) {
        self.entries.retain(|e| e.sequence <= sequence);
    }

    /// Entries with a sequence greater than `sequence`.
    pub fn entries_after(&self, sequence: u64) -> &[ReplayLogEntry] {
        let start = self.entries.partition_point(|e| e.sequence <= sequence);
        &self.entries[start..]
    }

    /// The last checkpoint in the log.
    pub fn resume_point(&self) -> Result<Option<ResumePoint>> {
        ResumePoint::latest(&self.entries)
    }

    /// Serialize as JSON lines, header first.
    pub fn to_json_lines(&self) -> Result<String> {
        let mut out = serde_json::to_string(&LogLine::Header(self.header.clone()))?;
        out.push('\n');
        for entry in &self.entries {
            out.push_str(&serde_json::to_string(&LogLine::Entry(entry.clone()))?);
            out.push('\n');
        }
        Ok(out)
    }

    /// Parse JSON lines, rejecting corrupted entries.
    pub fn from_json_lines(text: &str) -> Result<Self> {
        let mut parser = LineParser::strict();
        for (i, line) in text.lines().enumerate() {
            parser.feed(i + 1, line)?;
        }
        parser.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsmash_core::Mt19937;
    use std::time::Duration;

    fn sample_log() -> ReplayLog {
        let mut log = ReplayLog::new(LogHeader::new(42));
        for seq in 1..=6u64 {
            let mut entry = ReplayLogEntry::new(seq, format!("x{seq} = \"\\u2028\";"));
            if seq % 3 == 0 {
                entry = entry
                    .with_chunk_boundary(true)
                    .with_checkpoint(Mt19937::new(seq as u32).export_state());
            }
            if seq == 4 {
                entry = entry.with_interval_override(Duration::from_millis(5));
            }
            log.push(entry).unwrap();
        }
        log
    }

    #[test]
    fn test_json_lines_round_trip() {
        let log = sample_log();
        let text = log.to_json_lines().unwrap();
        assert_eq!(text.lines().count(), 7);
        assert_eq!(ReplayLog::from_json_lines(&text).unwrap(), log);
    }

    #[test]
    fn test_push_rejects_out_of_order() {
        let mut log = sample_log();
        let err = log.push(ReplayLogEntry::new(6, ";")).unwrap_err();
        assert!(matches!(err, HistoryError::OutOfOrder { sequence: 6, previous: 6 }));
    }

    #[test]
    fn test_truncate_and_tail() {
        let mut log = sample_log();
        assert_eq!(log.entries_after(4).len(), 2);
        log.truncate_after(4);
        assert_eq!(log.last_sequence(), Some(4));
        assert_eq!(log.resume_point().unwrap().unwrap().sequence, 3);
        assert!(log.entries_after(4).is_empty());
    }
}
