//! Replay log reader.

use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader as TokioBufReader};
use tracing::{debug, warn};

use crate::entry::{LogHeader, LogLine, ReplayLogEntry, LOG_VERSION};
use crate::log::ReplayLog;
use crate::{HistoryError, Result};

/// Incremental line-by-line parser shared by the file reader and
/// [`ReplayLog::from_json_lines`].
#[derive(Debug)]
pub(crate) struct LineParser {
    strict: bool,
    header: Option<LogHeader>,
    entries: Vec<ReplayLogEntry>,
    skipped: usize,
}

impl LineParser {
    /// Every problem is an error.
    pub(crate) fn strict() -> Self {
        Self {
            strict: true,
            header: None,
            entries: Vec::new(),
            skipped: 0,
        }
    }

    /// Unparseable, corrupted and out-of-order entries are skipped with a
    /// warning. A missing or unsupported header is still an error.
    pub(crate) fn lenient() -> Self {
        Self {
            strict: false,
            ..Self::strict()
        }
    }

    pub(crate) fn feed(&mut self, line_no: usize, line: &str) -> Result<()> {
        if line.trim().is_empty() {
            return Ok(());
        }

        let parsed = match serde_json::from_str::<LogLine>(line) {
            Ok(parsed) => parsed,
            Err(e) if self.header.is_some() && !self.strict => {
                warn!(line = line_no, error = %e, "Failed to parse replay log line");
                self.skipped += 1;
                return Ok(());
            }
            Err(e) => {
                return Err(HistoryError::Malformed {
                    line: line_no,
                    reason: e.to_string(),
                })
            }
        };

        match (parsed, self.header.is_some()) {
            (LogLine::Header(header), false) => {
                if header.version != LOG_VERSION {
                    return Err(HistoryError::UnsupportedVersion {
                        found: header.version,
                        expected: LOG_VERSION,
                    });
                }
                self.header = Some(header);
                Ok(())
            }
            (LogLine::Header(_), true) => {
                self.reject(HistoryError::UnexpectedHeader { line: line_no })
            }
            (LogLine::Entry(_), false) => Err(HistoryError::MissingHeader),
            (LogLine::Entry(entry), true) => {
                if !entry.verify() {
                    return self.reject(HistoryError::Corrupted {
                        line: line_no,
                        sequence: entry.sequence,
                    });
                }
                if let Some(previous) = self.entries.last().map(|e| e.sequence) {
                    if entry.sequence <= previous {
                        return self.reject(HistoryError::OutOfOrder {
                            sequence: entry.sequence,
                            previous,
                        });
                    }
                }
                self.entries.push(entry);
                Ok(())
            }
        }
    }

    fn reject(&mut self, err: HistoryError) -> Result<()> {
        if self.strict {
            return Err(err);
        }
        warn!(error = %err, "Skipping replay log line");
        self.skipped += 1;
        Ok(())
    }

    pub(crate) fn finish(self) -> Result<ReplayLog> {
        let header = self.header.ok_or(HistoryError::MissingHeader)?;
        if self.skipped > 0 {
            warn!(
                skipped = self.skipped,
                kept = self.entries.len(),
                "Replay log read with skipped lines"
            );
        }
        ReplayLog::from_entries(header, self.entries)
    }
}

/// Reads a replay log file.
pub struct ReplayLogReader {
    path: PathBuf,
}

impl ReplayLogReader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole log, failing on the first bad line.
    pub async fn read(&self) -> Result<ReplayLog> {
        self.read_with(LineParser::strict()).await
    }

    /// Read the whole log, skipping bad entries.
    ///
    /// Useful for logs cut short by a crash mid-write.
    pub async fn read_lenient(&self) -> Result<ReplayLog> {
        self.read_with(LineParser::lenient()).await
    }

    async fn read_with(&self, mut parser: LineParser) -> Result<ReplayLog> {
        let file = File::open(&self.path).await?;
        let reader = TokioBufReader::new(file);
        let mut lines = reader.lines();
        let mut line_no = 0;

        while let Some(line) = lines.next_line().await? {
            line_no += 1;
            parser.feed(line_no, &line)?;
        }

        let log = parser.finish()?;
        debug!(
            path = %self.path.display(),
            entries = log.len(),
            "Replay log read"
        );
        Ok(log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_line(entry: &ReplayLogEntry) -> String {
        serde_json::to_string(&LogLine::Entry(entry.clone())).unwrap()
    }

    fn header_line() -> String {
        serde_json::to_string(&LogLine::Header(LogHeader::new(1))).unwrap()
    }

    #[test]
    fn test_strict_rejects_corruption() {
        let mut bad = ReplayLogEntry::new(2, "b;");
        bad.text = "tampered".to_string();
        let text = [
            header_line(),
            entry_line(&ReplayLogEntry::new(1, "a;")),
            entry_line(&bad),
        ]
        .join("\n");

        let err = ReplayLog::from_json_lines(&text).unwrap_err();
        assert!(matches!(err, HistoryError::Corrupted { line: 3, sequence: 2 }));
    }

    #[test]
    fn test_missing_header() {
        let text = entry_line(&ReplayLogEntry::new(1, "a;"));
        assert!(matches!(
            ReplayLog::from_json_lines(&text),
            Err(HistoryError::MissingHeader)
        ));
        assert!(matches!(
            ReplayLog::from_json_lines(""),
            Err(HistoryError::MissingHeader)
        ));
    }

    #[tokio::test]
    async fn test_lenient_skips_torn_tail() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("torn.jsonl");
        let good = entry_line(&ReplayLogEntry::new(1, "a;"));
        let full = entry_line(&ReplayLogEntry::new(2, "b;"));
        let torn = &full[..20];
        tokio::fs::write(&path, format!("{}\n{good}\n{torn}", header_line()))
            .await
            .unwrap();

        let reader = ReplayLogReader::new(&path);
        assert!(reader.read().await.is_err());

        let log = reader.read_lenient().await.unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log.entries()[0].text, "a;");
    }

    #[tokio::test]
    async fn test_unsupported_version() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("future.jsonl");
        let mut header = LogHeader::new(1);
        header.version = LOG_VERSION + 1;
        let line = serde_json::to_string(&LogLine::Header(header)).unwrap();
        tokio::fs::write(&path, line).await.unwrap();

        let err = ReplayLogReader::new(&path).read_lenient().await.unwrap_err();
        assert!(matches!(err, HistoryError::UnsupportedVersion { .. }));
    }
}
