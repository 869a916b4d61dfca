//! Append-only replay log writer.

use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::entry::{LogHeader, LogLine, ReplayLogEntry};
use crate::log::ReplayLog;
use crate::reader::ReplayLogReader;
use crate::{HistoryError, Result};

/// Writes a replay log one line at a time.
pub struct ReplayLogWriter {
    path: PathBuf,
    file: File,
    header: LogHeader,
    last_sequence: Option<u64>,
    sync_on_write: bool,
}

impl ReplayLogWriter {
    /// Create (or truncate) a log and write its header.
    pub async fn create(path: impl AsRef<Path>, header: LogHeader) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .await?;
        write_line(&mut file, &LogLine::Header(header.clone())).await?;

        info!(
            path = %path.display(),
            session_id = %header.session_id,
            seed = header.seed,
            "Replay log created"
        );

        Ok(Self {
            path,
            file,
            header,
            last_sequence: None,
            sync_on_write: false,
        })
    }

    /// Open an existing log to append after its last entry.
    pub async fn open_append(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let existing = ReplayLogReader::new(&path).read().await?;

        let file = OpenOptions::new().append(true).open(&path).await?;
        let last_sequence = existing.last_sequence();
        let (header, _) = existing.into_parts();

        debug!(
            path = %path.display(),
            last_sequence = ?last_sequence,
            "Replay log reopened for append"
        );

        Ok(Self {
            path,
            file,
            header,
            last_sequence,
            sync_on_write: false,
        })
    }

    /// Write a complete log, replacing any file at `path` atomically.
    pub async fn write_log(path: impl AsRef<Path>, log: &ReplayLog) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let temp_path = path.with_extension("tmp");
        let mut temp_file = File::create(&temp_path).await?;
        temp_file.write_all(log.to_json_lines()?.as_bytes()).await?;
        temp_file.sync_all().await?;
        tokio::fs::rename(&temp_path, path).await?;

        info!(path = %path.display(), entries = log.len(), "Replay log written");
        Ok(())
    }

    /// Sync the file after every append.
    pub fn with_sync_on_write(mut self, sync_on_write: bool) -> Self {
        self.sync_on_write = sync_on_write;
        self
    }

    /// Append an entry; its sequence must exceed the last one written.
    pub async fn append(&mut self, entry: &ReplayLogEntry) -> Result<()> {
        if let Some(previous) = self.last_sequence {
            if entry.sequence <= previous {
                return Err(HistoryError::OutOfOrder {
                    sequence: entry.sequence,
                    previous,
                });
            }
        }

        write_line(&mut self.file, &LogLine::Entry(entry.clone())).await?;
        if self.sync_on_write {
            self.file.sync_all().await?;
        }
        self.last_sequence = Some(entry.sequence);

        debug!(
            sequence = entry.sequence,
            checkpoint = entry.checkpoint.is_some(),
            chunk_boundary = entry.chunk_boundary,
            "Replay log entry written"
        );
        Ok(())
    }

    /// Flush the log to disk.
    pub async fn flush(&mut self) -> Result<()> {
        self.file.flush().await?;
        self.file.sync_all().await?;
        Ok(())
    }

    pub fn header(&self) -> &LogHeader {
        &self.header
    }

    pub fn last_sequence(&self) -> Option<u64> {
        self.last_sequence
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

async fn write_line(file: &mut File, line: &LogLine) -> Result<()> {
    let json = serde_json::to_string(line)?;
    file.write_all(json.as_bytes()).await?;
    file.write_all(b"\n").await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsmash_core::Mt19937;
    use std::time::Duration;

    #[tokio::test]
    async fn test_writer_reader_round_trip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("logs").join("run.jsonl");

        let header = LogHeader::new(5489);
        let mut expected = ReplayLog::new(header.clone());
        {
            let mut writer = ReplayLogWriter::create(&path, header).await.unwrap();
            let mut rng = Mt19937::new(5489);
            for seq in 1..=12u64 {
                rng.next_u32();
                let mut entry = ReplayLogEntry::new(seq, format!("/*{seq}*/ x\r\n'\u{2029}';"));
                if seq % 5 == 0 {
                    entry = entry
                        .with_checkpoint(rng.export_state())
                        .with_chunk_boundary(true)
                        .with_timeout_override(Duration::from_millis(100));
                }
                writer.append(&entry).await.unwrap();
                expected.push(entry).unwrap();
            }
            writer.flush().await.unwrap();
        }

        let log = ReplayLogReader::new(&path).read().await.unwrap();
        assert_eq!(log, expected);
    }

    #[tokio::test]
    async fn test_append_after_reopen() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("run.jsonl");

        {
            let mut writer = ReplayLogWriter::create(&path, LogHeader::new(1)).await.unwrap();
            writer.append(&ReplayLogEntry::new(1, "a;")).await.unwrap();
            writer.append(&ReplayLogEntry::new(2, "b;")).await.unwrap();
            writer.flush().await.unwrap();
        }

        let mut writer = ReplayLogWriter::open_append(&path).await.unwrap();
        assert_eq!(writer.last_sequence(), Some(2));
        assert!(writer.append(&ReplayLogEntry::new(2, "dup;")).await.is_err());
        writer.append(&ReplayLogEntry::new(3, "c;")).await.unwrap();
        writer.flush().await.unwrap();

        let log = ReplayLogReader::new(&path).read().await.unwrap();
        let texts: Vec<_> = log.entries().iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, ["a;", "b;", "c;"]);
    }

    #[tokio::test]
    async fn test_write_log_replaces_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("reduced.jsonl");
        tokio::fs::write(&path, "garbage").await.unwrap();

        let log = ReplayLog::from_entries(
            LogHeader::new(9),
            vec![ReplayLogEntry::new(4, "x;"), ReplayLogEntry::new(9, "y;")],
        )
        .unwrap();
        ReplayLogWriter::write_log(&path, &log).await.unwrap();

        assert_eq!(ReplayLogReader::new(&path).read().await.unwrap(), log);
    }
}
