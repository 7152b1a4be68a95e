//! Append-only publication history (JSONL)

use std::io::{BufRead, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use rewardcraft_core::{Amount, EpochId, Hash};

use crate::Result;

/// A single entry in the history log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Global monotonic sequence number
    pub seq: u64,
    /// Publisher wall clock, unix seconds
    pub recorded_at: u64,
    pub event: HistoryEvent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryEvent {
    /// A balance table was committed and its document produced
    DistributionPublished {
        epoch: EpochId,
        root: Hash,
        total: Amount,
        accounts: usize,
        /// Accounts absent from the input table whose amount was kept
        carried_forward: usize,
    },
}

/// Entries are buffered in memory and appended to a JSONL file on flush.
#[derive(Debug, Default)]
pub(crate) struct HistoryLog {
    pub(crate) entries: Vec<HistoryEntry>,
    pub(crate) next_seq: u64,
    /// Number of entries already written to disk
    flushed_count: usize,
}

impl HistoryLog {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_entries(entries: Vec<HistoryEntry>) -> Self {
        let next_seq = entries.last().map_or(0, |e| e.seq + 1);
        let flushed_count = entries.len();
        Self {
            entries,
            next_seq,
            flushed_count,
        }
    }

    pub(crate) fn append(&mut self, event: HistoryEvent) {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let entry = HistoryEntry {
            seq: self.next_seq,
            recorded_at: now,
            event,
        };
        debug!("Appended history entry seq={}", entry.seq);
        self.entries.push(entry);
        self.next_seq += 1;
    }

    pub(crate) fn since(&self, seq: u64) -> &[HistoryEntry] {
        let start = self.entries.partition_point(|e| e.seq < seq);
        &self.entries[start..]
    }

    /// Append unflushed entries to `path`.
    pub(crate) fn flush(&mut self, path: &Path) -> Result<usize> {
        let unflushed = &self.entries[self.flushed_count..];
        if unflushed.is_empty() {
            return Ok(0);
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        let count = unflushed.len();
        for entry in unflushed {
            let json = serde_json::to_string(entry)?;
            writeln!(file, "{}", json)?;
        }
        self.flushed_count = self.entries.len();
        info!("Flushed {} history entries to {}", count, path.display());
        Ok(count)
    }

    /// Read entries from `path`. A missing file yields none.
    ///
    /// Lines that do not parse, or whose `seq` does not advance, are skipped
    /// with a warning. Read errors are returned.
    pub(crate) fn load(path: &Path) -> Result<Vec<HistoryEntry>> {
        let file = match std::fs::File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let reader = std::io::BufReader::new(file);
        let mut entries: Vec<HistoryEntry> = Vec::new();
        let mut skipped = 0usize;
        for (n, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let entry = match serde_json::from_str::<HistoryEntry>(&line) {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping history line {} in {}: {}", n + 1, path.display(), e);
                    skipped += 1;
                    continue;
                }
            };
            if let Some(last) = entries.last() {
                if entry.seq <= last.seq {
                    warn!(
                        "Skipping history line {} in {}: seq {} after {}",
                        n + 1,
                        path.display(),
                        entry.seq,
                        last.seq,
                    );
                    skipped += 1;
                    continue;
                }
            }
            entries.push(entry);
        }
        if skipped > 0 {
            warn!("Skipped {} unreadable history entries in {}", skipped, path.display());
        }
        if !entries.is_empty() {
            info!("Loaded {} history entries from {}", entries.len(), path.display());
        }
        Ok(entries)
    }
}
