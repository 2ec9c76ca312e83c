//! Pending cross-store operation log
//!
//! Lend and return each touch two store files with two independent durable
//! writes. Before the first write the sequencer records what it is about to
//! do here; after the second it clears the file. A non-empty file at startup
//! therefore names exactly one operation that may be half applied.
//!
//! File layout (empty when nothing is pending):
//!
//! ```text
//! [ crc32 of body: u32 LE ][ body: JSON ]
//! ```

use crate::error::Result;
use crate::io::lock_exclusive;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A cross-store operation that has started but not been confirmed complete
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Intent {
    Lend {
        loan_id: String,
        member_id: String,
        item_id: String,
        /// Item copies before the decrement
        copies_before: u32,
        loan_date: String,
        due_date: String,
    },
    Return {
        loan_id: String,
        item_id: String,
        /// Item copies before the increment; `None` if the item is gone
        copies_before: Option<u32>,
        return_date: String,
    },
}

pub struct IntentLog {
    file: File,
    path: PathBuf,
    sync_writes: bool,
}

impl IntentLog {
    pub fn open<P: AsRef<Path>>(path: P, sync_writes: bool) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        lock_exclusive(&file, path)?;

        Ok(IntentLog {
            file,
            path: path.to_path_buf(),
            sync_writes,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Durably replace the pending intent
    pub fn record(&mut self, intent: &Intent) -> Result<()> {
        let body = serde_json::to_vec(intent)?;

        self.file.set_len(0)?;
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(&crc32fast::hash(&body).to_le_bytes())?;
        self.file.write_all(&body)?;
        self.file.flush()?;
        self.sync()?;

        debug!("Recorded intent {:?}", intent);
        Ok(())
    }

    /// Durably drop the pending intent
    pub fn clear(&mut self) -> Result<()> {
        self.file.set_len(0)?;
        self.sync()
    }

    /// The pending intent, if one is recorded intact
    ///
    /// A torn or corrupt entry is reported as nothing pending: the entry is
    /// synced before either store write begins, so if it never landed
    /// completely neither did the writes it describes.
    pub fn pending(&mut self) -> Result<Option<Intent>> {
        let mut bytes = Vec::new();
        self.file.seek(SeekFrom::Start(0))?;
        self.file.read_to_end(&mut bytes)?;

        if bytes.is_empty() {
            return Ok(None);
        }
        if bytes.len() < 4 {
            warn!("Discarding torn intent in {:?} ({} bytes)", self.path, bytes.len());
            return Ok(None);
        }

        let (crc, body) = bytes.split_at(4);
        let expected = u32::from_le_bytes([crc[0], crc[1], crc[2], crc[3]]);
        if crc32fast::hash(body) != expected {
            warn!("Discarding intent in {:?}: checksum mismatch", self.path);
            return Ok(None);
        }

        match serde_json::from_slice(body) {
            Ok(intent) => Ok(Some(intent)),
            Err(e) => {
                warn!("Discarding unreadable intent in {:?}: {}", self.path, e);
                Ok(None)
            }
        }
    }

    fn sync(&self) -> Result<()> {
        if self.sync_writes {
            self.file.sync_data()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn lend_intent() -> Intent {
        Intent::Lend {
            loan_id: "L001".to_string(),
            member_id: "M001".to_string(),
            item_id: "B001".to_string(),
            copies_before: 2,
            loan_date: "2024-01-01".to_string(),
            due_date: "2024-01-08".to_string(),
        }
    }

    #[test]
    fn test_empty_log_has_nothing_pending() {
        let dir = TempDir::new().unwrap();
        let mut log = IntentLog::open(dir.path().join("pending.intent"), false).unwrap();
        assert_eq!(log.pending().unwrap(), None);
    }

    #[test]
    fn test_record_and_clear() {
        let dir = TempDir::new().unwrap();
        let mut log = IntentLog::open(dir.path().join("pending.intent"), false).unwrap();

        log.record(&lend_intent()).unwrap();
        assert_eq!(log.pending().unwrap(), Some(lend_intent()));

        log.clear().unwrap();
        assert_eq!(log.pending().unwrap(), None);
    }

    #[test]
    fn test_pending_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pending.intent");

        IntentLog::open(&path, true)
            .unwrap()
            .record(&lend_intent())
            .unwrap();

        let mut log = IntentLog::open(&path, true).unwrap();
        assert_eq!(log.pending().unwrap(), Some(lend_intent()));
    }

    #[test]
    fn test_corrupt_body_is_discarded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pending.intent");

        {
            let mut log = IntentLog::open(&path, false).unwrap();
            log.record(&lend_intent()).unwrap();
        }

        let mut bytes = std::fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        std::fs::write(&path, &bytes).unwrap();

        let mut log = IntentLog::open(&path, false).unwrap();
        assert_eq!(log.pending().unwrap(), None);
    }

    #[test]
    fn test_torn_prefix_is_discarded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pending.intent");
        std::fs::write(&path, [1u8, 2]).unwrap();

        let mut log = IntentLog::open(&path, false).unwrap();
        assert_eq!(log.pending().unwrap(), None);
    }
}
