//! File-based storage backend.
//!
//! The backend keeps the whole key space in memory and makes it durable
//! through an append-only log:
//!
//! ```text
//! <dir>/
//! ├─ LOCK         # advisory lock for single-process access
//! └─ store.log    # length-framed CBOR put/delete records
//! ```
//!
//! The log is replayed into the in-memory map at open. A truncated tail
//! (crash mid-append) is cut off; a malformed frame inside the log is an
//! error. [`FileBackend::compact`] rewrites the log to drop superseded
//! frames.

use crate::backend::StoreBackend;
use crate::error::{StoreError, StoreResult};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = "LOCK";
const LOG_FILE: &str = "store.log";
/// Temporary file for atomic log rewrites.
const LOG_TEMP: &str = "store.log.tmp";

/// A single log entry.
#[derive(Debug, Serialize, Deserialize)]
enum LogRecord {
    Put { key: String, value: Vec<u8> },
    Delete { key: String },
}

/// A file-backed store that survives process restarts.
///
/// Holds an exclusive advisory lock on its directory; opening the same
/// directory from a second process fails with [`StoreError::Locked`].
#[derive(Debug)]
pub struct FileBackend {
    dir: PathBuf,
    log: File,
    map: BTreeMap<String, Vec<u8>>,
    // Held for the lifetime of the backend.
    _lock_file: File,
}

impl FileBackend {
    /// Opens or creates a store in `dir`, replaying the existing log.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Locked`] if another process holds the lock,
    /// [`StoreError::CorruptLog`] if the log contains a malformed frame,
    /// or an I/O error.
    pub fn open(dir: &Path) -> StoreResult<Self> {
        fs::create_dir_all(dir)?;

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(dir.join(LOCK_FILE))?;
        lock_file
            .try_lock_exclusive()
            .map_err(|_| StoreError::Locked)?;

        let mut log = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(dir.join(LOG_FILE))?;

        let map = Self::replay(&mut log, dir)?;

        Ok(Self {
            dir: dir.to_path_buf(),
            log,
            map,
            _lock_file: lock_file,
        })
    }

    /// Returns the store directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Rewrites the log with one put frame per live key, dropping all
    /// superseded frames, then swaps it into place atomically.
    pub fn compact(&mut self) -> StoreResult<()> {
        let temp_path = self.dir.join(LOG_TEMP);
        let mut temp = File::create(&temp_path)?;
        for (key, value) in &self.map {
            let frame = encode_frame(&LogRecord::Put {
                key: key.clone(),
                value: value.clone(),
            })?;
            temp.write_all(&frame)?;
        }
        temp.sync_all()?;
        fs::rename(&temp_path, self.dir.join(LOG_FILE))?;

        self.log = OpenOptions::new()
            .read(true)
            .append(true)
            .open(self.dir.join(LOG_FILE))?;
        Ok(())
    }

    fn replay(log: &mut File, dir: &Path) -> StoreResult<BTreeMap<String, Vec<u8>>> {
        let mut raw = Vec::new();
        log.read_to_end(&mut raw)?;

        let mut map = BTreeMap::new();
        let mut offset = 0usize;
        while offset < raw.len() {
            // A frame shorter than its declared length is a crash tail.
            if offset + 4 > raw.len() {
                truncate_log(log, dir, offset as u64)?;
                break;
            }
            let len = u32::from_le_bytes([
                raw[offset],
                raw[offset + 1],
                raw[offset + 2],
                raw[offset + 3],
            ]) as usize;
            let start = offset + 4;
            if start + len > raw.len() {
                truncate_log(log, dir, offset as u64)?;
                break;
            }

            let record: LogRecord = ciborium::from_reader(&raw[start..start + len])
                .map_err(|_| StoreError::CorruptLog {
                    offset: offset as u64,
                })?;
            match record {
                LogRecord::Put { key, value } => {
                    map.insert(key, value);
                }
                LogRecord::Delete { key } => {
                    map.remove(&key);
                }
            }
            offset = start + len;
        }
        Ok(map)
    }

    fn append(&mut self, record: &LogRecord) -> StoreResult<()> {
        let frame = encode_frame(record)?;
        self.log.write_all(&frame)?;
        Ok(())
    }
}

fn encode_frame(record: &LogRecord) -> StoreResult<Vec<u8>> {
    let mut payload = Vec::new();
    ciborium::into_writer(record, &mut payload).map_err(|e| StoreError::Encode(e.to_string()))?;
    let mut frame = Vec::with_capacity(4 + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

fn truncate_log(log: &mut File, dir: &Path, offset: u64) -> StoreResult<()> {
    log.set_len(offset)?;
    log.sync_all()?;
    // Reopen in append mode so the next write lands at the cut.
    *log = OpenOptions::new()
        .read(true)
        .append(true)
        .open(dir.join(LOG_FILE))?;
    Ok(())
}

impl StoreBackend for FileBackend {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.map.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: &[u8]) -> StoreResult<()> {
        self.append(&LogRecord::Put {
            key: key.to_string(),
            value: value.to_vec(),
        })?;
        self.map.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &str) -> StoreResult<()> {
        if !self.map.contains_key(key) {
            return Ok(());
        }
        self.append(&LogRecord::Delete {
            key: key.to_string(),
        })?;
        self.map.remove(key);
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> StoreResult<Vec<String>> {
        Ok(self
            .map
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }

    fn flush(&mut self) -> StoreResult<()> {
        self.log.flush()?;
        Ok(())
    }

    fn sync(&mut self) -> StoreResult<()> {
        self.log.sync_all()?;
        Ok(())
    }

    fn len(&self) -> usize {
        self.map.len()
    }
}
