use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use oer_types::{LifecycleEvent, MessageId};

use crate::error::{QueueError, QueueResult};

/// A single queue state transition recorded in the journal.
///
/// Leases and delivery counts are deliberately not journaled: after a crash
/// every pending message reverts to visible, which at-least-once delivery
/// permits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum JournalEntry {
    /// A message was materialized.
    Enqueued {
        message_id: MessageId,
        event: LifecycleEvent,
    },
    /// A message was acknowledged and permanently removed.
    Acknowledged { message_id: MessageId },
    /// A message exceeded the redelivery limit and moved to the dead-letter
    /// sink.
    DeadLettered { message_id: MessageId },
}

/// Flush/sync strategy for the journal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncMode {
    /// `fsync` after every write (safest, highest latency).
    EveryWrite,
    /// Rely on OS page-cache buffering (fastest, least durable).
    #[default]
    OsDefault,
}

/// Header size: 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: usize = 8;

/// Internal mutable state for the journal writer.
struct JournalWriter {
    writer: BufWriter<File>,
    /// Current write offset in the file.
    offset: u64,
}

/// Crash-recoverable queue journal.
///
/// Entries are serialized with bincode, framed with a length prefix and a
/// CRC32 checksum, and appended to a single file. On recovery the file is
/// read front-to-back; entries that fail the CRC check are skipped (they
/// represent incomplete/torn writes from a crash).
pub struct Journal {
    /// Path to the journal file.
    path: PathBuf,
    /// Writer state behind a mutex for thread safety.
    writer: Mutex<JournalWriter>,
    /// Flush strategy.
    sync_mode: SyncMode,
}

impl Journal {
    /// Open (or create) a journal file at the given path.
    pub fn open(path: &Path, sync_mode: SyncMode) -> QueueResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;

        let offset = file.metadata()?.len();
        let writer = BufWriter::new(file);

        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(JournalWriter { writer, offset }),
            sync_mode,
        })
    }

    /// Append a single entry. Returns the byte offset of the entry.
    pub fn append(&self, entry: &JournalEntry) -> QueueResult<u64> {
        let payload =
            bincode::serialize(entry).map_err(|e| QueueError::Serialization(e.to_string()))?;

        let length = payload.len() as u32;
        let crc = crc32fast::hash(&payload);

        let mut w = self.writer.lock().expect("journal mutex poisoned");
        let entry_offset = w.offset;

        // Write header: [length: u32 LE] [crc: u32 LE]
        w.writer.write_all(&length.to_le_bytes())?;
        w.writer.write_all(&crc.to_le_bytes())?;
        w.writer.write_all(&payload)?;

        w.writer.flush()?;
        if matches!(self.sync_mode, SyncMode::EveryWrite) {
            w.writer.get_ref().sync_all()?;
        }

        w.offset += HEADER_SIZE as u64 + payload.len() as u64;

        debug!(offset = entry_offset, len = payload.len(), "journal append");
        Ok(entry_offset)
    }

    /// Recover all valid entries from the journal.
    ///
    /// Reads the file front-to-back. Entries that fail CRC validation are
    /// logged and skipped (torn writes from a crash).
    pub fn recover(&self) -> QueueResult<Vec<JournalEntry>> {
        let mut file = BufReader::new(File::open(&self.path)?);
        let file_len = file.get_ref().metadata()?.len();
        let mut entries = Vec::new();
        let mut offset: u64 = 0;

        while offset + HEADER_SIZE as u64 <= file_len {
            file.seek(SeekFrom::Start(offset))?;

            let mut header_buf = [0u8; HEADER_SIZE];
            match file.read_exact(&mut header_buf) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            }

            let length =
                u32::from_le_bytes([header_buf[0], header_buf[1], header_buf[2], header_buf[3]]);
            let expected_crc =
                u32::from_le_bytes([header_buf[4], header_buf[5], header_buf[6], header_buf[7]]);

            if length == 0 || (offset + HEADER_SIZE as u64 + length as u64) > file_len {
                warn!(
                    offset,
                    length, file_len, "invalid journal entry length; stopping recovery"
                );
                break;
            }

            let mut payload = vec![0u8; length as usize];
            match file.read_exact(&mut payload) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    warn!(offset, "truncated journal entry; stopping recovery");
                    break;
                }
                Err(e) => return Err(e.into()),
            }

            let actual_crc = crc32fast::hash(&payload);
            if actual_crc != expected_crc {
                warn!(
                    offset,
                    expected = expected_crc,
                    actual = actual_crc,
                    "CRC mismatch; skipping entry"
                );
                offset += HEADER_SIZE as u64 + length as u64;
                continue;
            }

            match bincode::deserialize::<JournalEntry>(&payload) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    warn!(offset, error = %e, "failed to deserialize journal entry; skipping");
                }
            }

            offset += HEADER_SIZE as u64 + length as u64;
        }

        debug!(recovered = entries.len(), "journal recovery complete");
        Ok(entries)
    }

    /// Replace the journal contents with exactly the given entries.
    ///
    /// Used on open to compact resolved messages away: the queue rewrites the
    /// file with only the still-pending `Enqueued` entries.
    pub fn rewrite(&self, entries: &[JournalEntry]) -> QueueResult<()> {
        {
            let mut w = self.writer.lock().expect("journal mutex poisoned");
            let file = OpenOptions::new()
                .write(true)
                .truncate(true)
                .open(&self.path)?;
            w.writer = BufWriter::new(file);
            w.offset = 0;
        }

        for entry in entries {
            self.append(entry)?;
        }

        debug!(count = entries.len(), "journal rewritten");
        Ok(())
    }

    /// Current write offset.
    pub fn offset(&self) -> u64 {
        self.writer.lock().expect("journal mutex poisoned").offset
    }

    /// Path to the journal file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
