//! Migration watermark and its persistence.

use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::EventRecord;

/// Resume state of one migration run.
///
/// Invariants: `migrated_rows` is monotonically non-decreasing and never
/// exceeds `total_rows`; `last_event_id` is the id of the last row whose
/// batch committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationCursor {
    pub last_event_id: Option<u64>,

    /// Source row count snapshotted once at migration start.
    pub total_rows: u64,

    pub migrated_rows: u64,

    pub batch_size: usize,
}

impl MigrationCursor {
    pub fn new(total_rows: u64, batch_size: usize) -> Self {
        Self {
            last_event_id: None,
            total_rows,
            migrated_rows: 0,
            batch_size,
        }
    }

    /// Record one committed batch.
    pub fn advance(&mut self, batch: &[EventRecord]) {
        if let Some(last) = batch.last() {
            self.last_event_id = Some(last.event_id);
            self.migrated_rows += batch.len() as u64;
        }
    }

    pub fn remaining(&self) -> u64 {
        self.total_rows.saturating_sub(self.migrated_rows)
    }

    pub fn is_complete(&self) -> bool {
        self.migrated_rows >= self.total_rows
    }
}

/// Durable home of the cursor between batches and across process restarts.
///
/// `save` must be atomic with respect to readers: a crashed save leaves
/// either the previous cursor or the new one, never a torn state.
pub trait CursorStore {
    fn load(&self) -> Result<Option<MigrationCursor>>;

    fn save(&self, cursor: &MigrationCursor) -> Result<()>;

    /// Retire the cursor after a completed migration.
    fn clear(&self) -> Result<()>;
}

/// Process-local cursor store, for tests and single-shot runs.
#[derive(Default)]
pub struct MemoryCursorStore {
    slot: RwLock<Option<MigrationCursor>>,
}

impl MemoryCursorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CursorStore for MemoryCursorStore {
    fn load(&self) -> Result<Option<MigrationCursor>> {
        Ok(self.slot.read().clone())
    }

    fn save(&self, cursor: &MigrationCursor) -> Result<()> {
        *self.slot.write() = Some(cursor.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.slot.write() = None;
        Ok(())
    }
}

/// File-backed cursor store. Writes go to a temp file first and are renamed
/// into place, so a crash mid-save cannot tear the cursor.
pub struct JsonCursorStore {
    path: PathBuf,
}

impl JsonCursorStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CursorStore for JsonCursorStore {
    fn load(&self) -> Result<Option<MigrationCursor>> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Io(format!(
                "reading cursor {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    fn save(&self, cursor: &MigrationCursor) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(cursor)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, bytes)
            .map_err(|e| Error::Io(format!("writing cursor {}: {}", tmp.display(), e)))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            Error::Io(format!(
                "atomic rename onto {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Io(format!(
                "removing cursor {}: {}",
                self.path.display(),
                e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_tracks_last_id_and_count() {
        let mut cursor = MigrationCursor::new(100, 10);
        let batch: Vec<EventRecord> = Vec::new();
        cursor.advance(&batch);
        assert_eq!(cursor.last_event_id, None);
        assert_eq!(cursor.migrated_rows, 0);
    }

    #[test]
    fn memory_store_round_trips() {
        let store = MemoryCursorStore::new();
        assert!(store.load().unwrap().is_none());

        let cursor = MigrationCursor::new(42, 8);
        store.save(&cursor).unwrap();
        assert_eq!(store.load().unwrap(), Some(cursor));

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn json_store_round_trips_and_clears() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonCursorStore::new(dir.path().join("cursor.json"));
        assert!(store.load().unwrap().is_none());

        let mut cursor = MigrationCursor::new(237, 50);
        cursor.last_event_id = Some(50);
        cursor.migrated_rows = 50;
        store.save(&cursor).unwrap();
        assert_eq!(store.load().unwrap(), Some(cursor));

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        // clearing twice is fine
        store.clear().unwrap();
    }
}
