//! Monolithic in-memory reference backend.
//!
//! One flat, id-ordered table with a primary-key index and nothing else,
//! the "before" layout. Every time-bounded query is a full scan.

use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::model::EventRecord;
use crate::query::{self, AnalyticQuery, QueryOutput, QueryTarget};

use super::{EventStore, TableStorage};

/// Estimated per-row cost of the primary-key index.
const PK_INDEX_BYTES_PER_ROW: u64 = 16;

pub struct MemoryStore {
    table: String,
    rows: RwLock<Vec<EventRecord>>,
}

impl MemoryStore {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            rows: RwLock::new(Vec::new()),
        }
    }

    /// Build a store pre-loaded with rows, sorting them into id order.
    /// Duplicate ids are rejected.
    pub fn with_rows(table: impl Into<String>, mut rows: Vec<EventRecord>) -> Result<Self> {
        rows.sort_by_key(|r| r.event_id);
        for pair in rows.windows(2) {
            if pair[0].event_id == pair[1].event_id {
                return Err(Error::Storage(format!(
                    "duplicate event_id {} in initial rows",
                    pair[0].event_id
                )));
            }
        }
        Ok(Self {
            table: table.into(),
            rows: RwLock::new(rows),
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn validate_batch(existing_max: Option<u64>, rows: &[EventRecord]) -> Result<()> {
        let mut last = existing_max;
        for row in rows {
            if let Some(prev) = last {
                if row.event_id <= prev {
                    return Err(Error::Storage(format!(
                        "batch id {} not above previous id {}",
                        row.event_id, prev
                    )));
                }
            }
            last = Some(row.event_id);
        }
        Ok(())
    }
}

impl EventStore for MemoryStore {
    fn total_rows(&self) -> Result<u64> {
        Ok(self.rows.read().len() as u64)
    }

    fn fetch_after(&self, after: Option<u64>, limit: usize) -> Result<Vec<EventRecord>> {
        let rows = self.rows.read();
        let start = match after {
            Some(id) => rows.partition_point(|r| r.event_id <= id),
            None => 0,
        };
        Ok(rows[start..].iter().take(limit).cloned().collect())
    }

    fn insert_batch(&self, batch: &[EventRecord]) -> Result<u64> {
        let mut rows = self.rows.write();
        Self::validate_batch(rows.last().map(|r| r.event_id), batch)?;
        rows.extend_from_slice(batch);
        Ok(batch.len() as u64)
    }

    fn storage(&self) -> Result<TableStorage> {
        let rows = self.rows.read();
        let data_bytes = rows.iter().map(|r| r.approx_size_bytes()).sum();
        Ok(TableStorage {
            data_bytes,
            index_bytes: rows.len() as u64 * PK_INDEX_BYTES_PER_ROW,
        })
    }
}

impl QueryTarget for MemoryStore {
    fn layout(&self) -> &str {
        "monolithic"
    }

    fn execute(&self, q: &AnalyticQuery) -> Result<QueryOutput> {
        let (from, to) = q.window();
        let rows = self.rows.read();
        let windowed = rows
            .iter()
            .filter(|r| r.event_timestamp >= from && r.event_timestamp < to);
        Ok(QueryOutput {
            rows: query::evaluate(q, windowed),
            partitions_scanned: None,
        })
    }
}
