//! Storage abstraction over event-log layouts.
//!
//! Both the monolithic source and the partitioned destination implement
//! [`EventStore`], so migration, verification and benchmarking are symmetric
//! in either direction. The reference backends here are in-memory; a
//! network-backed implementation plugs in behind the same traits and surfaces
//! unreachable endpoints as `Error::Connectivity`.

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::EventRecord;
use crate::query::QueryTarget;

pub mod memory;
pub mod partitioned;

pub use memory::MemoryStore;
pub use partitioned::PartitionedStore;

/// Page size used when streaming a store for checksumming.
const CHECKSUM_PAGE_SIZE: usize = 10_000;

/// Datastore endpoint configuration. Owned and supplied by the caller; the
/// core never holds process-wide connection state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub host: String,

    pub port: u16,

    pub database: String,

    pub user: String,

    pub password: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            database: String::new(),
            user: String::new(),
            password: String::new(),
        }
    }
}

/// Size breakdown of one layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableStorage {
    pub data_bytes: u64,
    pub index_bytes: u64,
}

impl TableStorage {
    pub fn total_bytes(&self) -> u64 {
        self.data_bytes + self.index_bytes
    }
}

/// An ordered, append-only event table.
///
/// Contract notes:
/// - `fetch_after` is keyset pagination: rows with `event_id` strictly
///   greater than `after`, in ascending id order. Positional offset/limit is
///   deliberately absent: concurrent appends shift positions between
///   batches and can skip or duplicate rows.
/// - `insert_batch` is all-or-nothing; a rejected batch leaves the store
///   unchanged. Rows must arrive in ascending `event_id` order, above every
///   id already present.
pub trait EventStore {
    fn total_rows(&self) -> Result<u64>;

    fn fetch_after(&self, after: Option<u64>, limit: usize) -> Result<Vec<EventRecord>>;

    fn insert_batch(&self, rows: &[EventRecord]) -> Result<u64>;

    fn storage(&self) -> Result<TableStorage>;

    /// CRC32 digest over every row in id order, streamed in pages so the
    /// whole table never needs to be resident at once.
    fn content_checksum(&self) -> Result<u32> {
        let mut hasher = Hasher::new();
        let mut after = None;
        loop {
            let page = self.fetch_after(after, CHECKSUM_PAGE_SIZE)?;
            let Some(last) = page.last() else { break };
            after = Some(last.event_id);
            for row in &page {
                row.digest_into(&mut hasher);
            }
        }
        Ok(hasher.finalize())
    }
}

/// A layout that can be both migrated and benchmarked.
pub trait TableLayout: EventStore + QueryTarget {
    fn as_event_store(&self) -> &dyn EventStore;

    fn as_query_target(&self) -> &dyn QueryTarget;
}

impl<T: EventStore + QueryTarget> TableLayout for T {
    fn as_event_store(&self) -> &dyn EventStore {
        self
    }

    fn as_query_target(&self) -> &dyn QueryTarget {
        self
    }
}
