//! Per-period in-memory reference backend: the "after" layout.
//!
//! Child partitions exist only once provisioned through the store's
//! [`PartitionDdl`] implementation; inserts route rows to the child covering
//! their timestamp and reject rows no partition covers. Time-bounded queries
//! prune to the overlapping children and report how many they scanned, which
//! is the in-process equivalent of checking an EXPLAIN plan for pruning.
//! Each child carries a timestamp index mirroring the parent access pattern.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::model::EventRecord;
use crate::partition::{partition_name, PartitionDdl, PartitionDescriptor, PeriodUnit};
use crate::query::{self, AnalyticQuery, QueryOutput, QueryTarget};

use super::{EventStore, TableStorage};

const PK_INDEX_BYTES_PER_ROW: u64 = 16;
const TIME_INDEX_BYTES_PER_ROW: u64 = 12;

struct Partition {
    descriptor: PartitionDescriptor,
    start_at: DateTime<Utc>,
    end_at: DateTime<Utc>,
    /// Rows in ascending event_id order.
    rows: Vec<EventRecord>,
    /// Secondary index: timestamp -> offsets into `rows`.
    by_time: BTreeMap<DateTime<Utc>, Vec<u32>>,
}

impl Partition {
    fn covers(&self, at: DateTime<Utc>) -> bool {
        at >= self.start_at && at < self.end_at
    }

    fn overlaps(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> bool {
        self.start_at < to && self.end_at > from
    }
}

#[derive(Default)]
struct Inner {
    partitions: BTreeMap<NaiveDate, Partition>,
    max_event_id: Option<u64>,
}

pub struct PartitionedStore {
    table: String,
    unit: PeriodUnit,
    inner: RwLock<Inner>,
}

impl PartitionedStore {
    pub fn new(table: impl Into<String>, unit: PeriodUnit) -> Self {
        Self {
            table: table.into(),
            unit,
            inner: RwLock::new(Inner::default()),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn unit(&self) -> PeriodUnit {
        self.unit
    }

    /// Descriptors of the provisioned children with their row counts, in
    /// period order.
    pub fn partitions(&self) -> Vec<(PartitionDescriptor, u64)> {
        self.inner
            .read()
            .partitions
            .values()
            .map(|p| (p.descriptor.clone(), p.rows.len() as u64))
            .collect()
    }

    fn day_start(date: NaiveDate) -> DateTime<Utc> {
        date.and_time(NaiveTime::MIN).and_utc()
    }
}

impl PartitionDdl for PartitionedStore {
    fn create_partition_and_indexes(&self, period_start: NaiveDate) -> Result<()> {
        let period_start = self.unit.align(period_start);
        let period_end = self.unit.advance(period_start).ok_or_else(|| {
            Error::Provisioning {
                period: period_start.to_string(),
                reason: "period end out of calendar range".to_string(),
            }
        })?;

        let mut inner = self.inner.write();
        // re-creation of an existing period is a no-op
        if inner.partitions.contains_key(&period_start) {
            return Ok(());
        }

        inner.partitions.insert(
            period_start,
            Partition {
                descriptor: PartitionDescriptor {
                    period_start,
                    period_end,
                    partition_name: partition_name(&self.table, self.unit, period_start),
                },
                start_at: Self::day_start(period_start),
                end_at: Self::day_start(period_end),
                rows: Vec::new(),
                by_time: BTreeMap::new(),
            },
        );
        Ok(())
    }
}

impl EventStore for PartitionedStore {
    fn total_rows(&self) -> Result<u64> {
        let inner = self.inner.read();
        Ok(inner.partitions.values().map(|p| p.rows.len() as u64).sum())
    }

    fn fetch_after(&self, after: Option<u64>, limit: usize) -> Result<Vec<EventRecord>> {
        let inner = self.inner.read();
        // ids are only locally ordered within each child, so take up to
        // `limit` candidates per child and merge
        let mut merged: Vec<EventRecord> = Vec::new();
        for partition in inner.partitions.values() {
            let start = match after {
                Some(id) => partition.rows.partition_point(|r| r.event_id <= id),
                None => 0,
            };
            merged.extend(partition.rows[start..].iter().take(limit).cloned());
        }
        merged.sort_by_key(|r| r.event_id);
        merged.truncate(limit);
        Ok(merged)
    }

    fn insert_batch(&self, batch: &[EventRecord]) -> Result<u64> {
        let mut inner = self.inner.write();

        // resolve every row before touching anything, so a rejected batch
        // leaves the store unchanged
        let mut routed: Vec<NaiveDate> = Vec::with_capacity(batch.len());
        let mut last = inner.max_event_id;
        for row in batch {
            if let Some(prev) = last {
                if row.event_id <= prev {
                    return Err(Error::Storage(format!(
                        "batch id {} not above previous id {}",
                        row.event_id, prev
                    )));
                }
            }
            last = Some(row.event_id);

            let date = row.event_timestamp.date_naive();
            let key = inner
                .partitions
                .range(..=date)
                .next_back()
                .filter(|(_, p)| p.covers(row.event_timestamp))
                .map(|(k, _)| *k)
                .ok_or_else(|| {
                    Error::Storage(format!(
                        "no partition covers timestamp {} (event_id {})",
                        row.event_timestamp, row.event_id
                    ))
                })?;
            routed.push(key);
        }

        for (row, key) in batch.iter().zip(routed) {
            let partition = inner
                .partitions
                .get_mut(&key)
                .ok_or_else(|| Error::Storage(format!("partition for {key} vanished")))?;
            let offset = partition.rows.len() as u32;
            partition.rows.push(row.clone());
            partition
                .by_time
                .entry(row.event_timestamp)
                .or_default()
                .push(offset);
        }
        inner.max_event_id = last;
        Ok(batch.len() as u64)
    }

    fn storage(&self) -> Result<TableStorage> {
        let inner = self.inner.read();
        let mut storage = TableStorage::default();
        for partition in inner.partitions.values() {
            storage.data_bytes += partition
                .rows
                .iter()
                .map(|r| r.approx_size_bytes())
                .sum::<u64>();
            storage.index_bytes +=
                partition.rows.len() as u64 * (PK_INDEX_BYTES_PER_ROW + TIME_INDEX_BYTES_PER_ROW);
        }
        Ok(storage)
    }
}

impl QueryTarget for PartitionedStore {
    fn layout(&self) -> &str {
        "partitioned"
    }

    fn execute(&self, q: &AnalyticQuery) -> Result<QueryOutput> {
        let (from, to) = q.window();
        let inner = self.inner.read();

        let mut scanned = 0u32;
        let mut windowed: Vec<&EventRecord> = Vec::new();
        for partition in inner.partitions.values() {
            if !partition.overlaps(from, to) {
                continue;
            }
            scanned += 1;
            for offsets in partition.by_time.range(from..to).map(|(_, v)| v) {
                for &offset in offsets {
                    windowed.push(&partition.rows[offset as usize]);
                }
            }
        }

        Ok(QueryOutput {
            rows: query::evaluate(q, windowed.into_iter()),
            partitions_scanned: Some(scanned),
        })
    }
}
