//! Batched, resumable migration from a monolithic layout into a partitioned
//! one.
//!
//! The cursor is the sole resume authority: after every committed batch it
//! records the last copied id, and because the next fetch asks for ids
//! strictly greater than that, committed rows are never re-fetched. An
//! interrupted run re-invoked with the same arguments converges to the same
//! destination content as an uninterrupted one.

pub mod cursor;
pub mod migrator;

pub use cursor::{CursorStore, JsonCursorStore, MemoryCursorStore, MigrationCursor};
pub use migrator::{
    BatchMigrator, LogProgress, MigrationSummary, MigratorConfig, NullProgress, ProgressObserver,
};
