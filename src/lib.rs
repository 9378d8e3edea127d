//! eventpart: re-platform an append-only event log from one monolithic
//! table into a time-partitioned layout, without losing rows, and measure
//! what the new layout actually buys.
//!
//! The crate is five sequential stages, each independently invocable:
//! partition provisioning, batched resumable migration, integrity
//! verification, comparative latency benchmarking, and report assembly.
//! Storage backends sit behind the `store` traits; the in-tree backends are
//! in-memory reference layouts.

pub mod benchmark;
pub mod error;
pub mod migration;
pub mod model;
pub mod partition;
pub mod pipeline;
pub mod query;
pub mod report;
pub mod store;
pub mod verify;

pub use benchmark::{
    BenchmarkConfig, BenchmarkFailure, BenchmarkResult, LatencyBenchmark, SuiteOutcome,
};
pub use error::{Error, Result};
pub use migration::{
    BatchMigrator, CursorStore, JsonCursorStore, LogProgress, MemoryCursorStore, MigrationCursor,
    MigrationSummary, MigratorConfig, NullProgress, ProgressObserver,
};
pub use model::{DeviceKind, EventKind, EventRecord, QualityTier};
pub use partition::{
    PartitionDdl, PartitionDescriptor, PartitionProvisioner, PeriodUnit, ProvisionOutcome,
};
pub use pipeline::{PipelineConfig, PipelineContext, PipelineOutcome};
pub use query::{AnalyticQuery, QueryOutput, QueryTarget};
pub use report::{Report, ReportAssembler, StorageMetrics};
pub use store::{EndpointConfig, EventStore, MemoryStore, PartitionedStore, TableLayout, TableStorage};
pub use verify::{IntegrityVerifier, VerificationOutcome, VerifierConfig};
