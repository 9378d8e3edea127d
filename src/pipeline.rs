//! Sequential orchestration of the five stages:
//! provision → migrate → verify → benchmark → assemble.
//!
//! Every collaborator is owned by the caller and passed in through
//! [`PipelineContext`]; the pipeline holds no connection or cursor state of
//! its own, and each stage stays independently invocable (benchmarking an
//! already-migrated destination needs none of the earlier stages).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::benchmark::{BenchmarkConfig, LatencyBenchmark, SuiteOutcome};
use crate::error::{Error, Result};
use crate::migration::{BatchMigrator, CursorStore, MigrationSummary, MigratorConfig, ProgressObserver};
use crate::partition::{PartitionDdl, PartitionProvisioner, PeriodUnit, ProvisionOutcome};
use crate::query::AnalyticQuery;
use crate::report::{Report, ReportAssembler, StorageMetrics};
use crate::store::TableLayout;
use crate::verify::{IntegrityVerifier, VerificationOutcome, VerifierConfig};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Destination table name partitions are named after.
    pub table: String,

    pub unit: PeriodUnit,

    /// First period to provision.
    pub partition_start: NaiveDate,

    /// Number of consecutive periods to provision.
    pub period_count: u32,

    pub migration: MigratorConfig,

    pub verifier: VerifierConfig,

    pub benchmark: BenchmarkConfig,
}

/// Caller-owned collaborators for one run. Exclusive borrows double as the
/// in-process half of the single-migrator precondition; cross-process
/// exclusion stays the caller's advisory-lock problem.
pub struct PipelineContext<'a> {
    pub source: &'a dyn TableLayout,
    pub destination: &'a dyn TableLayout,
    pub ddl: &'a dyn PartitionDdl,
    pub cursors: &'a dyn CursorStore,
    pub observer: &'a dyn ProgressObserver,

    /// Reference instant the benchmark queries anchor their trailing
    /// windows to.
    pub reference: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOutcome {
    pub provisioned: ProvisionOutcome,
    pub migration: MigrationSummary,
    pub verification: VerificationOutcome,
    pub suite: SuiteOutcome,
    pub report: Report,
}

/// Run the whole migration-and-benchmark pipeline.
///
/// Provisioning failures abort the run before any row moves: an unprovisioned
/// period would reject its rows mid-migration anyway. Verification mismatch
/// does not abort; it is reported through the assembled report.
pub fn run(ctx: &PipelineContext<'_>, cfg: &PipelineConfig) -> Result<PipelineOutcome> {
    info!(table = %cfg.table, "pipeline starting");

    let provisioner = PartitionProvisioner::new(cfg.table.clone(), cfg.unit);
    let provisioned = provisioner.create_partitions(ctx.ddl, cfg.partition_start, cfg.period_count);
    if let Some(failure) = provisioned.failures.first() {
        return Err(Error::Provisioning {
            period: failure.period_start.to_string(),
            reason: failure.reason.clone(),
        });
    }

    let migration = BatchMigrator::new(cfg.migration.clone()).migrate(
        ctx.source.as_event_store(),
        ctx.destination.as_event_store(),
        ctx.cursors,
        ctx.observer,
    )?;

    let verification = IntegrityVerifier::new(cfg.verifier.clone())
        .verify(ctx.source.as_event_store(), ctx.destination.as_event_store())?;

    let queries = AnalyticQuery::standard_suite(ctx.reference);
    let suite = LatencyBenchmark::new(cfg.benchmark.clone()).run_suite(
        &queries,
        ctx.source.as_query_target(),
        ctx.destination.as_query_target(),
    );

    let storage = StorageMetrics {
        monolithic: ctx.source.as_event_store().storage()?,
        partitioned: ctx.destination.as_event_store().storage()?,
    };

    let report = ReportAssembler::assemble(&suite, &storage, &verification)?;

    info!("pipeline complete");
    Ok(PipelineOutcome {
        provisioned,
        migration,
        verification,
        suite,
        report,
    })
}
