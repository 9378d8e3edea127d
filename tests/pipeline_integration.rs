//! End-to-end pipeline behavior against the in-memory reference layouts.

mod common;

use chrono::NaiveDate;

use eventpart::partition::covering_range;
use eventpart::{
    AnalyticQuery, BatchMigrator, BenchmarkConfig, LatencyBenchmark, MemoryCursorStore,
    MemoryStore, MigratorConfig, NullProgress, PartitionProvisioner, PartitionedStore, PeriodUnit,
    PipelineConfig, PipelineContext, QueryTarget, VerifierConfig,
};

const TABLE: &str = "viewing_events";

fn partition_start() -> NaiveDate {
    // fixtures span the 120 days before the reference instant
    let min = (common::reference() - chrono::Duration::days(120)).date_naive();
    PeriodUnit::Month.align(min)
}

fn pipeline_config(batch_size: usize) -> PipelineConfig {
    let (start, periods) = covering_range(
        partition_start(),
        common::reference().date_naive(),
        PeriodUnit::Month,
    );
    PipelineConfig {
        table: TABLE.to_string(),
        unit: PeriodUnit::Month,
        partition_start: start,
        period_count: periods,
        migration: MigratorConfig { batch_size },
        verifier: VerifierConfig {
            compare_checksums: true,
        },
        benchmark: BenchmarkConfig {
            warmup_runs: 1,
            measured_runs: 3,
        },
    }
}

#[test]
fn full_pipeline_produces_verified_report() {
    let events = common::synthetic_events(5_000, 120, 42);
    let source = MemoryStore::with_rows(TABLE, events).unwrap();
    let destination = PartitionedStore::new(TABLE, PeriodUnit::Month);
    let cursors = MemoryCursorStore::new();

    let cfg = pipeline_config(500);
    let ctx = PipelineContext {
        source: &source,
        destination: &destination,
        ddl: &destination,
        cursors: &cursors,
        observer: &NullProgress,
        reference: common::reference(),
    };

    let outcome = eventpart::pipeline::run(&ctx, &cfg).unwrap();

    assert!(outcome.provisioned.is_success());
    assert_eq!(outcome.migration.migrated_rows, 5_000);
    assert_eq!(outcome.migration.batches_applied, 10);
    assert!(outcome.verification.is_match());
    assert_eq!(outcome.verification.checksums_match, Some(true));

    assert_eq!(outcome.suite.results.len(), 3);
    assert!(outcome.suite.failures.is_empty());
    let names: Vec<&str> = outcome
        .suite
        .results
        .iter()
        .map(|r| r.query.as_str())
        .collect();
    assert_eq!(
        names,
        vec!["daily_active_users", "top_content", "device_breakdown"]
    );

    assert!(!outcome.report.executive_summary.is_empty());
    assert_eq!(outcome.report.query_performance.len(), 3);
    assert!(outcome
        .report
        .executive_summary
        .contains("verified integrity"));
    assert!(outcome.report.storage_metrics.partitioned.data_bytes > 0);

    // every provisioned period materialized, every row landed in one
    let partitions = destination.partitions();
    assert_eq!(partitions.len(), cfg.period_count as usize);
    assert_eq!(partitions.iter().map(|(_, n)| n).sum::<u64>(), 5_000);
}

#[test]
fn provisioning_twice_returns_identical_descriptors() {
    let destination = PartitionedStore::new(TABLE, PeriodUnit::Month);
    let provisioner = PartitionProvisioner::new(TABLE, PeriodUnit::Month);

    let first = provisioner.create_partitions(&destination, partition_start(), 5);
    let second = provisioner.create_partitions(&destination, partition_start(), 5);

    assert!(first.is_success());
    assert_eq!(first, second);
    assert!(second.failures.is_empty());
}

#[test]
fn narrow_window_query_scans_few_partitions_after_migration() {
    let events = common::synthetic_events(3_000, 180, 11);
    let source = MemoryStore::with_rows(TABLE, events).unwrap();
    let destination = PartitionedStore::new(TABLE, PeriodUnit::Month);

    let (start, periods) = covering_range(
        (common::reference() - chrono::Duration::days(180)).date_naive(),
        common::reference().date_naive(),
        PeriodUnit::Month,
    );
    let outcome = PartitionProvisioner::new(TABLE, PeriodUnit::Month).create_partitions(
        &destination,
        start,
        periods,
    );
    assert!(outcome.is_success());

    BatchMigrator::new(MigratorConfig { batch_size: 1_000 })
        .migrate(&source, &destination, &MemoryCursorStore::new(), &NullProgress)
        .unwrap();

    let day_query = AnalyticQuery::TopContent {
        reference: common::reference(),
        window_hours: 24,
        limit: 10,
    };
    let out = destination.execute(&day_query).unwrap();
    assert!(
        out.partitions_scanned.unwrap() <= 2,
        "expected pruning to at most 2 partitions, scanned {}",
        out.partitions_scanned.unwrap()
    );

    // both layouts agree on the result set
    let mono = source.execute(&day_query).unwrap();
    assert_eq!(mono.rows, out.rows);
    assert_eq!(mono.partitions_scanned, None);
}

#[test]
fn benchmark_standalone_against_already_migrated_destination() {
    let events = common::synthetic_events(2_000, 60, 5);
    let source = MemoryStore::with_rows(TABLE, events).unwrap();
    let destination = PartitionedStore::new(TABLE, PeriodUnit::Month);

    let (start, periods) = covering_range(
        (common::reference() - chrono::Duration::days(60)).date_naive(),
        common::reference().date_naive(),
        PeriodUnit::Month,
    );
    PartitionProvisioner::new(TABLE, PeriodUnit::Month).create_partitions(
        &destination,
        start,
        periods,
    );
    BatchMigrator::new(MigratorConfig::default())
        .migrate(&source, &destination, &MemoryCursorStore::new(), &NullProgress)
        .unwrap();

    // no provisioner, no migrator involvement past this point
    let bench = LatencyBenchmark::new(BenchmarkConfig::default());
    let suite = bench.run_suite(
        &AnalyticQuery::standard_suite(common::reference()),
        &source,
        &destination,
    );

    assert_eq!(suite.results.len(), 3);
    for result in &suite.results {
        assert!(result.before_ms >= 0.0);
        assert!(result.after_ms >= 0.0);
    }
}
