use clap::{Arg, ArgMatches, Command};
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use eventpart::partition::covering_range;
use eventpart::{
    AnalyticQuery, BatchMigrator, BenchmarkConfig, Error, EventRecord, EventStore,
    IntegrityVerifier, JsonCursorStore, LatencyBenchmark, LogProgress, MemoryCursorStore,
    MemoryStore, MigratorConfig, PartitionProvisioner, PartitionedStore, PeriodUnit,
    PipelineConfig, PipelineContext, Result, VerifierConfig,
};

/// Administrative CLI for event-log repartitioning.
///
/// Operates on JSON event fixtures so every stage can be exercised without a
/// live datastore: migrate, bench, or run the whole pipeline.

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let matches = create_cli().get_matches();
    if let Err(e) = run_command(matches) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn create_cli() -> Command {
    let events_arg = Arg::new("events")
        .help("JSON file containing an array of event records")
        .required(true)
        .index(1);
    let table_arg = Arg::new("table")
        .help("Destination table name partitions are named after")
        .long("table")
        .default_value("viewing_events");
    let unit_arg = Arg::new("unit")
        .help("Partition period unit")
        .long("unit")
        .value_parser(["day", "week", "month"])
        .default_value("month");
    let start_arg = Arg::new("start")
        .help("First period start (YYYY-MM-DD); derived from the data when omitted")
        .long("start");
    let periods_arg = Arg::new("periods")
        .help("Number of consecutive periods; derived from the data when omitted")
        .long("periods");

    Command::new("eventpart-cli")
        .about("Event-log repartitioning CLI")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("migrate")
                .about("Provision partitions, migrate a monolithic event file, verify integrity")
                .arg(events_arg.clone())
                .arg(table_arg.clone())
                .arg(unit_arg.clone())
                .arg(start_arg.clone())
                .arg(periods_arg.clone())
                .arg(
                    Arg::new("batch-size")
                        .help("Rows per committed batch")
                        .long("batch-size")
                        .default_value("50000"),
                )
                .arg(
                    Arg::new("cursor-file")
                        .help("Persist the migration cursor here so interrupted runs resume")
                        .long("cursor-file"),
                )
                .arg(
                    Arg::new("checksums")
                        .help("Compare content checksums during verification")
                        .long("checksums")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("bench")
                .about("Benchmark the standard query suite against both layouts")
                .arg(events_arg.clone())
                .arg(table_arg.clone())
                .arg(unit_arg.clone())
                .arg(
                    Arg::new("runs")
                        .help("Measured runs per query")
                        .long("runs")
                        .default_value("5"),
                )
                .arg(
                    Arg::new("warmup")
                        .help("Warmup runs per query")
                        .long("warmup")
                        .default_value("1"),
                )
                .arg(
                    Arg::new("reference")
                        .help("Query reference instant (RFC 3339); defaults to the newest event")
                        .long("reference"),
                ),
        )
        .subcommand(
            Command::new("run")
                .about("Run the full pipeline and emit the assembled report")
                .arg(events_arg)
                .arg(table_arg)
                .arg(unit_arg)
                .arg(start_arg)
                .arg(periods_arg)
                .arg(
                    Arg::new("batch-size")
                        .help("Rows per committed batch")
                        .long("batch-size")
                        .default_value("50000"),
                )
                .arg(
                    Arg::new("runs")
                        .help("Measured runs per query")
                        .long("runs")
                        .default_value("5"),
                )
                .arg(
                    Arg::new("reference")
                        .help("Query reference instant (RFC 3339); defaults to the newest event")
                        .long("reference"),
                )
                .arg(
                    Arg::new("output")
                        .help("Write the report JSON here instead of stdout")
                        .long("output"),
                ),
        )
}

fn run_command(matches: ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("migrate", sub)) => cmd_migrate(sub),
        Some(("bench", sub)) => cmd_bench(sub),
        Some(("run", sub)) => cmd_run(sub),
        _ => Err(Error::Config("unknown subcommand".to_string())),
    }
}

fn cmd_migrate(matches: &ArgMatches) -> Result<()> {
    let events = load_events(arg(matches, "events")?)?;
    let table = arg(matches, "table")?;
    let unit = parse_unit(arg(matches, "unit")?)?;
    let batch_size: usize = parse_num(arg(matches, "batch-size")?, "batch-size")?;

    let source = MemoryStore::with_rows(format!("{table}_monolithic"), events)?;
    let destination = PartitionedStore::new(table, unit);
    provision_for(
        &source,
        &destination,
        table,
        unit,
        matches.get_one::<String>("start"),
        matches.get_one::<String>("periods"),
    )?;

    let migrator = BatchMigrator::new(MigratorConfig { batch_size });
    let summary = match matches.get_one::<String>("cursor-file") {
        Some(path) => migrator.migrate(
            &source,
            &destination,
            &JsonCursorStore::new(path),
            &LogProgress,
        )?,
        None => migrator.migrate(&source, &destination, &MemoryCursorStore::new(), &LogProgress)?,
    };

    let verification = IntegrityVerifier::new(VerifierConfig {
        compare_checksums: matches.get_flag("checksums"),
    })
    .verify(&source, &destination)?;

    print_json(&serde_json::json!({
        "migration": summary,
        "verification": verification,
        "partitions": destination.partitions(),
    }))
}

fn cmd_bench(matches: &ArgMatches) -> Result<()> {
    let events = load_events(arg(matches, "events")?)?;
    let table = arg(matches, "table")?;
    let unit = parse_unit(arg(matches, "unit")?)?;
    let reference = parse_reference(matches.get_one::<String>("reference"), &events)?;

    let source = MemoryStore::with_rows(format!("{table}_monolithic"), events)?;
    let destination = PartitionedStore::new(table, unit);
    provision_for(&source, &destination, table, unit, None, None)?;
    BatchMigrator::new(MigratorConfig::default()).migrate(
        &source,
        &destination,
        &MemoryCursorStore::new(),
        &LogProgress,
    )?;

    let bench = LatencyBenchmark::new(BenchmarkConfig {
        warmup_runs: parse_num(arg(matches, "warmup")?, "warmup")?,
        measured_runs: parse_num(arg(matches, "runs")?, "runs")?,
    });
    let suite = bench.run_suite(
        &AnalyticQuery::standard_suite(reference),
        &source,
        &destination,
    );
    print_json(&suite)
}

fn cmd_run(matches: &ArgMatches) -> Result<()> {
    let events = load_events(arg(matches, "events")?)?;
    let table = arg(matches, "table")?;
    let unit = parse_unit(arg(matches, "unit")?)?;
    let reference = parse_reference(matches.get_one::<String>("reference"), &events)?;
    let (start, periods) = partition_range(
        &events,
        unit,
        matches.get_one::<String>("start"),
        matches.get_one::<String>("periods"),
    )?;

    let source = MemoryStore::with_rows(format!("{table}_monolithic"), events)?;
    let destination = PartitionedStore::new(table, unit);
    let cursors = MemoryCursorStore::new();

    let cfg = PipelineConfig {
        table: table.to_string(),
        unit,
        partition_start: start,
        period_count: periods,
        migration: MigratorConfig {
            batch_size: parse_num(arg(matches, "batch-size")?, "batch-size")?,
        },
        verifier: VerifierConfig {
            compare_checksums: true,
        },
        benchmark: BenchmarkConfig {
            warmup_runs: 1,
            measured_runs: parse_num(arg(matches, "runs")?, "runs")?,
        },
    };
    let ctx = PipelineContext {
        source: &source,
        destination: &destination,
        ddl: &destination,
        cursors: &cursors,
        observer: &LogProgress,
        reference,
    };

    let outcome = eventpart::pipeline::run(&ctx, &cfg)?;
    let rendered = serde_json::to_string_pretty(&outcome.report)?;
    match matches.get_one::<String>("output") {
        Some(path) => {
            std::fs::write(path, rendered.as_bytes())
                .map_err(|e| Error::Io(format!("writing report {path}: {e}")))?;
            println!("Report written to {path}");
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

fn arg<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a str> {
    matches
        .get_one::<String>(name)
        .map(String::as_str)
        .ok_or_else(|| Error::Config(format!("missing argument '{name}'")))
}

fn parse_unit(s: &str) -> Result<PeriodUnit> {
    s.parse().map_err(Error::Config)
}

fn parse_num<T: std::str::FromStr>(s: &str, name: &str) -> Result<T> {
    s.parse()
        .map_err(|_| Error::Config(format!("invalid value '{s}' for {name}")))
}

fn load_events(path: &str) -> Result<Vec<EventRecord>> {
    let bytes = std::fs::read(Path::new(path))
        .map_err(|e| Error::Io(format!("reading events {path}: {e}")))?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn parse_reference(
    arg: Option<&String>,
    events: &[EventRecord],
) -> Result<DateTime<Utc>> {
    match arg {
        Some(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| Error::Config(format!("invalid reference instant '{s}': {e}"))),
        None => events
            .iter()
            .map(|r| r.event_timestamp)
            .max()
            .ok_or_else(|| Error::Config("no events to derive a reference instant from".to_string())),
    }
}

fn partition_range(
    events: &[EventRecord],
    unit: PeriodUnit,
    start: Option<&String>,
    periods: Option<&String>,
) -> Result<(NaiveDate, u32)> {
    let derived = || -> Result<(NaiveDate, u32)> {
        let min = events.iter().map(|r| r.event_timestamp).min();
        let max = events.iter().map(|r| r.event_timestamp).max();
        match (min, max) {
            (Some(min), Some(max)) => Ok(covering_range(
                min.date_naive(),
                max.date_naive(),
                unit,
            )),
            _ => Err(Error::Config(
                "no events to derive a partition range from".to_string(),
            )),
        }
    };

    let start = match start {
        Some(s) => parse_num::<NaiveDate>(s, "start")?,
        None => derived()?.0,
    };
    let periods = match periods {
        Some(s) => parse_num(s, "periods")?,
        None => derived()?.1,
    };
    Ok((start, periods))
}

fn provision_for(
    source: &MemoryStore,
    destination: &PartitionedStore,
    table: &str,
    unit: PeriodUnit,
    start: Option<&String>,
    periods: Option<&String>,
) -> Result<()> {
    let events = source.fetch_after(None, usize::MAX)?;
    let (start, periods) = partition_range(&events, unit, start, periods)?;
    let outcome =
        PartitionProvisioner::new(table, unit).create_partitions(destination, start, periods);
    match outcome.failures.first() {
        Some(f) => Err(Error::Provisioning {
            period: f.period_start.to_string(),
            reason: f.reason.clone(),
        }),
        None => Ok(()),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
