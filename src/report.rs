//! Final report assembly. Pure data transform: no I/O, no timing, no store
//! access. Everything arrives as inputs from the earlier stages. Rendering
//! the report to any presentation format happens outside this crate.

use serde::{Deserialize, Serialize};

use crate::benchmark::{BenchmarkFailure, BenchmarkResult, SuiteOutcome};
use crate::error::{Error, Result};
use crate::store::TableStorage;
use crate::verify::VerificationOutcome;

/// Storage footprint of both layouts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageMetrics {
    pub monolithic: TableStorage,
    pub partitioned: TableStorage,
}

/// Pretty-printed storage table carried alongside the raw numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageAnalysis {
    pub monolithic_table_size: String,
    pub monolithic_indexes_size: String,
    pub partitioned_table_size: String,
    pub partitioned_indexes_size: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub executive_summary: String,

    pub query_performance: Vec<BenchmarkResult>,

    pub query_failures: Vec<BenchmarkFailure>,

    pub storage_metrics: StorageMetrics,

    pub storage_analysis: StorageAnalysis,

    pub verification: VerificationOutcome,

    pub maintenance_benefits: Vec<(String, String)>,

    pub recommendations: Vec<String>,
}

/// Format bytes as a human-readable string.
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    if bytes >= TB {
        format!("{:.2} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

pub struct ReportAssembler;

impl ReportAssembler {
    /// Combine benchmark, storage and verification outputs into one report.
    ///
    /// Fails only on a structurally unusable suite (nothing measured and
    /// nothing recorded as failed), which no normal pipeline produces.
    pub fn assemble(
        suite: &SuiteOutcome,
        storage: &StorageMetrics,
        verification: &VerificationOutcome,
    ) -> Result<Report> {
        if suite.results.is_empty() && suite.failures.is_empty() {
            return Err(Error::Report(
                "benchmark suite is empty; nothing to report".to_string(),
            ));
        }

        let executive_summary = Self::executive_summary(suite, verification);
        let recommendations = Self::recommendations(suite, verification);

        Ok(Report {
            executive_summary,
            query_performance: suite.results.clone(),
            query_failures: suite.failures.clone(),
            storage_metrics: *storage,
            storage_analysis: StorageAnalysis {
                monolithic_table_size: format_bytes(storage.monolithic.data_bytes),
                monolithic_indexes_size: format_bytes(storage.monolithic.index_bytes),
                partitioned_table_size: format_bytes(storage.partitioned.data_bytes),
                partitioned_indexes_size: format_bytes(storage.partitioned.index_bytes),
            },
            verification: verification.clone(),
            maintenance_benefits: vec![
                (
                    "VACUUM/ANALYZE".to_string(),
                    "Runs on smaller individual partitions, shrinking maintenance windows."
                        .to_string(),
                ),
                (
                    "Data archival".to_string(),
                    "Old periods drop instantly as whole partitions instead of slow bulk deletes."
                        .to_string(),
                ),
            ],
            recommendations,
        })
    }

    fn executive_summary(suite: &SuiteOutcome, verification: &VerificationOutcome) -> String {
        let mut summary = String::new();
        if let Some(avg) = Self::average_improvement(&suite.results) {
            summary.push_str(&format!(
                "Time-based partitioning changed analytic query latency by {avg:.1}% on average \
                 across {} benchmarked queries. ",
                suite.results.len()
            ));
        } else {
            summary.push_str("No query could be benchmarked successfully. ");
        }
        if verification.is_match() {
            summary.push_str(&format!(
                "All {} rows were migrated with verified integrity.",
                verification.destination_rows
            ));
        } else {
            summary.push_str(&format!(
                "Integrity verification FAILED (source {} rows, destination {} rows); \
                 the migration must be re-run before cutover.",
                verification.source_rows, verification.destination_rows
            ));
        }
        summary
    }

    fn recommendations(suite: &SuiteOutcome, verification: &VerificationOutcome) -> Vec<String> {
        let mut recs = vec![
            "Keep a time predicate on every analytic query so partition pruning applies."
                .to_string(),
            "Provision upcoming periods ahead of the data; rows without a covering partition are rejected."
                .to_string(),
            "Track per-partition sizes and tune maintenance on the hot partitions.".to_string(),
        ];
        if !verification.is_match() {
            recs.insert(
                0,
                "Re-run the migration: verification found a source/destination mismatch."
                    .to_string(),
            );
        }
        if !suite.failures.is_empty() {
            recs.push(format!(
                "Investigate {} failed benchmark quer{} before trusting the comparison.",
                suite.failures.len(),
                if suite.failures.len() == 1 { "y" } else { "ies" }
            ));
        }
        recs
    }

    fn average_improvement(results: &[BenchmarkResult]) -> Option<f64> {
        if results.is_empty() {
            return None;
        }
        Some(results.iter().map(|r| r.improvement_pct).sum::<f64>() / results.len() as f64)
    }
}
