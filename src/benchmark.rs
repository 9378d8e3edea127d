//! Comparative latency harness.
//!
//! Timing a single run of a query against a live store is noise; this
//! harness primes caches with discarded warmup runs, then reduces the
//! measured runs to their median, which a single outlier cannot drag.
//! Results remain best-effort point estimates of a possibly
//! concurrently-written store, not reproducible bounds.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::query::{AnalyticQuery, QueryTarget};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    /// Discarded executions that prime caches and plans.
    pub warmup_runs: u32,

    /// Timed executions reduced to a median.
    pub measured_runs: u32,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            warmup_runs: 1,
            measured_runs: 5,
        }
    }
}

/// Before/after comparison for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    pub query: String,

    pub before_ms: f64,

    pub after_ms: f64,

    /// `(before - after) / before * 100`; zero when `before_ms` is zero.
    pub improvement_pct: f64,

    /// `before / after`; zero when either side is zero.
    pub speedup: f64,
}

/// A query whose timed execution itself failed. Sibling queries still run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkFailure {
    pub query: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteOutcome {
    pub results: Vec<BenchmarkResult>,
    pub failures: Vec<BenchmarkFailure>,
}

/// Median of a sample set in milliseconds. Even-sized sets average the two
/// middle values; an empty set is zero.
pub fn median_ms(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}

pub struct LatencyBenchmark {
    config: BenchmarkConfig,
}

impl LatencyBenchmark {
    pub fn new(config: BenchmarkConfig) -> Self {
        Self { config }
    }

    /// Time one query against one target: warmups, then the median of the
    /// measured execute-and-consume durations.
    pub fn time_query(&self, query: &AnalyticQuery, target: &dyn QueryTarget) -> Result<f64> {
        if self.config.measured_runs == 0 {
            return Err(Error::Config(
                "measured_runs must be at least 1".to_string(),
            ));
        }

        let run = |target: &dyn QueryTarget| -> Result<f64> {
            let t0 = Instant::now();
            target.execute(query).map_err(|e| Error::BenchmarkExecution {
                query: query.name().to_string(),
                reason: e.to_string(),
            })?;
            Ok(t0.elapsed().as_secs_f64() * 1000.0)
        };

        for _ in 0..self.config.warmup_runs {
            run(target)?;
        }

        let mut samples = Vec::with_capacity(self.config.measured_runs as usize);
        for _ in 0..self.config.measured_runs {
            samples.push(run(target)?);
        }
        Ok(median_ms(&samples))
    }

    /// Derive the improvement figures for one query. Division by a zero
    /// before-latency is defined away: both ratios report zero.
    pub fn compare(query: impl Into<String>, before_ms: f64, after_ms: f64) -> BenchmarkResult {
        let (improvement_pct, speedup) = if before_ms > 0.0 {
            (
                (before_ms - after_ms) / before_ms * 100.0,
                if after_ms > 0.0 { before_ms / after_ms } else { 0.0 },
            )
        } else {
            (0.0, 0.0)
        };
        BenchmarkResult {
            query: query.into(),
            before_ms,
            after_ms,
            improvement_pct,
            speedup,
        }
    }

    /// Run every query against both layouts, serially, one query/target
    /// combination at a time. A failing query is recorded and skipped; it
    /// does not abort its siblings.
    pub fn run_suite(
        &self,
        queries: &[AnalyticQuery],
        before: &dyn QueryTarget,
        after: &dyn QueryTarget,
    ) -> SuiteOutcome {
        let mut results = Vec::with_capacity(queries.len());
        let mut failures = Vec::new();

        for query in queries {
            let timed = self
                .time_query(query, before)
                .and_then(|b| self.time_query(query, after).map(|a| (b, a)));
            match timed {
                Ok((before_ms, after_ms)) => {
                    let result = Self::compare(query.name(), before_ms, after_ms);
                    info!(
                        query = query.name(),
                        before_ms, after_ms,
                        improvement_pct = result.improvement_pct,
                        "benchmarked query"
                    );
                    results.push(result);
                }
                Err(e) => {
                    warn!(query = query.name(), error = %e, "benchmark query failed");
                    failures.push(BenchmarkFailure {
                        query: query.name().to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        SuiteOutcome { results, failures }
    }
}
