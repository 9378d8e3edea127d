//! Analytic query catalog and the target abstraction the latency harness
//! times against.
//!
//! Every query carries an explicit reference instant instead of reading the
//! wall clock, so the same query definition produces the same window on every
//! run against every layout.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Datelike, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{EventKind, EventRecord};

/// Fixed analytic workload, mirroring the dashboard queries the migration is
/// meant to speed up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AnalyticQuery {
    /// Distinct active users over the trailing window.
    DailyActiveUsers {
        reference: DateTime<Utc>,
        window_days: u32,
    },

    /// Most-started contents over the trailing window.
    TopContent {
        reference: DateTime<Utc>,
        window_hours: u32,
        limit: usize,
    },

    /// Event counts per device category over the trailing window.
    DeviceBreakdown {
        reference: DateTime<Utc>,
        window_days: u32,
    },
}

impl AnalyticQuery {
    pub fn name(&self) -> &'static str {
        match self {
            AnalyticQuery::DailyActiveUsers { .. } => "daily_active_users",
            AnalyticQuery::TopContent { .. } => "top_content",
            AnalyticQuery::DeviceBreakdown { .. } => "device_breakdown",
        }
    }

    /// Half-open time window `[start, end)` this query scans.
    pub fn window(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        match self {
            AnalyticQuery::DailyActiveUsers {
                reference,
                window_days,
            } => (*reference - Duration::days(*window_days as i64), *reference),
            AnalyticQuery::TopContent {
                reference,
                window_hours,
                ..
            } => (
                *reference - Duration::hours(*window_hours as i64),
                *reference,
            ),
            AnalyticQuery::DeviceBreakdown {
                reference,
                window_days,
            } => (*reference - Duration::days(*window_days as i64), *reference),
        }
    }

    /// The standard before/after comparison suite: 7-day active users,
    /// 24-hour top-10 contents, 30-day device breakdown.
    pub fn standard_suite(reference: DateTime<Utc>) -> Vec<AnalyticQuery> {
        vec![
            AnalyticQuery::DailyActiveUsers {
                reference,
                window_days: 7,
            },
            AnalyticQuery::TopContent {
                reference,
                window_hours: 24,
                limit: 10,
            },
            AnalyticQuery::DeviceBreakdown {
                reference,
                window_days: 30,
            },
        ]
    }
}

/// Result-set shape of one query execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOutput {
    /// Rows in the fully-consumed result set.
    pub rows: u64,

    /// How many partitions survived pruning, when the layout can tell.
    pub partitions_scanned: Option<u32>,
}

/// Something the benchmark can run a query against. Implementations must
/// fully consume the result set before returning, so the timed duration
/// covers execute-and-consume.
pub trait QueryTarget {
    /// Layout label used in logs and reports.
    fn layout(&self) -> &str;

    fn execute(&self, query: &AnalyticQuery) -> Result<QueryOutput>;
}

/// Evaluate a query over the rows already narrowed to its window.
///
/// Shared by every layout so the result sets are identical by construction;
/// layouts differ only in how they locate the windowed rows.
pub fn evaluate<'a, I>(query: &AnalyticQuery, rows: I) -> u64
where
    I: IntoIterator<Item = &'a EventRecord>,
{
    match query {
        AnalyticQuery::DailyActiveUsers { .. } => {
            let mut days_seen: HashMap<i32, HashSet<u32>> = HashMap::new();
            for row in rows {
                days_seen
                    .entry(row.event_timestamp.date_naive().num_days_from_ce())
                    .or_default()
                    .insert(row.user_id);
            }
            days_seen.len() as u64
        }
        AnalyticQuery::TopContent { limit, .. } => {
            let mut views: HashMap<u32, u64> = HashMap::new();
            for row in rows {
                if row.kind == EventKind::Start {
                    *views.entry(row.content_id).or_insert(0) += 1;
                }
            }
            let mut counts: Vec<(u32, u64)> = views.into_iter().collect();
            counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
            counts.len().min(*limit) as u64
        }
        AnalyticQuery::DeviceBreakdown { .. } => {
            let mut per_device: HashMap<&'static str, u64> = HashMap::new();
            for row in rows {
                *per_device.entry(row.device.as_str()).or_insert(0) += 1;
            }
            per_device.len() as u64
        }
    }
}
