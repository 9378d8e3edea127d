//! Idempotent partition provisioning.
//!
//! The provisioner owns period arithmetic and descriptor bookkeeping; the
//! actual DDL lives behind [`PartitionDdl`], a capability supplied by the
//! surrounding system. The first DDL failure abandons the remaining periods
//! of that call. Already-created partitions are valid artifacts and are never
//! rolled back, so re-invoking with the same range is safe.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{partition_name, PartitionDescriptor, PeriodUnit};

/// External DDL capability: materialize one partition and its supporting
/// indexes. Implementations must be idempotent; creating a period that
/// already exists is a no-op success.
pub trait PartitionDdl {
    fn create_partition_and_indexes(&self, period_start: NaiveDate) -> crate::Result<()>;
}

/// One period the DDL capability rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionFailure {
    pub period_start: NaiveDate,
    pub reason: String,
}

/// Outcome of one `create_partitions` call: the periods materialized before
/// the first failure, plus the failure itself when one occurred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionOutcome {
    pub created: Vec<PartitionDescriptor>,
    pub failures: Vec<ProvisionFailure>,
}

impl ProvisionOutcome {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Creates consecutive time partitions for one table.
#[derive(Debug, Clone)]
pub struct PartitionProvisioner {
    table: String,
    unit: PeriodUnit,
}

impl PartitionProvisioner {
    pub fn new(table: impl Into<String>, unit: PeriodUnit) -> Self {
        Self {
            table: table.into(),
            unit,
        }
    }

    pub fn unit(&self) -> PeriodUnit {
        self.unit
    }

    /// Materialize `period_count` consecutive partitions starting at `start`.
    ///
    /// Failures do not unwind: the outcome reports what was created and which
    /// period failed, and the caller decides whether to retry. Calling this
    /// again with identical arguments yields the same descriptor set.
    pub fn create_partitions(
        &self,
        ddl: &dyn PartitionDdl,
        start: NaiveDate,
        period_count: u32,
    ) -> ProvisionOutcome {
        let start = self.unit.align(start);
        info!(
            table = %self.table,
            %start,
            period_count,
            "creating partitions"
        );

        let mut created = Vec::with_capacity(period_count as usize);
        let mut failures = Vec::new();
        let mut period_start = start;

        for _ in 0..period_count {
            let period_end = match self.unit.advance(period_start) {
                Some(end) => end,
                None => {
                    failures.push(ProvisionFailure {
                        period_start,
                        reason: "period end out of calendar range".to_string(),
                    });
                    break;
                }
            };

            match ddl.create_partition_and_indexes(period_start) {
                Ok(()) => {
                    created.push(PartitionDescriptor {
                        period_start,
                        period_end,
                        partition_name: partition_name(&self.table, self.unit, period_start),
                    });
                    period_start = period_end;
                }
                Err(e) => {
                    warn!(%period_start, error = %e, "partition creation failed, abandoning remaining periods");
                    failures.push(ProvisionFailure {
                        period_start,
                        reason: e.to_string(),
                    });
                    break;
                }
            }
        }

        info!(
            created = created.len(),
            failed = failures.len(),
            "partition creation complete"
        );
        ProvisionOutcome { created, failures }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::RwLock;

    /// DDL stub that records calls and can be told to reject a period.
    struct ScriptedDdl {
        calls: RwLock<Vec<NaiveDate>>,
        reject: Option<NaiveDate>,
    }

    impl ScriptedDdl {
        fn accepting() -> Self {
            Self {
                calls: RwLock::new(Vec::new()),
                reject: None,
            }
        }

        fn rejecting(period: NaiveDate) -> Self {
            Self {
                calls: RwLock::new(Vec::new()),
                reject: Some(period),
            }
        }
    }

    impl PartitionDdl for ScriptedDdl {
        fn create_partition_and_indexes(&self, period_start: NaiveDate) -> crate::Result<()> {
            self.calls.write().push(period_start);
            if self.reject == Some(period_start) {
                return Err(crate::Error::Provisioning {
                    period: period_start.to_string(),
                    reason: "rejected by test".to_string(),
                });
            }
            Ok(())
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn descriptors_are_contiguous_and_cover_range() {
        let ddl = ScriptedDdl::accepting();
        let provisioner = PartitionProvisioner::new("viewing_events", PeriodUnit::Month);
        let outcome = provisioner.create_partitions(&ddl, date(2026, 6, 1), 3);

        assert!(outcome.is_success());
        assert_eq!(outcome.created.len(), 3);
        for pair in outcome.created.windows(2) {
            assert_eq!(pair[0].period_end, pair[1].period_start);
        }
        assert_eq!(outcome.created[0].period_start, date(2026, 6, 1));
        assert_eq!(outcome.created[2].period_end, date(2026, 9, 1));
    }

    #[test]
    fn repeated_invocation_is_idempotent() {
        let ddl = ScriptedDdl::accepting();
        let provisioner = PartitionProvisioner::new("viewing_events", PeriodUnit::Month);
        let first = provisioner.create_partitions(&ddl, date(2026, 6, 1), 3);
        let second = provisioner.create_partitions(&ddl, date(2026, 6, 1), 3);

        assert_eq!(first, second);
        assert!(second.failures.is_empty());
    }

    #[test]
    fn failure_abandons_remaining_periods() {
        let ddl = ScriptedDdl::rejecting(date(2026, 7, 1));
        let provisioner = PartitionProvisioner::new("viewing_events", PeriodUnit::Month);
        let outcome = provisioner.create_partitions(&ddl, date(2026, 6, 1), 4);

        assert_eq!(outcome.created.len(), 1);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].period_start, date(2026, 7, 1));
        // August and September were never attempted
        assert_eq!(ddl.calls.read().len(), 2);
    }

    #[test]
    fn unaligned_start_is_snapped() {
        let ddl = ScriptedDdl::accepting();
        let provisioner = PartitionProvisioner::new("viewing_events", PeriodUnit::Month);
        let outcome = provisioner.create_partitions(&ddl, date(2026, 6, 19), 1);
        assert_eq!(outcome.created[0].period_start, date(2026, 6, 1));
    }
}
