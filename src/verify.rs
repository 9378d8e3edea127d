//! Post-migration integrity verification.
//!
//! Counts are computed independently on each side and compared; a mismatch
//! is reported as an outcome, never raised as an error. Content checksums
//! are optional and catch what equal counts cannot: same cardinality,
//! different rows.
//!
//! Only meaningful once migration reports completion; verifying mid-run
//! produces an honest mismatch, not an error. Sequencing is the caller's
//! responsibility.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;
use crate::store::EventStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifierConfig {
    /// Also stream both stores and compare CRC32 content digests.
    pub compare_checksums: bool,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            compare_checksums: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationOutcome {
    pub source_rows: u64,
    pub destination_rows: u64,
    pub counts_match: bool,
    /// `None` when checksum comparison was not requested.
    pub checksums_match: Option<bool>,
}

impl VerificationOutcome {
    pub fn is_match(&self) -> bool {
        self.counts_match && self.checksums_match.unwrap_or(true)
    }
}

pub struct IntegrityVerifier {
    config: VerifierConfig,
}

impl IntegrityVerifier {
    pub fn new(config: VerifierConfig) -> Self {
        Self { config }
    }

    pub fn verify(
        &self,
        source: &dyn EventStore,
        destination: &dyn EventStore,
    ) -> Result<VerificationOutcome> {
        let source_rows = source.total_rows()?;
        let destination_rows = destination.total_rows()?;
        let counts_match = source_rows == destination_rows;

        let checksums_match = if self.config.compare_checksums {
            Some(source.content_checksum()? == destination.content_checksum()?)
        } else {
            None
        };

        let outcome = VerificationOutcome {
            source_rows,
            destination_rows,
            counts_match,
            checksums_match,
        };

        if outcome.is_match() {
            info!(
                source_rows,
                destination_rows,
                checksums = ?checksums_match,
                "integrity verification passed"
            );
        } else {
            warn!(
                source_rows,
                destination_rows,
                checksums = ?checksums_match,
                "integrity verification mismatch"
            );
        }
        Ok(outcome)
    }
}
