use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, Serialize)]
pub enum Error {
    #[error("provisioning failed for period {period}: {reason}")]
    Provisioning { period: String, reason: String },

    /// Batch insert failed. The cursor still points at the last committed
    /// batch, so a retry resumes without loss or duplication.
    #[error("migration halted after id {last_event_id:?}: {reason}")]
    Migration {
        last_event_id: Option<u64>,
        reason: String,
    },

    #[error("connectivity failure: {0}")]
    Connectivity(String),

    #[error("benchmark query '{query}' failed: {reason}")]
    BenchmarkExecution { query: String, reason: String },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("report assembly error: {0}")]
    Report(String),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
