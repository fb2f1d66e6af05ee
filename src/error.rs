//! Error types used by the list engines and the benchmark harness
use alloc::string::String;

use crate::list::NodeId;

/// Errors returned by list operations and by the benchmark harness.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Allocating the named structure failed. Nothing was inserted.
    #[error("Allocation of {0} failed")]
    Allocation(&'static str),
    /// The id is outside the range covered by the index table.
    #[error("Id {id} is outside the index table range 0..{capacity}")]
    Range {
        /// The offending id
        id: NodeId,
        /// Number of slots in the index table
        capacity: usize,
    },
    /// Bad invocation or configuration value. Contains a human readable reason.
    #[error("Usage error: {0}")]
    Usage(String),
    /// A benchmark thread panicked before producing its report.
    #[error("The {0} thread panicked")]
    WorkerPanicked(&'static str),
}
