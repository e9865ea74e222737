//! Error types for the ledger

use crate::types::Cents;
use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Split policy parameters are inconsistent with the participants or total
    #[error("Invalid policy parameters: {0}")]
    InvalidPolicyParams(String),

    /// Exact split amounts do not add up to the expense total
    #[error("Split mismatch: splits sum to {actual}, expected {expected}")]
    SplitMismatch {
        /// Expense total
        expected: Cents,
        /// Sum of the supplied amounts
        actual: Cents,
    },

    /// Malformed expense record
    #[error("Invalid expense: {0}")]
    InvalidExpense(String),

    /// Malformed settlement record
    #[error("Invalid settlement: {0}")]
    InvalidSettlement(String),

    /// Invariant violation (zero-sum ledger, etc.)
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Accumulated amount does not fit in 64-bit minor units
    #[error("Amount overflow: {0}")]
    AmountOverflow(String),

    /// Group not found
    #[error("Group not found: {0}")]
    GroupNotFound(String),

    /// Member is not part of the group
    #[error("Unknown member {member} in group {group}")]
    UnknownMember {
        /// Group ID
        group: String,
        /// Member ID
        member: String,
    },

    /// Record with the same ID already stored
    #[error("Duplicate record: {0}")]
    DuplicateRecord(String),

    /// Expense or settlement not found
    #[error("Record not found: {0}")]
    RecordNotFound(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}
