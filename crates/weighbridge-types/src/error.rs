//! Error taxonomy for the weighbridge core

use thiserror::Error;

/// Per-frame decode failures. Recoverable: the reader logs and discards
/// the frame, the read loop keeps running.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    /// Frame was empty after control-character stripping. Not a fault.
    #[error("empty frame")]
    Empty,

    #[error("malformed frame: '{0}'")]
    Malformed(String),
}

/// Serial link failures. Recoverable at the reader level via the
/// retry/backoff loop, never fatal to the process.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("failed to open serial port '{port}': {reason}")]
    OpenFailed { port: String, reason: String },

    #[error("serial read failed: {0}")]
    ReadFailed(String),

    /// The link was closed while a read was in flight.
    #[error("serial link closed")]
    Closed,
}

/// Persistence failures. Wrap the underlying cause and propagate to the
/// caller; no automatic retry inside the core.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("store IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("field encryption error: {0}")]
    Crypto(String),

    #[error("record not found: id {0}")]
    NotFound(i64),

    /// Guarded second-weight update rejected: the record has no first
    /// weight, so completing it would corrupt the lifecycle.
    #[error("record {0} has no first weight, cannot complete")]
    FirstWeightMissing(i64),

    #[error("store backend error: {0}")]
    Backend(String),
}

/// Configuration store failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration directory not found")]
    NotFound,

    #[error("failed to parse configuration: {0}")]
    Parse(String),

    #[error("configuration IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Business-rule violations surfaced to the operator, plus storage
/// failures bubbling through the transaction layer.
#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("no active transaction")]
    NoActiveTransaction,

    /// A PENDING record already exists for this vehicle.
    #[error("vehicle '{0}' already has a pending transaction")]
    Conflict(String),

    #[error("no pending record for vehicle '{0}'")]
    NotFound(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
