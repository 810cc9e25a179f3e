//! Error and Result types for Weir history operations.

use std::io;
use thiserror::Error;

/// A convenience `Result` type for history operations.
pub type Result<T> = std::result::Result<T, HistoryError>;

/// The error type for history and codec operations.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Caller tried to record a delta with negative counters.
    #[error("tried recording negative data")]
    NegativeEntry,

    /// Persistent stream carried an unknown format version.
    #[error("unexpected version: {0}")]
    UnsupportedVersion(i32),

    /// Array length prefix was negative and not the absence sentinel.
    #[error("negative array length: {0}")]
    NegativeArrayLength(i32),

    /// Variable-length integer ran past 64 bits of payload.
    #[error("malformed varint")]
    MalformedVarInt,

    /// Decoded array length disagrees with the bucket count.
    #[error("mismatched history lengths: expected {expected}, got {actual}")]
    MismatchedLength {
        /// Bucket count implied by the bucket-start array.
        expected: usize,
        /// Length of the offending decoded array.
        actual: usize,
    },

    /// Underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
