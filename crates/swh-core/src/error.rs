//! # Error Types
//!
//! Errors raised while constructing core values. All errors use `thiserror`
//! for derive-based `Display` and `Error` implementations and carry the
//! offending input so callers can report it verbatim.

use thiserror::Error;

/// A persistent identifier failed to parse or validate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SwhidError {
    /// The text does not follow `swh:<version>:<kind>:<hash>`.
    #[error("invalid SWHID {input:?}: expected swh:1:<cnt|dir|rev|rel|snp>:<40 hex digits>")]
    Malformed {
        /// The rejected input.
        input: String,
    },

    /// The scheme version is not one this client understands.
    #[error("unsupported SWHID scheme version {0:?}")]
    UnsupportedVersion(String),

    /// The kind code is not one of `cnt`, `dir`, `rev`, `rel`, `snp`.
    #[error("unknown SWHID object kind code {0:?}")]
    UnknownKind(String),

    /// The object id is not a valid hex digest of the expected length.
    #[error("invalid SWHID object id {id:?}: {reason}")]
    InvalidObjectId {
        /// The rejected object id.
        id: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// An archive date string could not be parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid archive timestamp {input:?}: {reason}")]
pub struct TimestampError {
    /// The rejected input.
    pub input: String,
    /// Parser diagnostic.
    pub reason: String,
}
