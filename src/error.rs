//! Error types shared across the zone database core.

use std::fmt;

/// An error raised by the zone database core.
///
/// This does not model out-of-memory conditions: Rust's global allocator
/// aborts the process on allocation failure, so there is nothing for a
/// `Result` to carry in that case.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CoreError {
    /// A required input was missing or malformed.
    InvalidParam(String),
    /// A zone could not be loaded, parsed, or inserted.
    ZoneInvalid(String),
    /// A reload was attempted while no zone database was installed.
    OldDbMissing,
    /// Allocating the new zone database failed.
    NewDbAllocFailed,
}

impl std::error::Error for CoreError {}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidParam(reason) => write!(f, "invalid parameter: {reason}"),
            Self::ZoneInvalid(reason) => write!(f, "zone is invalid: {reason}"),
            Self::OldDbMissing => f.write_str("no zone database is currently installed"),
            Self::NewDbAllocFailed => f.write_str("could not allocate a new zone database"),
        }
    }
}
