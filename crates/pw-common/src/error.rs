//! Error types for procwalk.
//!
//! Errors come in two tiers, but share one type:
//! - A *hard* error means the requested operation produced nothing usable.
//! - A *soft* error is a per-item anomaly inside a batch; the batch itself
//!   still succeeded. See [`crate::Outcome`] for how the two travel together.
//!
//! Every variant carries a stable numeric code and a category so callers can
//! group or filter soft errors without string matching.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for procwalk operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Listing or inspecting live processes failed.
    Collection,
    /// Kernel-provided data could not be decoded.
    Decode,
    /// A native platform API reported failure.
    Platform,
    /// Caller-supplied input was rejected.
    Input,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Collection => write!(f, "collection"),
            ErrorCategory::Decode => write!(f, "decode"),
            ErrorCategory::Platform => write!(f, "platform"),
            ErrorCategory::Input => write!(f, "input"),
        }
    }
}

/// Unified error type for procwalk.
#[derive(Error, Debug)]
pub enum Error {
    // Collection errors (20-29)
    #[error("process {pid} not found")]
    ProcessNotFound { pid: u32 },

    #[error("unable to read {path}: {source}")]
    ProcRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to resolve executable link for pid {pid}: {source}")]
    ExeUnresolvable {
        pid: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("executable link for pid {pid} resolved to an empty path")]
    ExeEmpty { pid: u32 },

    #[error("no name found for pid {pid}")]
    NameUnavailable { pid: u32 },

    #[error("unable to resolve name of pid {pid}: {reason}")]
    NameLookup { pid: u32, reason: String },

    // Decode errors (30-39)
    #[error("status field {key} has non-integer value {value:?}: {source}")]
    StatusField {
        key: String,
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },

    #[error("record buffer of {len} bytes is not a multiple of the {record_size}-byte record size")]
    RecordLayout { len: usize, record_size: usize },

    #[error("record at offset {offset} is invalid: {detail}")]
    RecordInvalid { offset: usize, detail: String },

    // Platform errors (70-79)
    #[error("sysctl error: {0}")]
    Sysctl(#[source] std::io::Error),

    #[error("{call} failed with error {code}")]
    WinApi { call: &'static str, code: u32 },

    // Input errors (80-89)
    #[error("invalid name pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

impl Error {
    /// Returns the error code for this error type.
    ///
    /// Error codes are stable and grouped by category:
    /// - 20-29: Collection errors
    /// - 30-39: Decode errors
    /// - 70-79: Platform errors
    /// - 80-89: Input errors
    pub fn code(&self) -> u32 {
        match self {
            Error::ProcessNotFound { .. } => 20,
            Error::ProcRead { .. } => 21,
            Error::ExeUnresolvable { .. } => 22,
            Error::ExeEmpty { .. } => 23,
            Error::NameUnavailable { .. } => 24,
            Error::NameLookup { .. } => 25,
            Error::StatusField { .. } => 30,
            Error::RecordLayout { .. } => 31,
            Error::RecordInvalid { .. } => 32,
            Error::Sysctl(_) => 70,
            Error::WinApi { .. } => 71,
            Error::InvalidPattern(_) => 80,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::ProcessNotFound { .. }
            | Error::ProcRead { .. }
            | Error::ExeUnresolvable { .. }
            | Error::ExeEmpty { .. }
            | Error::NameUnavailable { .. }
            | Error::NameLookup { .. } => ErrorCategory::Collection,

            Error::StatusField { .. } | Error::RecordLayout { .. } | Error::RecordInvalid { .. } => {
                ErrorCategory::Decode
            }

            Error::Sysctl(_) | Error::WinApi { .. } => ErrorCategory::Platform,

            Error::InvalidPattern(_) => ErrorCategory::Input,
        }
    }

    /// Returns the pid this error is attached to, if any.
    pub fn pid(&self) -> Option<u32> {
        match self {
            Error::ProcessNotFound { pid }
            | Error::ExeUnresolvable { pid, .. }
            | Error::ExeEmpty { pid }
            | Error::NameUnavailable { pid }
            | Error::NameLookup { pid, .. } => Some(*pid),
            _ => None,
        }
    }

    /// Whether the error most likely means the target process exited.
    ///
    /// A pid that vanished between listing and inspection shows up as a
    /// missing `/proc/<pid>` entry.
    pub fn is_vanished(&self) -> bool {
        match self {
            Error::ProcessNotFound { .. } => true,
            Error::ProcRead { source, .. } | Error::ExeUnresolvable { source, .. } => {
                source.kind() == std::io::ErrorKind::NotFound
                    || source.raw_os_error() == Some(3) // ESRCH
            }
            _ => false,
        }
    }
}
