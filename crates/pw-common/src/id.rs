//! Process identity types.
//!
//! A pid is only unique among currently-live processes; the kernel may hand
//! it to a new process once the old one exits.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Process ID wrapper with display formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessId(pub u32);

impl ProcessId {
    /// Kernel-reserved pids on Windows (System Idle Process and System).
    pub const WINDOWS_RESERVED: [ProcessId; 2] = [ProcessId(0), ProcessId(4)];

    /// Whether this pid is reserved by the Windows kernel.
    pub fn is_windows_reserved(self) -> bool {
        Self::WINDOWS_RESERVED.contains(&self)
    }

    /// Parse a pid from a `/proc` directory entry name.
    ///
    /// Only plain decimal names qualify; `self`, `thread-self`, and other
    /// non-numeric entries return `None`.
    pub fn from_dir_name(name: &str) -> Option<Self> {
        if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        name.parse().ok().map(ProcessId)
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ProcessId {
    fn from(pid: u32) -> Self {
        ProcessId(pid)
    }
}

impl From<ProcessId> for u32 {
    fn from(pid: ProcessId) -> Self {
        pid.0
    }
}
