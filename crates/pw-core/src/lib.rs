//! Cross-platform process enumeration.
//!
//! This library lists the processes running on the local machine, resolves
//! a single pid, and filters processes by name:
//! - Process collection through one native backend per platform
//! - Configuration loading (proc/etc roots, Windows strategy, sort order)
//! - Structured logging setup
//!
//! Every query returns a [`pw_common::Outcome`]: a hard error when nothing
//! usable came back, plus soft errors for per-process anomalies.

pub mod collect;
pub mod config;
pub mod logging;

pub use collect::{Backend, Enumerator, ProcessHandle, ProcessInfo};
#[cfg(any(target_os = "linux", target_os = "macos", windows))]
pub use collect::{
    get_all_processes, process_from_pid, processes_by_name, processes_by_pattern, NativeBackend,
    Process,
};
pub use pw_common::{Error, Outcome, ProcessId, Result};

// Re-export test utilities for integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod mock_process;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
