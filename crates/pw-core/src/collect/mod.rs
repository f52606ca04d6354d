//! Process enumeration and lookup.
//!
//! This module provides one backend per platform behind the [`Backend`]
//! trait:
//! - procfs (Linux): directory listing plus per-process file reads
//! - sysctl (macOS): one `KERN_PROC_ALL` table fetch
//! - Win32 (Windows): ToolHelp snapshot or psapi pid listing
//!
//! [`Enumerator`] layers the platform-neutral queries on top, and the free
//! functions run those queries against the build platform's backend.
//!
//! The record decoders in [`kinfo`] and [`toolhelp`] are plain byte-level
//! code and build on every platform.

pub mod kinfo;
mod lookup;
#[cfg(target_os = "linux")]
mod proc_parsers;
#[cfg(target_os = "linux")]
mod procfs;
mod snapshot;
#[cfg(target_os = "macos")]
mod sysctl;
pub mod toolhelp;
mod types;
#[cfg(windows)]
mod windows;

pub use lookup::Enumerator;
#[cfg(any(target_os = "linux", target_os = "macos", windows))]
pub use lookup::{
    get_all_processes, process_from_pid, processes_by_name, processes_by_pattern, Process,
};
#[cfg(target_os = "linux")]
pub use proc_parsers::{
    lookup_account_name, parse_status_content, resolve_group_name, resolve_user_name, status_name,
};
#[cfg(target_os = "linux")]
pub use procfs::{LinuxProcess, ProcFsBackend};
pub use snapshot::CapturedProcess;
#[cfg(target_os = "macos")]
pub use sysctl::SysctlBackend;
pub use types::{
    Backend, BsdProcessInfo, LinuxProcessInfo, ProcessHandle, ProcessInfo, WindowsProcessInfo,
};
#[cfg(windows)]
pub use windows::WindowsBackend;

/// Backend for the platform this crate was built for.
#[cfg(target_os = "linux")]
pub type NativeBackend = ProcFsBackend;
#[cfg(target_os = "macos")]
pub type NativeBackend = SysctlBackend;
#[cfg(windows)]
pub type NativeBackend = WindowsBackend;
