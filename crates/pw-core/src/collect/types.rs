//! Types shared by every collection backend.

use pw_common::{Outcome, ProcessId, Result};
use serde::{Deserialize, Serialize};

/// A live process as seen by one backend.
///
/// Handles are cheap values: they hold the pid plus whatever the backend
/// already learned during enumeration. Nothing here keeps an OS resource
/// open, so a handle can outlive the process it names. Later calls then
/// report the process as vanished instead of returning stale data.
pub trait ProcessHandle {
    /// The kernel-assigned process identifier.
    fn pid(&self) -> ProcessId;

    /// Best-effort executable name or path.
    ///
    /// A fallback name may come back alongside soft errors that explain why
    /// the preferred source was unavailable.
    fn name(&self) -> Outcome<String>;

    /// Platform-specific detail record.
    fn info(&self) -> Result<ProcessInfo>;
}

/// A source of process handles for one platform.
pub trait Backend {
    type Process: ProcessHandle;

    /// Every process currently visible, in whatever order the OS reports.
    fn enumerate(&self) -> Outcome<Vec<Self::Process>>;

    /// A handle for one pid, or a hard `ProcessNotFound`.
    fn resolve_pid(&self, pid: ProcessId) -> Outcome<Self::Process>;
}

/// Platform-specific process detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "platform", rename_all = "snake_case")]
pub enum ProcessInfo {
    Linux(LinuxProcessInfo),
    Bsd(BsdProcessInfo),
    Windows(WindowsProcessInfo),
}

impl ProcessInfo {
    /// Pid recorded in the detail record.
    pub fn pid(&self) -> ProcessId {
        match self {
            ProcessInfo::Linux(info) => ProcessId(info.id),
            ProcessInfo::Bsd(info) => ProcessId(info.pid),
            ProcessInfo::Windows(info) => ProcessId(info.pid),
        }
    }

    /// Parent pid, when the platform reports one.
    pub fn parent_pid(&self) -> Option<ProcessId> {
        match self {
            ProcessInfo::Linux(info) => Some(ProcessId(info.parent_process_id)),
            ProcessInfo::Bsd(info) => Some(ProcessId(info.ppid)),
            ProcessInfo::Windows(info) => info.parent_pid.map(ProcessId),
        }
    }

    /// Short command or image name.
    pub fn command(&self) -> &str {
        match self {
            ProcessInfo::Linux(info) => &info.command,
            ProcessInfo::Bsd(info) => &info.command,
            ProcessInfo::Windows(info) => &info.exe_name,
        }
    }

    pub fn as_linux(&self) -> Option<&LinuxProcessInfo> {
        match self {
            ProcessInfo::Linux(info) => Some(info),
            _ => None,
        }
    }
}

/// Detail decoded from `/proc/<pid>/status`.
///
/// Numeric fields hold the first whitespace-separated token of their line;
/// for `Uid` and `Gid` that is the real id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinuxProcessInfo {
    /// `Pid`
    pub id: u32,
    /// `Name`, truncated by the kernel to 15 bytes.
    pub command: String,
    /// `Uid` (real)
    pub user_id: u32,
    /// Account name for `user_id` from the passwd database.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    /// `Gid` (real)
    pub group_id: u32,
    /// Group name for `group_id` from the group database.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
    /// `PPid`
    pub parent_process_id: u32,
    /// Target of `/proc/<pid>/exe`, when readable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable: Option<String>,
    /// `State`, e.g. `S` for sleeping.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// `Tgid`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_group_id: Option<u32>,
    /// `TracerPid`; zero when not traced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracer_pid: Option<u32>,
    /// `Threads`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads: Option<u32>,
}

/// Detail decoded from one `kinfo_proc` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BsdProcessInfo {
    pub pid: u32,
    pub ppid: u32,
    /// `p_comm`, at most 16 bytes before the terminator.
    pub command: String,
}

/// Detail reported by the Windows enumeration APIs.
///
/// The psapi strategy only learns the pid and image path, so the parent and
/// thread count are optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowsProcessInfo {
    pub pid: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_pid: Option<u32>,
    pub exe_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_count: Option<u32>,
}
