//! Handles for backends that capture everything during enumeration.
//!
//! The sysctl and Windows backends learn a process's name and detail record
//! in the same call that lists it. Their handles just replay that capture.

use super::types::{BsdProcessInfo, ProcessHandle, ProcessInfo, WindowsProcessInfo};
use pw_common::{Error, Outcome, ProcessId, Result};

/// A process captured by a single kernel snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedProcess {
    pid: ProcessId,
    name: String,
    info: ProcessInfo,
}

impl CapturedProcess {
    pub fn new(name: impl Into<String>, info: ProcessInfo) -> Self {
        Self {
            pid: info.pid(),
            name: name.into(),
            info,
        }
    }

    pub fn parent_pid(&self) -> Option<ProcessId> {
        self.info.parent_pid()
    }

    /// Pick `pid` out of a captured list, or report it missing.
    pub fn find(processes: Vec<CapturedProcess>, pid: ProcessId) -> Result<CapturedProcess> {
        processes
            .into_iter()
            .find(|process| process.pid == pid)
            .ok_or(Error::ProcessNotFound { pid: pid.0 })
    }
}

impl From<BsdProcessInfo> for CapturedProcess {
    fn from(info: BsdProcessInfo) -> Self {
        let name = info.command.clone();
        CapturedProcess::new(name, ProcessInfo::Bsd(info))
    }
}

impl From<WindowsProcessInfo> for CapturedProcess {
    fn from(info: WindowsProcessInfo) -> Self {
        let name = info.exe_name.clone();
        CapturedProcess::new(name, ProcessInfo::Windows(info))
    }
}

impl ProcessHandle for CapturedProcess {
    fn pid(&self) -> ProcessId {
        self.pid
    }

    /// The captured name, verbatim. Never fails, even when the kernel
    /// reported an empty name.
    fn name(&self) -> Outcome<String> {
        Outcome::ok(self.name.clone())
    }

    fn info(&self) -> Result<ProcessInfo> {
        Ok(self.info.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::{Backend, Enumerator};

    /// Serves a fixed capture, like one sysctl or snapshot call would.
    struct MockCaptured(Vec<CapturedProcess>);

    impl Backend for MockCaptured {
        type Process = CapturedProcess;

        fn enumerate(&self) -> Outcome<Vec<CapturedProcess>> {
            Outcome::ok(self.0.clone())
        }

        fn resolve_pid(&self, pid: ProcessId) -> Outcome<CapturedProcess> {
            Outcome::from_result(CapturedProcess::find(self.0.clone(), pid))
        }
    }

    fn bsd(pid: u32, command: &str) -> CapturedProcess {
        BsdProcessInfo {
            pid,
            ppid: 1,
            command: command.to_string(),
        }
        .into()
    }

    #[test]
    fn test_captured_replays_snapshot() {
        let process = bsd(42, "zsh");
        assert_eq!(process.pid(), ProcessId(42));
        assert_eq!(process.parent_pid(), Some(ProcessId(1)));
        assert_eq!(process.name().into_result().unwrap(), "zsh");
        assert_eq!(process.info().unwrap().command(), "zsh");
    }

    #[test]
    fn test_empty_name_is_returned_verbatim() {
        let process = bsd(77, "");
        let name = process.name();
        assert!(name.soft_errors.is_empty());
        assert_eq!(name.into_result().unwrap(), "");
    }

    #[test]
    fn test_empty_name_still_matched_by_name_filter() {
        let backend = MockCaptured(vec![bsd(77, ""), bsd(78, "zsh")]);
        let outcome = Enumerator::new(backend).processes_by_pattern("^$");
        assert!(outcome.soft_errors.is_empty());
        let matched: Vec<u32> = outcome.into_result().unwrap().iter().map(|p| p.pid().0).collect();
        assert_eq!(matched, vec![77]);
    }

    #[test]
    fn test_find_captured() {
        let all = vec![bsd(1, "launchd"), bsd(2, "kernel_task")];
        assert_eq!(CapturedProcess::find(all.clone(), ProcessId(2)).unwrap().name, "kernel_task");
        assert!(matches!(
            CapturedProcess::find(all, ProcessId(3)),
            Err(Error::ProcessNotFound { pid: 3 })
        ));
    }

    #[test]
    fn test_windows_capture_uses_exe_name() {
        let process: CapturedProcess = WindowsProcessInfo {
            pid: 1200,
            parent_pid: Some(600),
            exe_name: "svchost.exe".to_string(),
            thread_count: Some(12),
        }
        .into();
        assert_eq!(process.name().into_result().unwrap(), "svchost.exe");
        assert_eq!(process.parent_pid(), Some(ProcessId(600)));
    }
}
