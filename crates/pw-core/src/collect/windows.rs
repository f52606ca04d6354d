//! Windows backend.
//!
//! Two strategies are available:
//! - `Snapshot` walks a ToolHelp process snapshot and captures pid, parent,
//!   thread count and image name in one pass.
//! - `Psapi` lists pids with `EnumProcesses` and queries each image path,
//!   which yields full paths but needs a handle per process.

use super::snapshot::CapturedProcess;
use super::toolhelp::{pids_from_buffer, placeholder_name, wide_c_string};
use super::types::{Backend, WindowsProcessInfo};
use crate::config::{EnumConfig, WindowsStrategy};
use pw_common::{Error, Outcome, ProcessId, Result};
use tracing::{debug, trace};
use windows_sys::Win32::Foundation::{
    CloseHandle, GetLastError, ERROR_NO_MORE_FILES, HANDLE, INVALID_HANDLE_VALUE, MAX_PATH,
};
use windows_sys::Win32::System::Diagnostics::ToolHelp::{
    CreateToolhelp32Snapshot, Process32FirstW, Process32NextW, PROCESSENTRY32W,
    TH32CS_SNAPPROCESS,
};
use windows_sys::Win32::System::ProcessStatus::K32EnumProcesses;
use windows_sys::Win32::System::Threading::{
    OpenProcess, QueryFullProcessImageNameW, PROCESS_NAME_WIN32,
    PROCESS_QUERY_LIMITED_INFORMATION,
};

const INITIAL_PID_CAPACITY: usize = 1024;

/// Closes the wrapped handle when dropped.
struct OwnedHandle(HANDLE);

impl Drop for OwnedHandle {
    fn drop(&mut self) {
        unsafe { CloseHandle(self.0) };
    }
}

fn last_error(call: &'static str) -> Error {
    Error::WinApi {
        call,
        code: unsafe { GetLastError() },
    }
}

/// Process source backed by the Win32 process APIs.
#[derive(Debug, Clone, Default)]
pub struct WindowsBackend {
    strategy: WindowsStrategy,
}

impl WindowsBackend {
    pub fn new(strategy: WindowsStrategy) -> Self {
        Self { strategy }
    }

    pub fn from_config(config: &EnumConfig) -> Self {
        Self::new(config.windows_strategy)
    }

    fn snapshot_processes(&self) -> Outcome<Vec<CapturedProcess>> {
        let snapshot = unsafe { CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0) };
        if snapshot == INVALID_HANDLE_VALUE {
            return Outcome::fail(last_error("CreateToolhelp32Snapshot"));
        }
        let snapshot = OwnedHandle(snapshot);

        let mut entry: PROCESSENTRY32W = unsafe { std::mem::zeroed() };
        entry.dwSize = std::mem::size_of::<PROCESSENTRY32W>() as u32;

        if unsafe { Process32FirstW(snapshot.0, &mut entry) } == 0 {
            return Outcome::fail(last_error("Process32FirstW"));
        }

        let mut processes = Vec::new();
        let mut soft_errors = Vec::new();
        loop {
            processes.push(CapturedProcess::from(WindowsProcessInfo {
                pid: entry.th32ProcessID,
                parent_pid: Some(entry.th32ParentProcessID),
                exe_name: wide_c_string(&entry.szExeFile),
                thread_count: Some(entry.cntThreads),
            }));

            if unsafe { Process32NextW(snapshot.0, &mut entry) } == 0 {
                let code = unsafe { GetLastError() };
                if code != ERROR_NO_MORE_FILES {
                    soft_errors.push(Error::WinApi {
                        call: "Process32NextW",
                        code,
                    });
                }
                break;
            }
        }

        trace!(count = processes.len(), "walked toolhelp snapshot");
        Outcome::ok(processes).with_soft_errors(soft_errors)
    }

    fn psapi_processes(&self) -> Outcome<Vec<CapturedProcess>> {
        let pids = match enum_process_ids() {
            Ok(pids) => pids,
            Err(err) => return Outcome::fail(err),
        };

        let mut processes = Vec::with_capacity(pids.len());
        let mut soft_errors = Vec::new();
        for pid in pids {
            let exe_name = match image_path(pid) {
                Ok(path) => path,
                Err(err) => {
                    debug!(pid = pid.0, error = %err, "image path unavailable");
                    soft_errors.push(Error::NameLookup {
                        pid: pid.0,
                        reason: err.to_string(),
                    });
                    placeholder_name(pid)
                }
            };
            processes.push(CapturedProcess::from(WindowsProcessInfo {
                pid: pid.0,
                parent_pid: None,
                exe_name,
                thread_count: None,
            }));
        }

        Outcome::ok(processes).with_soft_errors(soft_errors)
    }
}

/// Every live pid except the reserved idle and system ids.
fn enum_process_ids() -> Result<Vec<ProcessId>> {
    let mut buf = vec![0u32; INITIAL_PID_CAPACITY];
    loop {
        let capacity_bytes = (buf.len() * std::mem::size_of::<u32>()) as u32;
        let mut returned: u32 = 0;
        if unsafe { K32EnumProcesses(buf.as_mut_ptr(), capacity_bytes, &mut returned) } == 0 {
            return Err(last_error("EnumProcesses"));
        }
        // A full buffer may have been truncated.
        if returned < capacity_bytes {
            return Ok(pids_from_buffer(&buf, returned));
        }
        buf.resize(buf.len() * 2, 0);
    }
}

fn image_path(pid: ProcessId) -> Result<String> {
    let handle = unsafe { OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, 0, pid.0) };
    if handle.is_null() {
        return Err(last_error("OpenProcess"));
    }
    let handle = OwnedHandle(handle);

    let mut buf = [0u16; MAX_PATH as usize];
    let mut len = buf.len() as u32;
    if unsafe { QueryFullProcessImageNameW(handle.0, PROCESS_NAME_WIN32, buf.as_mut_ptr(), &mut len) }
        == 0
    {
        return Err(last_error("QueryFullProcessImageNameW"));
    }
    Ok(wide_c_string(&buf[..len as usize]))
}

impl Backend for WindowsBackend {
    type Process = CapturedProcess;

    fn enumerate(&self) -> Outcome<Vec<CapturedProcess>> {
        match self.strategy {
            WindowsStrategy::Snapshot => self.snapshot_processes(),
            WindowsStrategy::Psapi => self.psapi_processes(),
        }
    }

    fn resolve_pid(&self, pid: ProcessId) -> Outcome<CapturedProcess> {
        self.enumerate()
            .and_then(|processes| Outcome::from_result(CapturedProcess::find(processes, pid)))
    }
}
