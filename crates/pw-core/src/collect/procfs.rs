//! Linux backend over the /proc pseudo-filesystem.
//!
//! Enumeration lists the numeric entries of the proc root. Each handle
//! re-reads `/proc/[pid]/exe` and `/proc/[pid]/status` on demand, so a handle
//! never caches stale data and never holds a file open.

use super::proc_parsers::{
    parse_status_content, resolve_group_name, resolve_user_name, status_name,
};
use super::types::{Backend, ProcessHandle, ProcessInfo};
use crate::config::EnumConfig;
use pw_common::{Error, Outcome, ProcessId, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace};

#[derive(Debug)]
struct ProcFsRoots {
    proc_root: PathBuf,
    etc_root: PathBuf,
}

/// Process source backed by a procfs mount.
#[derive(Debug, Clone)]
pub struct ProcFsBackend {
    roots: Arc<ProcFsRoots>,
}

impl Default for ProcFsBackend {
    fn default() -> Self {
        Self::new("/proc", "/etc")
    }
}

impl ProcFsBackend {
    /// Read processes under `proc_root` and account names under `etc_root`.
    pub fn new(proc_root: impl Into<PathBuf>, etc_root: impl Into<PathBuf>) -> Self {
        Self {
            roots: Arc::new(ProcFsRoots {
                proc_root: proc_root.into(),
                etc_root: etc_root.into(),
            }),
        }
    }

    pub fn from_config(config: &EnumConfig) -> Self {
        Self::new(&config.proc_root, &config.etc_root)
    }

    pub fn proc_root(&self) -> &Path {
        &self.roots.proc_root
    }

    fn handle(&self, pid: ProcessId) -> LinuxProcess {
        LinuxProcess {
            pid,
            roots: Arc::clone(&self.roots),
        }
    }
}

impl Backend for ProcFsBackend {
    type Process = LinuxProcess;

    fn enumerate(&self) -> Outcome<Vec<LinuxProcess>> {
        let root = self.proc_root();
        let entries = match fs::read_dir(root) {
            Ok(entries) => entries,
            Err(source) => {
                return Outcome::fail(Error::ProcRead {
                    path: root.to_path_buf(),
                    source,
                })
            }
        };

        let mut processes = Vec::new();
        let mut soft_errors = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(source) => {
                    soft_errors.push(Error::ProcRead {
                        path: root.to_path_buf(),
                        source,
                    });
                    continue;
                }
            };
            let name = entry.file_name();
            if let Some(pid) = name.to_str().and_then(ProcessId::from_dir_name) {
                processes.push(self.handle(pid));
            }
        }

        trace!(count = processes.len(), root = %root.display(), "listed proc entries");
        Outcome::ok(processes).with_soft_errors(soft_errors)
    }

    fn resolve_pid(&self, pid: ProcessId) -> Outcome<LinuxProcess> {
        let path = self.proc_root().join(pid.to_string());
        match fs::metadata(&path) {
            Ok(_) => Outcome::ok(self.handle(pid)),
            Err(err) => {
                debug!(pid = pid.0, error = %err, "pid has no proc entry");
                Outcome::fail(Error::ProcessNotFound { pid: pid.0 })
            }
        }
    }
}

/// A Linux process addressed by pid.
#[derive(Debug, Clone)]
pub struct LinuxProcess {
    pid: ProcessId,
    roots: Arc<ProcFsRoots>,
}

impl LinuxProcess {
    fn proc_path(&self, file: &str) -> PathBuf {
        self.roots
            .proc_root
            .join(self.pid.to_string())
            .join(file)
    }

    /// Target of the `exe` link.
    ///
    /// Kernel threads have no backing executable and zombies lose theirs, so
    /// both fail here.
    pub fn executable(&self) -> Result<String> {
        let target = fs::read_link(self.proc_path("exe")).map_err(|source| {
            Error::ExeUnresolvable {
                pid: self.pid.0,
                source,
            }
        })?;
        let target = target.to_string_lossy().into_owned();
        if target.is_empty() {
            return Err(Error::ExeEmpty { pid: self.pid.0 });
        }
        Ok(target)
    }

    fn read_status(&self) -> Result<Vec<u8>> {
        let path = self.proc_path("status");
        fs::read(&path).map_err(|source| Error::ProcRead { path, source })
    }
}

impl ProcessHandle for LinuxProcess {
    fn pid(&self) -> ProcessId {
        self.pid
    }

    fn name(&self) -> Outcome<String> {
        let link_error = match self.executable() {
            Ok(path) => return Outcome::ok(path),
            Err(err) => err,
        };
        trace!(pid = self.pid.0, error = %link_error, "falling back to status name");

        let fallback = match self.read_status() {
            Ok(status) => match status_name(&status) {
                Some(name) => Outcome::ok(format!("[{name}]")),
                None => Outcome::fail(Error::NameUnavailable { pid: self.pid.0 }),
            },
            Err(err) => Outcome::fail(err),
        };
        fallback.with_soft_errors([link_error])
    }

    fn info(&self) -> Result<ProcessInfo> {
        let status = self.read_status()?;
        let mut info = parse_status_content(&status)?;

        match self.executable() {
            Ok(path) => info.executable = Some(path),
            Err(err) => debug!(pid = self.pid.0, error = %err, "executable unavailable"),
        }

        let etc_root = &self.roots.etc_root;
        info.user_name = resolve_user_name(etc_root, info.user_id);
        if info.user_name.is_none() {
            debug!(uid = info.user_id, etc = %etc_root.display(), "no passwd entry");
        }
        info.group_name = resolve_group_name(etc_root, info.group_id);
        if info.group_name.is_none() {
            debug!(gid = info.group_id, etc = %etc_root.display(), "no group entry");
        }

        Ok(ProcessInfo::Linux(info))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FakeProcTree;

    struct FakeProc(FakeProcTree);

    impl FakeProc {
        fn new() -> Self {
            let tree = FakeProcTree::new()
                .unwrap()
                .with_accounts(
                    "root:x:0:0:root:/root:/bin/sh\nalice:x:1000:1000::/home/alice:/bin/sh\n",
                    "root:x:0:\nusers:x:1000:\n",
                )
                .unwrap();
            Self(tree)
        }

        fn add(&self, pid: u32, status: &str, exe: Option<&str>) {
            self.0.add_process(pid, status, exe).unwrap();
        }

        fn proc_root(&self) -> &Path {
            self.0.proc_root()
        }

        fn backend(&self) -> ProcFsBackend {
            ProcFsBackend::new(self.0.proc_root(), self.0.etc_root())
        }
    }

    #[test]
    fn test_enumerate_keeps_numeric_entries() {
        let fake = FakeProc::new();
        fake.add(1, "Name:\tinit\nPid:\t1\n", Some("/sbin/init"));
        fake.add(42, "Name:\tbash\nPid:\t42\n", Some("/bin/bash"));
        fs::create_dir(fake.proc_root().join("self")).unwrap();
        fs::create_dir(fake.proc_root().join("sys")).unwrap();
        fs::write(fake.proc_root().join("uptime"), "1.0 1.0\n").unwrap();

        let outcome = fake.backend().enumerate();
        assert!(outcome.soft_errors.is_empty());
        let mut pids: Vec<u32> = outcome.value().unwrap().iter().map(|p| p.pid().0).collect();
        pids.sort_unstable();
        assert_eq!(pids, vec![1, 42]);
    }

    #[test]
    fn test_enumerate_missing_root_is_hard_error() {
        let backend = ProcFsBackend::new("/nonexistent/procwalk/proc", "/etc");
        let outcome = backend.enumerate();
        assert!(matches!(outcome.hard_error(), Some(Error::ProcRead { .. })));
    }

    #[test]
    fn test_name_prefers_exe_link() {
        let fake = FakeProc::new();
        fake.add(42, "Name:\tbash\n", Some("/usr/bin/bash"));
        let process = fake.backend().resolve_pid(ProcessId(42)).into_result().unwrap();

        let name = process.name();
        assert_eq!(name.value().map(String::as_str), Some("/usr/bin/bash"));
        assert!(name.soft_errors.is_empty());
    }

    #[test]
    fn test_name_falls_back_to_bracketed_status_name() {
        let fake = FakeProc::new();
        fake.add(2, "Name:\tkthreadd\nPid:\t2\n", None);
        let process = fake.backend().resolve_pid(ProcessId(2)).into_result().unwrap();

        let name = process.name();
        assert_eq!(name.value().map(String::as_str), Some("[kthreadd]"));
        assert_eq!(name.soft_errors.len(), 1);
        assert!(matches!(
            name.soft_errors[0],
            Error::ExeUnresolvable { pid: 2, .. }
        ));
    }

    #[test]
    fn test_name_fails_without_any_source() {
        let fake = FakeProc::new();
        fake.add(3, "Pid:\t3\n", None);
        let process = fake.backend().resolve_pid(ProcessId(3)).into_result().unwrap();

        let name = process.name();
        assert!(matches!(
            name.hard_error(),
            Some(Error::NameUnavailable { pid: 3 })
        ));
        assert_eq!(name.soft_errors.len(), 1);
    }

    #[test]
    fn test_name_of_vanished_process_is_hard_error() {
        let fake = FakeProc::new();
        fake.add(5, "Name:\tshort\n", None);
        let process = fake.backend().resolve_pid(ProcessId(5)).into_result().unwrap();
        fs::remove_dir_all(fake.proc_root().join("5")).unwrap();

        let name = process.name();
        let err = name.hard_error().unwrap();
        assert!(err.is_vanished());
        assert!(process.info().unwrap_err().is_vanished());
    }

    #[test]
    fn test_resolve_absent_pid() {
        let fake = FakeProc::new();
        let outcome = fake.backend().resolve_pid(ProcessId(999_999));
        assert!(matches!(
            outcome.hard_error(),
            Some(Error::ProcessNotFound { pid: 999_999 })
        ));
    }

    #[test]
    fn test_info_resolves_account_names_and_exe() {
        let fake = FakeProc::new();
        fake.add(
            77,
            "Name:\tworker\nState:\tR (running)\nPid:\t77\nPPid:\t1\nUid:\t1000\t1000\t1000\t1000\nGid:\t1000\t1000\t1000\t1000\nThreads:\t4\n",
            Some("/opt/worker"),
        );
        let process = fake.backend().resolve_pid(ProcessId(77)).into_result().unwrap();

        let info = process.info().unwrap();
        let linux = info.as_linux().unwrap();
        assert_eq!(linux.id, 77);
        assert_eq!(linux.command, "worker");
        assert_eq!(linux.user_name.as_deref(), Some("alice"));
        assert_eq!(linux.group_name.as_deref(), Some("users"));
        assert_eq!(linux.executable.as_deref(), Some("/opt/worker"));
        assert_eq!(linux.state.as_deref(), Some("R"));
        assert_eq!(linux.threads, Some(4));
        assert_eq!(info.parent_pid(), Some(ProcessId(1)));
    }

    #[test]
    fn test_info_with_unknown_uid_leaves_name_empty() {
        let fake = FakeProc::new();
        fake.add(8, "Name:\tx\nPid:\t8\nUid:\t4242\t4242\t4242\t4242\n", None);
        let process = fake.backend().resolve_pid(ProcessId(8)).into_result().unwrap();

        let info = process.info().unwrap();
        let linux = info.as_linux().unwrap();
        assert_eq!(linux.user_id, 4242);
        assert_eq!(linux.user_name, None);
        assert_eq!(linux.group_name.as_deref(), Some("root"));
        assert_eq!(linux.executable, None);
    }

    #[test]
    fn test_info_malformed_status_is_hard_error() {
        let fake = FakeProc::new();
        fake.add(9, "Name:\tx\nUid:\tabc\n", None);
        let process = fake.backend().resolve_pid(ProcessId(9)).into_result().unwrap();
        assert!(matches!(
            process.info(),
            Err(Error::StatusField { .. })
        ));
    }
}
