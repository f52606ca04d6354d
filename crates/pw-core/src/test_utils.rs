//! Test utilities for pw-core.
//!
//! This module provides test infrastructure including:
//! - Assertion macros for [`pw_common::Outcome`]
//! - A harness that spawns real processes and reaps them on drop
//! - Fake `/proc` and `/etc` trees for backend tests without a live procfs

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

// ============================================================================
// Macros
// ============================================================================

/// Assert that an `Outcome` produced a value and return it.
#[macro_export]
macro_rules! assert_outcome_ok {
    ($expr:expr) => {
        match $expr.result {
            Ok(val) => val,
            Err(e) => panic!("Expected Ok outcome, got Err: {:?}", e),
        }
    };
}

/// Assert that an `Outcome` failed outright.
#[macro_export]
macro_rules! assert_outcome_err {
    ($expr:expr) => {
        match $expr.result {
            Ok(val) => panic!("Expected Err outcome, got Ok: {:?}", val),
            Err(e) => e,
        }
    };
}

// ============================================================================
// Process Harness
// ============================================================================

/// Spawns throwaway processes for live enumeration tests.
pub struct ProcessHarness;

impl ProcessHarness {
    /// Whether `sleep` can be found on `PATH`.
    pub fn is_available() -> bool {
        which("sleep").is_some()
    }

    /// Start `sleep <seconds>`.
    pub fn spawn_sleep(seconds: u32) -> std::io::Result<SpawnedProcess> {
        let program = which("sleep").ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "sleep not found on PATH")
        })?;
        let child = Command::new(&program)
            .arg(seconds.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        Ok(SpawnedProcess { child, program })
    }
}

/// A child process that is killed and reaped when dropped.
pub struct SpawnedProcess {
    child: Child,
    program: PathBuf,
}

impl SpawnedProcess {
    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Path the process was launched from.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// The launched path with symlinks resolved, as the kernel reports it.
    pub fn canonical_program(&self) -> std::io::Result<PathBuf> {
        std::fs::canonicalize(&self.program)
    }

    /// Kill and reap now, leaving the pid free.
    pub fn terminate(&mut self) -> std::io::Result<()> {
        match self.child.kill() {
            Ok(()) => {}
            // Already exited.
            Err(e) if e.kind() == std::io::ErrorKind::InvalidInput => {}
            Err(e) => return Err(e),
        }
        self.child.wait().map(|_| ())
    }
}

impl Drop for SpawnedProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// First executable named `program` on `PATH`.
pub fn which(program: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}

// ============================================================================
// Fake procfs
// ============================================================================

/// A fake `/proc` plus `/etc` pair rooted in temporary directories.
pub struct FakeProcTree {
    proc_dir: tempfile::TempDir,
    etc_dir: tempfile::TempDir,
}

impl FakeProcTree {
    pub fn new() -> std::io::Result<Self> {
        Ok(Self {
            proc_dir: tempfile::tempdir()?,
            etc_dir: tempfile::tempdir()?,
        })
    }

    pub fn proc_root(&self) -> &Path {
        self.proc_dir.path()
    }

    pub fn etc_root(&self) -> &Path {
        self.etc_dir.path()
    }

    /// Write `/etc/passwd` and `/etc/group`.
    pub fn with_accounts(self, passwd: &str, group: &str) -> std::io::Result<Self> {
        std::fs::write(self.etc_dir.path().join("passwd"), passwd)?;
        std::fs::write(self.etc_dir.path().join("group"), group)?;
        Ok(self)
    }

    /// Add `/proc/<pid>/status` and, on Unix, an `exe` link to `exe`.
    pub fn add_process(&self, pid: u32, status: &str, exe: Option<&str>) -> std::io::Result<()> {
        let dir = self.proc_dir.path().join(pid.to_string());
        std::fs::create_dir_all(&dir)?;
        std::fs::write(dir.join("status"), status)?;
        #[cfg(unix)]
        if let Some(target) = exe {
            std::os::unix::fs::symlink(target, dir.join("exe"))?;
        }
        #[cfg(not(unix))]
        let _ = exe;
        Ok(())
    }

    /// Add a pid directory with no readable files.
    pub fn add_empty_entry(&self, pid: u32) -> std::io::Result<()> {
        std::fs::create_dir_all(self.proc_dir.path().join(pid.to_string()))
    }

    /// Add a non-process entry such as `self` or `uptime`.
    pub fn add_non_process_entry(&self, name: &str) -> std::io::Result<()> {
        std::fs::create_dir_all(self.proc_dir.path().join(name))
    }

    /// Build a status blob with the fields the decoder models.
    pub fn status(pid: u32, name: &str, ppid: u32, uid: u32, gid: u32) -> String {
        format!(
            "Name:\t{name}\nUmask:\t0022\nState:\tS (sleeping)\nTgid:\t{pid}\nPid:\t{pid}\nPPid:\t{ppid}\nTracerPid:\t0\nUid:\t{uid}\t{uid}\t{uid}\t{uid}\nGid:\t{gid}\t{gid}\t{gid}\t{gid}\nVmRSS:\t    1024 kB\nThreads:\t1\n"
        )
    }
}
