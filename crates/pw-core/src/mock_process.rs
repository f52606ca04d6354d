//! In-memory backend for testing the enumeration façade.
//!
//! # Example
//!
//! ```ignore
//! use pw_core::collect::Enumerator;
//! use pw_core::mock_process::{MockBackend, MockProcess};
//!
//! let backend = MockBackend::new(vec![
//!     MockProcess::builder(1).name("/sbin/init").build(),
//!     MockProcess::builder(2).fallback_name("kthreadd").build(),
//!     MockProcess::builder(99).name("/usr/bin/sleep").vanished().build(),
//! ]);
//! let all = Enumerator::new(backend).all_processes();
//! ```

use crate::collect::{Backend, LinuxProcessInfo, ProcessHandle, ProcessInfo};
use pw_common::{Error, Outcome, ProcessId, Result};

// ============================================================================
// Deterministic RNG
// ============================================================================

/// Linear congruential generator for reproducible test populations.
///
/// Not suitable for anything but test data.
#[derive(Debug, Clone)]
pub struct MockRng {
    state: u64,
}

impl MockRng {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub fn next_u64(&mut self) -> u64 {
        // LCG parameters from Numerical Recipes
        self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1);
        self.state
    }

    pub fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        let idx = (self.next_u64() as usize) % items.len();
        &items[idx]
    }
}

impl Default for MockRng {
    fn default() -> Self {
        Self::new(42)
    }
}

// ============================================================================
// MockProcess
// ============================================================================

/// How a mock process answers `name()`.
#[derive(Debug, Clone, PartialEq, Eq)]
enum MockName {
    Resolved(String),
    /// Bracketed status name, reported with an `ExeEmpty` soft error.
    Fallback(String),
    Missing,
}

/// A scripted process handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockProcess {
    pid: ProcessId,
    ppid: u32,
    name: MockName,
    vanished: bool,
}

impl MockProcess {
    pub fn builder(pid: u32) -> MockProcessBuilder {
        MockProcessBuilder::new(pid)
    }
}

impl ProcessHandle for MockProcess {
    fn pid(&self) -> ProcessId {
        self.pid
    }

    fn name(&self) -> Outcome<String> {
        if self.vanished {
            return Outcome::fail(Error::ProcessNotFound { pid: self.pid.0 });
        }
        match &self.name {
            MockName::Resolved(name) => Outcome::ok(name.clone()),
            MockName::Fallback(comm) => Outcome::ok(format!("[{comm}]"))
                .with_soft_errors([Error::ExeEmpty { pid: self.pid.0 }]),
            MockName::Missing => Outcome::fail(Error::NameUnavailable { pid: self.pid.0 }),
        }
    }

    fn info(&self) -> Result<ProcessInfo> {
        if self.vanished {
            return Err(Error::ProcessNotFound { pid: self.pid.0 });
        }
        let command = match &self.name {
            MockName::Resolved(path) => path.rsplit('/').next().unwrap_or(path).to_string(),
            MockName::Fallback(comm) => comm.clone(),
            MockName::Missing => String::new(),
        };
        Ok(ProcessInfo::Linux(LinuxProcessInfo {
            id: self.pid.0,
            command,
            parent_process_id: self.ppid,
            thread_group_id: Some(self.pid.0),
            ..Default::default()
        }))
    }
}

/// Builder for [`MockProcess`].
#[derive(Debug, Clone)]
pub struct MockProcessBuilder {
    process: MockProcess,
}

impl MockProcessBuilder {
    pub fn new(pid: u32) -> Self {
        Self {
            process: MockProcess {
                pid: ProcessId(pid),
                ppid: 1,
                name: MockName::Resolved(format!("/usr/bin/mock-{pid}")),
                vanished: false,
            },
        }
    }

    /// Resolved executable path.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.process.name = MockName::Resolved(name.into());
        self
    }

    /// Behave like a process without a readable executable link.
    pub fn fallback_name(mut self, comm: impl Into<String>) -> Self {
        self.process.name = MockName::Fallback(comm.into());
        self
    }

    /// No name source at all.
    pub fn nameless(mut self) -> Self {
        self.process.name = MockName::Missing;
        self
    }

    pub fn ppid(mut self, ppid: u32) -> Self {
        self.process.ppid = ppid;
        self
    }

    /// Exited after enumeration: every accessor except `pid()` fails.
    pub fn vanished(mut self) -> Self {
        self.process.vanished = true;
        self
    }

    pub fn build(self) -> MockProcess {
        self.process
    }
}

// ============================================================================
// MockBackend
// ============================================================================

/// Backend serving a fixed list of mock processes.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    processes: Vec<MockProcess>,
    fail_enumeration: bool,
    /// Pids whose listing raises a soft error during enumeration.
    unreadable_entries: Vec<u32>,
}

impl MockBackend {
    pub fn new(processes: Vec<MockProcess>) -> Self {
        Self {
            processes,
            ..Default::default()
        }
    }

    /// A backend whose enumeration always fails outright.
    pub fn failing() -> Self {
        Self {
            fail_enumeration: true,
            ..Default::default()
        }
    }

    /// `count` processes with distinct pseudo-random pids and names.
    pub fn seeded(seed: u64, count: usize) -> Self {
        const NAMES: &[&str] = &["/usr/bin/sleep", "/bin/bash", "/usr/sbin/sshd", "/opt/app/worker"];
        let mut rng = MockRng::new(seed);
        let mut processes: Vec<MockProcess> = Vec::with_capacity(count);
        while processes.len() < count {
            let pid = rng.next_u32() % 4_000_000 + 2;
            if processes.iter().any(|p| p.pid.0 == pid) {
                continue;
            }
            let name = *rng.choose(NAMES);
            processes.push(MockProcess::builder(pid).name(name).build());
        }
        Self::new(processes)
    }

    pub fn push(&mut self, process: MockProcess) {
        self.processes.push(process);
    }

    /// Report a soft listing error for `pid` on every enumeration.
    pub fn with_unreadable_entry(mut self, pid: u32) -> Self {
        self.unreadable_entries.push(pid);
        self
    }
}

impl Backend for MockBackend {
    type Process = MockProcess;

    fn enumerate(&self) -> Outcome<Vec<MockProcess>> {
        if self.fail_enumeration {
            return Outcome::fail(Error::Sysctl(std::io::Error::other(
                "mock enumeration failure",
            )));
        }
        Outcome::ok(self.processes.clone()).with_soft_errors(
            self.unreadable_entries
                .iter()
                .map(|&pid| Error::NameLookup {
                    pid,
                    reason: "mock unreadable entry".to_string(),
                }),
        )
    }

    fn resolve_pid(&self, pid: ProcessId) -> Outcome<MockProcess> {
        match self.processes.iter().find(|p| p.pid == pid && !p.vanished) {
            Some(process) => Outcome::ok(process.clone()),
            None => Outcome::fail(Error::ProcessNotFound { pid: pid.0 }),
        }
    }
}
