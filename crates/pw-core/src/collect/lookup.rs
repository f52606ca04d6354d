//! Enumeration and lookup over any [`Backend`].

use super::types::{Backend, ProcessHandle};
use crate::config::EnumConfig;
use pw_common::{Outcome, ProcessId};
use regex::Regex;
use tracing::{debug, trace};

/// Platform-neutral process queries over one backend.
#[derive(Debug, Clone)]
pub struct Enumerator<B> {
    backend: B,
    sort_by_pid: bool,
}

impl<B: Backend> Enumerator<B> {
    /// Wrap a backend; results are sorted by pid.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            sort_by_pid: true,
        }
    }

    /// Keep the backend's native order instead of sorting by pid.
    pub fn with_sort_by_pid(mut self, sort: bool) -> Self {
        self.sort_by_pid = sort;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Every visible process.
    ///
    /// A backend hard error yields no processes at all. Otherwise the list
    /// comes back with any soft errors the backend accumulated.
    pub fn all_processes(&self) -> Outcome<Vec<B::Process>> {
        let mut outcome = self.backend.enumerate();
        if let Ok(processes) = &mut outcome.result {
            if self.sort_by_pid {
                processes.sort_by_key(|p| p.pid());
            }
            debug!(
                count = processes.len(),
                soft_errors = outcome.soft_errors.len(),
                "enumerated processes"
            );
        }
        outcome
    }

    /// The process with `pid`, or a hard `ProcessNotFound`.
    pub fn process_from_pid(&self, pid: impl Into<ProcessId>) -> Outcome<B::Process> {
        self.backend.resolve_pid(pid.into())
    }

    /// Processes whose resolved name matches `pattern`, in enumeration order.
    ///
    /// A process whose name cannot be resolved is left out of the result and
    /// its error is reported as soft, so one vanished process never fails
    /// the whole search. Soft errors raised while the fallback name was
    /// chosen are reported too, whether or not the process matched.
    pub fn processes_by_name(&self, pattern: &Regex) -> Outcome<Vec<B::Process>> {
        let (result, mut soft_errors) = self.all_processes().split();
        let processes = match result {
            Ok(processes) => processes,
            Err(err) => return Outcome::fail(err).with_soft_errors(soft_errors),
        };

        let mut matched = Vec::new();
        for process in processes {
            let (name, name_soft_errors) = process.name().split();
            soft_errors.extend(name_soft_errors);
            match name {
                Ok(name) if pattern.is_match(&name) => {
                    trace!(pid = process.pid().0, name = %name, "name matched");
                    matched.push(process);
                }
                Ok(_) => {}
                Err(err) => soft_errors.push(err),
            }
        }

        Outcome::ok(matched).with_soft_errors(soft_errors)
    }

    /// Like [`Self::processes_by_name`], compiling `pattern` first.
    ///
    /// An invalid pattern is a hard error and nothing is enumerated.
    pub fn processes_by_pattern(&self, pattern: &str) -> Outcome<Vec<B::Process>> {
        match Regex::new(pattern) {
            Ok(regex) => self.processes_by_name(&regex),
            Err(err) => Outcome::fail(err.into()),
        }
    }
}

#[cfg(any(target_os = "linux", target_os = "macos", windows))]
mod native {
    use super::*;
    use crate::collect::NativeBackend;
    use crate::config::process_config;

    /// Handle type produced by the native backend.
    pub type Process = <NativeBackend as Backend>::Process;

    impl Enumerator<NativeBackend> {
        /// The build platform's backend, configured from `config`.
        pub fn native(config: &EnumConfig) -> Self {
            Enumerator::new(NativeBackend::from_config(config)).with_sort_by_pid(config.sort_by_pid)
        }
    }

    fn process_enumerator() -> Enumerator<NativeBackend> {
        Enumerator::native(process_config())
    }

    /// Every visible process on this machine.
    pub fn get_all_processes() -> Outcome<Vec<Process>> {
        process_enumerator().all_processes()
    }

    /// The process with `pid` on this machine.
    pub fn process_from_pid(pid: impl Into<ProcessId>) -> Outcome<Process> {
        process_enumerator().process_from_pid(pid)
    }

    /// Processes on this machine whose name matches `pattern`.
    pub fn processes_by_name(pattern: &Regex) -> Outcome<Vec<Process>> {
        process_enumerator().processes_by_name(pattern)
    }

    /// Processes on this machine whose name matches the regex text `pattern`.
    pub fn processes_by_pattern(pattern: &str) -> Outcome<Vec<Process>> {
        process_enumerator().processes_by_pattern(pattern)
    }
}

#[cfg(any(target_os = "linux", target_os = "macos", windows))]
pub use native::{
    get_all_processes, process_from_pid, processes_by_name, processes_by_pattern, Process,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_process::{MockBackend, MockProcess};
    use pw_common::Error;

    fn pids<P: ProcessHandle>(processes: &[P]) -> Vec<u32> {
        processes.iter().map(|p| p.pid().0).collect()
    }

    fn backend() -> MockBackend {
        MockBackend::new(vec![
            MockProcess::builder(300).name("/usr/bin/sleep").build(),
            MockProcess::builder(1).name("/sbin/init").build(),
            MockProcess::builder(20).name("[kworker/0:1]").build(),
            MockProcess::builder(7).name("/usr/bin/sleep").build(),
        ])
    }

    #[test]
    fn test_all_processes_sorted() {
        let outcome = Enumerator::new(backend()).all_processes();
        assert_eq!(pids(outcome.value().unwrap()), vec![1, 7, 20, 300]);
    }

    #[test]
    fn test_all_processes_native_order() {
        let outcome = Enumerator::new(backend()).with_sort_by_pid(false).all_processes();
        assert_eq!(pids(outcome.value().unwrap()), vec![300, 1, 20, 7]);
    }

    #[test]
    fn test_all_processes_keeps_backend_soft_errors() {
        let backend = MockBackend::seeded(3, 12).with_unreadable_entry(4242);
        let outcome = Enumerator::new(backend).all_processes();
        assert_eq!(outcome.soft_errors.len(), 1);
        assert_eq!(outcome.soft_errors[0].pid(), Some(4242));

        let found = pids(outcome.value().unwrap());
        assert_eq!(found.len(), 12);
        assert!(found.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_by_name_is_filtered_enumeration() {
        for seed in [1, 17, 99, 2024] {
            let enumerator = Enumerator::new(MockBackend::seeded(seed, 40));
            let regex = Regex::new("sleep|sshd").unwrap();

            let expected: Vec<u32> = enumerator
                .all_processes()
                .into_result()
                .unwrap()
                .iter()
                .filter(|p| regex.is_match(&p.name().into_result().unwrap()))
                .map(|p| p.pid().0)
                .collect();

            let first = pids(&enumerator.processes_by_name(&regex).into_result().unwrap());
            let second = pids(&enumerator.processes_by_name(&regex).into_result().unwrap());
            assert_eq!(first, expected, "seed {seed}");
            assert_eq!(first, second, "seed {seed}");
        }
    }

    #[test]
    fn test_backend_failure_returns_nothing() {
        let outcome = Enumerator::new(MockBackend::failing()).all_processes();
        assert!(outcome.is_err());
        assert!(outcome.value().is_none());
    }

    #[test]
    fn test_process_from_pid() {
        let enumerator = Enumerator::new(backend());
        let found = enumerator.process_from_pid(20u32).into_result().unwrap();
        assert_eq!(found.name().into_result().unwrap(), "[kworker/0:1]");

        let missing = enumerator.process_from_pid(4242u32);
        assert!(matches!(
            missing.hard_error(),
            Some(Error::ProcessNotFound { pid: 4242 })
        ));
    }

    #[test]
    fn test_by_name_matches_in_enumeration_order() {
        let regex = Regex::new("sleep$").unwrap();
        let outcome = Enumerator::new(backend()).processes_by_name(&regex);
        assert_eq!(pids(outcome.value().unwrap()), vec![7, 300]);
        assert!(outcome.soft_errors.is_empty());
    }

    #[test]
    fn test_by_name_excludes_vanished_and_reports_soft() {
        let mut backend = backend();
        backend.push(MockProcess::builder(55).name("/usr/bin/sleep").vanished().build());
        let regex = Regex::new("sleep").unwrap();

        let outcome = Enumerator::new(backend).processes_by_name(&regex);
        assert_eq!(pids(outcome.value().unwrap()), vec![7, 300]);
        assert_eq!(outcome.soft_errors.len(), 1);
        assert_eq!(outcome.soft_errors[0].pid(), Some(55));
    }

    #[test]
    fn test_by_name_keeps_fallback_soft_errors() {
        let mut backend = backend();
        backend.push(MockProcess::builder(2).fallback_name("kthreadd").build());
        let regex = Regex::new("kthreadd").unwrap();

        let outcome = Enumerator::new(backend).processes_by_name(&regex);
        assert_eq!(pids(outcome.value().unwrap()), vec![2]);
        assert!(matches!(outcome.soft_errors[0], Error::ExeEmpty { pid: 2 }));
    }

    #[test]
    fn test_by_name_no_match_is_empty_success() {
        let regex = Regex::new("^nothing-like-this$").unwrap();
        let outcome = Enumerator::new(backend()).processes_by_name(&regex);
        assert!(outcome.value().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_pattern_is_hard_error() {
        let outcome = Enumerator::new(backend()).processes_by_pattern("(unclosed");
        assert!(matches!(outcome.hard_error(), Some(Error::InvalidPattern(_))));
    }

    #[test]
    fn test_by_name_propagates_backend_failure() {
        let regex = Regex::new(".").unwrap();
        let outcome = Enumerator::new(MockBackend::failing()).processes_by_name(&regex);
        assert!(outcome.is_err());
    }
}
