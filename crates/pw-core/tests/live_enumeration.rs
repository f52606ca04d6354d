//! Enumeration against the live /proc of the test machine.
#![cfg(all(feature = "test-utils", target_os = "linux"))]

use pw_core::collect::{Enumerator, ProcFsBackend, ProcessHandle};
use pw_core::test_utils::ProcessHarness;
use pw_core::{get_all_processes, process_from_pid, processes_by_pattern, Error, ProcessId};
use regex::Regex;

#[test]
fn test_spawned_process_is_enumerated() {
    if !ProcessHarness::is_available() {
        println!("Skipping: sleep not available");
        return;
    }
    let child = ProcessHarness::spawn_sleep(30).expect("spawn sleep");

    let processes = get_all_processes().into_result().expect("enumerate /proc");
    assert!(processes.iter().any(|p| p.pid().0 == child.pid()));

    let pids: Vec<ProcessId> = processes.iter().map(|p| p.pid()).collect();
    let mut sorted = pids.clone();
    sorted.sort();
    assert_eq!(pids, sorted, "default enumeration is sorted by pid");
}

#[test]
fn test_launch_resolve_path_round_trip() {
    if !ProcessHarness::is_available() {
        return;
    }
    let child = ProcessHarness::spawn_sleep(30).expect("spawn sleep");
    let expected = child.canonical_program().expect("canonical sleep path");

    let process = process_from_pid(child.pid())
        .into_result()
        .expect("spawned pid resolves");
    let name = process.name();
    assert!(name.soft_errors.is_empty(), "unexpected soft errors: {:?}", name.soft_errors);
    assert_eq!(name.into_result().unwrap(), expected.to_string_lossy());
}

#[test]
fn test_info_of_spawned_process() {
    if !ProcessHarness::is_available() {
        return;
    }
    let child = ProcessHarness::spawn_sleep(30).expect("spawn sleep");
    let process = process_from_pid(child.pid()).into_result().unwrap();

    let info = process.info().expect("status readable for own child");
    let linux = info.as_linux().expect("linux detail");
    assert_eq!(linux.id, child.pid());
    assert_eq!(linux.parent_process_id, std::process::id());
    assert!(!linux.command.is_empty());
}

#[test]
fn test_nonexistent_pid_is_hard_error() {
    // Above the kernel's pid_max ceiling (4194304), so never allocated.
    let outcome = process_from_pid(4_194_305u32);
    assert!(matches!(
        outcome.hard_error(),
        Some(Error::ProcessNotFound { pid: 4_194_305 })
    ));
}

#[test]
fn test_exited_process_reports_failure_not_panic() {
    if !ProcessHarness::is_available() {
        return;
    }
    let mut child = ProcessHarness::spawn_sleep(30).expect("spawn sleep");
    let process = process_from_pid(child.pid()).into_result().unwrap();

    child.terminate().expect("kill and reap");

    let name = process.name();
    let err = name.hard_error().expect("name of a reaped process fails");
    assert!(err.is_vanished(), "unexpected error: {err}");
    assert!(process.info().is_err());
}

#[test]
fn test_by_name_finds_spawned_sleep() {
    if !ProcessHarness::is_available() {
        return;
    }
    let child = ProcessHarness::spawn_sleep(30).expect("spawn sleep");
    let program = child.canonical_program().unwrap();
    let pattern = format!("^{}$", regex::escape(&program.to_string_lossy()));

    let matched = processes_by_pattern(&pattern)
        .into_result()
        .expect("enumeration succeeds");
    assert!(matched.iter().any(|p| p.pid().0 == child.pid()));
}

#[test]
fn test_kernel_threads_get_bracketed_names() {
    let enumerator = Enumerator::new(ProcFsBackend::default());
    let outcome = enumerator.processes_by_name(&Regex::new(r"^\[kthreadd\]$").unwrap());
    let matched = outcome.into_result().expect("enumeration succeeds");
    // Containers usually have no kernel threads visible.
    if let Some(kthreadd) = matched.first() {
        assert_eq!(kthreadd.pid(), ProcessId(2));
    }
}
