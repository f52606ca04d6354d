//! Buffer helpers for the Windows enumeration APIs.
//!
//! These operate on plain slices so they build and test on every platform.

use pw_common::ProcessId;

/// Text of a NUL-terminated UTF-16 buffer such as `szExeFile`.
///
/// A buffer with no terminator is read to its end. Unpaired surrogates are
/// replaced rather than rejected.
pub fn wide_c_string(buf: &[u16]) -> String {
    let end = buf.iter().position(|&unit| unit == 0).unwrap_or(buf.len());
    String::from_utf16_lossy(&buf[..end])
}

/// Pids written by `EnumProcesses`, minus the reserved idle and system ids.
///
/// `bytes_returned` is the byte count the call reported; anything past it is
/// stale buffer content.
pub fn pids_from_buffer(buf: &[u32], bytes_returned: u32) -> Vec<ProcessId> {
    let count = (bytes_returned as usize / std::mem::size_of::<u32>()).min(buf.len());
    buf[..count]
        .iter()
        .map(|&raw| ProcessId(raw))
        .filter(|pid| !pid.is_windows_reserved())
        .collect()
}

/// Display name for a pid whose image path could not be queried.
pub fn placeholder_name(pid: ProcessId) -> String {
    format!("[{pid}]")
}
