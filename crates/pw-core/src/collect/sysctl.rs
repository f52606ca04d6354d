//! macOS backend over `sysctl(CTL_KERN, KERN_PROC, KERN_PROC_ALL)`.
//!
//! The table is read with the usual two-phase protocol: query the size, then
//! fetch into a buffer of exactly that size. Processes started between the
//! two calls make the fetch fail with `ENOMEM`; that case is retried a
//! bounded number of times and each retry is reported as a soft error.

use super::kinfo::decode_kinfo_buffer;
use super::snapshot::CapturedProcess;
use super::types::Backend;
use crate::config::EnumConfig;
use pw_common::{Error, Outcome, ProcessId};
use std::io;
use std::ptr;
use tracing::{debug, trace};

/// Process source backed by the BSD process table.
#[derive(Debug, Clone)]
pub struct SysctlBackend {
    attempts: u32,
}

impl Default for SysctlBackend {
    fn default() -> Self {
        Self { attempts: 3 }
    }
}

impl SysctlBackend {
    /// Fetch the table at most `attempts` times before giving up.
    pub fn new(attempts: u32) -> Self {
        Self {
            attempts: attempts.max(1),
        }
    }

    pub fn from_config(config: &EnumConfig) -> Self {
        Self::new(config.sysctl_attempts)
    }

    fn read_process_table(&self) -> Outcome<Vec<u8>> {
        let mut soft_errors = Vec::new();
        for attempt in 1..=self.attempts {
            match kern_proc_all() {
                Ok(buf) => {
                    trace!(bytes = buf.len(), attempt, "read kinfo_proc table");
                    return Outcome::ok(buf).with_soft_errors(soft_errors);
                }
                Err(err) if err.raw_os_error() == Some(libc::ENOMEM) && attempt < self.attempts => {
                    debug!(attempt, "process table grew during sysctl, retrying");
                    soft_errors.push(Error::Sysctl(err));
                }
                Err(err) => return Outcome::fail(Error::Sysctl(err)).with_soft_errors(soft_errors),
            }
        }
        Outcome::fail(Error::Sysctl(io::Error::from_raw_os_error(libc::ENOMEM)))
            .with_soft_errors(soft_errors)
    }
}

fn kern_proc_all() -> io::Result<Vec<u8>> {
    let mut mib = [libc::CTL_KERN, libc::KERN_PROC, libc::KERN_PROC_ALL, 0];
    let mut size: libc::size_t = 0;

    let ret = unsafe {
        libc::sysctl(
            mib.as_mut_ptr(),
            mib.len() as libc::c_uint,
            ptr::null_mut(),
            &mut size,
            ptr::null_mut(),
            0,
        )
    };
    if ret != 0 {
        return Err(io::Error::last_os_error());
    }

    let mut buf = vec![0u8; size];
    let ret = unsafe {
        libc::sysctl(
            mib.as_mut_ptr(),
            mib.len() as libc::c_uint,
            buf.as_mut_ptr() as *mut libc::c_void,
            &mut size,
            ptr::null_mut(),
            0,
        )
    };
    if ret != 0 {
        return Err(io::Error::last_os_error());
    }

    buf.truncate(size);
    Ok(buf)
}

impl Backend for SysctlBackend {
    type Process = CapturedProcess;

    fn enumerate(&self) -> Outcome<Vec<CapturedProcess>> {
        self.read_process_table().and_then(|buf| {
            Outcome::from_result(
                decode_kinfo_buffer(&buf)
                    .map(|records| records.into_iter().map(CapturedProcess::from).collect()),
            )
        })
    }

    fn resolve_pid(&self, pid: ProcessId) -> Outcome<CapturedProcess> {
        self.enumerate()
            .and_then(|processes| Outcome::from_result(CapturedProcess::find(processes, pid)))
    }
}
