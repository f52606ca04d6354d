//! Decoder for the `kinfo_proc` table returned by `sysctl(KERN_PROC_ALL)`.
//!
//! The kernel hands back a flat buffer of fixed-size records. Only three
//! fields are modelled; the rest of each record is skipped by offset. The
//! offsets match the 64-bit Darwin layout:
//!
//! | offset | size | field                      |
//! |--------|------|----------------------------|
//! | 40     | 4    | `kp_proc.p_pid`            |
//! | 243    | 16   | `kp_proc.p_comm` (NUL-pad) |
//! | 560    | 4    | `kp_eproc.e_ppid`          |
//!
//! Kept platform-independent so the layout can be tested anywhere.

use super::types::BsdProcessInfo;
use pw_common::{Error, Result};

/// Size of one `struct kinfo_proc`.
pub const KINFO_PROC_SIZE: usize = 648;

const PID_OFFSET: usize = 40;
const COMM_OFFSET: usize = PID_OFFSET + 4 + 199;
const COMM_LEN: usize = 16;
const PPID_OFFSET: usize = COMM_OFFSET + COMM_LEN + 301;

const _: () = assert!(COMM_OFFSET == 243);
const _: () = assert!(PPID_OFFSET == 560);
const _: () = assert!(PPID_OFFSET + 4 + 84 == KINFO_PROC_SIZE);

/// Split `buf` into `record_size` chunks, rejecting a ragged tail.
pub fn fixed_records(buf: &[u8], record_size: usize) -> Result<std::slice::ChunksExact<'_, u8>> {
    if record_size == 0 || buf.len() % record_size != 0 {
        return Err(Error::RecordLayout {
            len: buf.len(),
            record_size,
        });
    }
    Ok(buf.chunks_exact(record_size))
}

/// Decode every record in a `KERN_PROC_ALL` buffer.
///
/// An empty buffer decodes to an empty list.
pub fn decode_kinfo_buffer(buf: &[u8]) -> Result<Vec<BsdProcessInfo>> {
    fixed_records(buf, KINFO_PROC_SIZE)?
        .enumerate()
        .map(|(index, record)| decode_kinfo_record(record, index * KINFO_PROC_SIZE))
        .collect()
}

/// Decode one record. `offset` is only used for error reporting.
pub fn decode_kinfo_record(record: &[u8], offset: usize) -> Result<BsdProcessInfo> {
    let pid = read_i32_le(record, PID_OFFSET, offset)?;
    let ppid = read_i32_le(record, PPID_OFFSET, offset)?;
    let comm = record
        .get(COMM_OFFSET..COMM_OFFSET + COMM_LEN)
        .ok_or_else(|| truncated(offset, "p_comm", record.len()))?;

    let pid = u32::try_from(pid).map_err(|_| Error::RecordInvalid {
        offset,
        detail: format!("negative pid {pid}"),
    })?;
    let ppid = u32::try_from(ppid).map_err(|_| Error::RecordInvalid {
        offset,
        detail: format!("negative ppid {ppid}"),
    })?;

    Ok(BsdProcessInfo {
        pid,
        ppid,
        command: c_string(comm),
    })
}

fn read_i32_le(record: &[u8], at: usize, offset: usize) -> Result<i32> {
    record
        .get(at..at + 4)
        .and_then(|bytes| <[u8; 4]>::try_from(bytes).ok())
        .map(i32::from_le_bytes)
        .ok_or_else(|| truncated(offset, "integer field", record.len()))
}

fn truncated(offset: usize, field: &str, len: usize) -> Error {
    Error::RecordInvalid {
        offset,
        detail: format!("{field} lies outside a {len}-byte record"),
    }
}

/// Text up to the first NUL, or the whole slice if there is none.
pub fn c_string(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

#[cfg(test)]
pub(crate) fn encode_kinfo_record(pid: i32, ppid: i32, comm: &[u8]) -> Vec<u8> {
    let mut record = vec![0u8; KINFO_PROC_SIZE];
    record[PID_OFFSET..PID_OFFSET + 4].copy_from_slice(&pid.to_le_bytes());
    let len = comm.len().min(COMM_LEN);
    record[COMM_OFFSET..COMM_OFFSET + len].copy_from_slice(&comm[..len]);
    record[PPID_OFFSET..PPID_OFFSET + 4].copy_from_slice(&ppid.to_le_bytes());
    record
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_keeps_every_record() {
        let mut buf = encode_kinfo_record(1, 0, b"launchd");
        buf.extend(encode_kinfo_record(88, 1, b"syslogd"));
        buf.extend(encode_kinfo_record(501, 88, b"zsh"));

        let records = decode_kinfo_buffer(&buf).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[2].pid, 501);
        assert_eq!(records[2].ppid, 88);
        assert_eq!(records[2].command, "zsh");
        assert_eq!(records[0].command, "launchd");
    }

    #[test]
    fn test_decode_empty_buffer() {
        assert!(decode_kinfo_buffer(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_decode_rejects_ragged_buffer() {
        let mut buf = encode_kinfo_record(1, 0, b"launchd");
        buf.extend_from_slice(&[0u8; 10]);
        match decode_kinfo_buffer(&buf).unwrap_err() {
            Error::RecordLayout { len, record_size } => {
                assert_eq!(len, KINFO_PROC_SIZE + 10);
                assert_eq!(record_size, KINFO_PROC_SIZE);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_full_width_comm_has_no_terminator() {
        let record = encode_kinfo_record(7, 1, b"sixteen_chars_xx");
        let info = decode_kinfo_record(&record, 0).unwrap();
        assert_eq!(info.command, "sixteen_chars_xx");
    }

    #[test]
    fn test_negative_pid_rejected() {
        let mut buf = encode_kinfo_record(3, 1, b"ok");
        buf.extend(encode_kinfo_record(-1, 1, b"bad"));
        match decode_kinfo_buffer(&buf).unwrap_err() {
            Error::RecordInvalid { offset, .. } => assert_eq!(offset, KINFO_PROC_SIZE),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_short_record_is_bounds_checked() {
        let err = decode_kinfo_record(&[0u8; 100], 0).unwrap_err();
        assert!(matches!(err, Error::RecordInvalid { .. }));
    }

    #[test]
    fn test_fixed_records_zero_size() {
        assert!(fixed_records(&[1, 2, 3], 0).is_err());
    }

    #[test]
    fn test_c_string() {
        assert_eq!(c_string(b"abc\0def"), "abc");
        assert_eq!(c_string(b"\0"), "");
        assert_eq!(c_string(b"xyz"), "xyz");
    }
}
