//! Parsers for /proc and /etc text files.
//!
//! # Files Parsed
//! - `/proc/[pid]/status` - identity, credentials and scheduling state
//! - `/etc/passwd`, `/etc/group` - uid/gid to name lookup
//!
//! The parsers take file contents rather than paths so they can be exercised
//! without a live procfs.

use super::types::LinuxProcessInfo;
use pw_common::{Error, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

/// Field of [`LinuxProcessInfo`] that a status key populates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusField {
    Id,
    Command,
    State,
    ThreadGroupId,
    ParentProcessId,
    TracerPid,
    UserId,
    GroupId,
    Threads,
}

/// Status keys that are modelled. Anything else in the blob is ignored.
const STATUS_KEYS: &[(&str, StatusField)] = &[
    ("Name", StatusField::Command),
    ("State", StatusField::State),
    ("Tgid", StatusField::ThreadGroupId),
    ("Pid", StatusField::Id),
    ("PPid", StatusField::ParentProcessId),
    ("TracerPid", StatusField::TracerPid),
    ("Uid", StatusField::UserId),
    ("Gid", StatusField::GroupId),
    ("Threads", StatusField::Threads),
];

static STATUS_FIELDS: LazyLock<HashMap<&'static str, StatusField>> =
    LazyLock::new(|| STATUS_KEYS.iter().copied().collect());

impl StatusField {
    fn apply(self, info: &mut LinuxProcessInfo, key: &str, value: &str) -> Result<()> {
        match self {
            StatusField::Command => info.command = value.to_string(),
            StatusField::State => info.state = Some(value.to_string()),
            StatusField::Id => info.id = parse_u32(key, value)?,
            StatusField::ThreadGroupId => info.thread_group_id = Some(parse_u32(key, value)?),
            StatusField::ParentProcessId => info.parent_process_id = parse_u32(key, value)?,
            StatusField::TracerPid => info.tracer_pid = Some(parse_u32(key, value)?),
            StatusField::UserId => info.user_id = parse_u32(key, value)?,
            StatusField::GroupId => info.group_id = parse_u32(key, value)?,
            StatusField::Threads => info.threads = Some(parse_u32(key, value)?),
        }
        Ok(())
    }
}

fn parse_u32(key: &str, value: &str) -> Result<u32> {
    value.parse::<u32>().map_err(|source| Error::StatusField {
        key: key.to_string(),
        value: value.to_string(),
        source,
    })
}

/// Decode the contents of `/proc/[pid]/status`.
///
/// Each line is split once on its first colon and both halves are trimmed.
/// Only the first whitespace-separated token of the value is kept, so
/// `VmRSS:  1024 kB` yields `1024` and `Uid: 0 0 0 0` yields the real uid.
/// Lines without a colon and unknown keys are skipped. A modelled integer
/// field that does not parse fails the whole decode.
pub fn parse_status_content(content: &[u8]) -> Result<LinuxProcessInfo> {
    let text = String::from_utf8_lossy(content);
    let mut info = LinuxProcessInfo::default();

    for line in text.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let Some(field) = STATUS_FIELDS.get(key) else {
            continue;
        };
        let value = value.split_whitespace().next().unwrap_or("");
        field.apply(&mut info, key, value)?;
    }

    Ok(info)
}

/// Extract the untruncated `Name:` value from a status blob.
///
/// Unlike [`parse_status_content`] this keeps embedded spaces, since it
/// feeds the bracketed display name of processes without an executable.
pub fn status_name(content: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(content);
    text.lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(key, _)| key.trim() == "Name")
        .map(|(_, value)| value.trim().to_string())
        .filter(|name| !name.is_empty())
}

/// Find the name whose third colon-separated field equals `id`.
///
/// Works for both `passwd` and `group`, which share the
/// `name:password:id:...` prefix.
pub fn lookup_account_name(db_content: &str, id: u32) -> Option<String> {
    let wanted = id.to_string();
    db_content
        .lines()
        .filter(|line| !line.starts_with('#'))
        .find_map(|line| {
            let mut fields = line.split(':');
            let name = fields.next()?;
            let raw_id = fields.nth(1)?;
            (raw_id == wanted && !name.is_empty()).then(|| name.to_string())
        })
}

/// Resolve a uid to a user name via `<etc_root>/passwd`.
pub fn resolve_user_name(etc_root: &Path, uid: u32) -> Option<String> {
    let content = fs::read_to_string(etc_root.join("passwd")).ok()?;
    lookup_account_name(&content, uid)
}

/// Resolve a gid to a group name via `<etc_root>/group`.
pub fn resolve_group_name(etc_root: &Path, gid: u32) -> Option<String> {
    let content = fs::read_to_string(etc_root.join("group")).ok()?;
    lookup_account_name(&content, gid)
}
