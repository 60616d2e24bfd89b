use std::io;

use zombie_types::process::ProcId;

/// "No such process", seen when a task exits between `open` and `read`.
const ESRCH: i32 = 3;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("process no longer exists (pid={pid})")]
    NoSuchProcess { pid: ProcId },
    #[error("process still exists but it's a zombie (pid={pid}, ppid={ppid})")]
    Zombie { pid: ProcId, ppid: u32 },
    #[error("access denied (pid={pid})")]
    AccessDenied { pid: ProcId },
    #[error("malformed procfs entry (pid={pid}): {reason}")]
    Malformed { pid: ProcId, reason: &'static str },
    #[error("malformed /proc/stat: {reason}")]
    MalformedSystemStat { reason: &'static str },
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    /// Classifies an I/O error raised while reading an entry of `pid`.
    pub(crate) fn from_io(pid: ProcId, e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::NotFound => Self::NoSuchProcess { pid },
            io::ErrorKind::PermissionDenied => Self::AccessDenied { pid },
            _ if e.raw_os_error() == Some(ESRCH) => Self::NoSuchProcess { pid },
            _ => Self::Io(e),
        }
    }

    /// The process disappeared; callers scanning many processes skip these.
    #[must_use]
    pub fn is_gone(&self) -> bool {
        matches!(self, Self::NoSuchProcess { .. })
    }
}
