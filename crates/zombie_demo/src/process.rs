//! Process duplication and process-wide operations.

use std::io::{self, Write as _};

use nix::{errno::Errno, libc, unistd};
use zombie_types::process::ProcId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The host could not create a second flow, typically because the
    /// process table or memory is exhausted.
    #[error("process duplication failed: {0}")]
    DuplicationFailed(#[source] Errno),
}

/// Which side of a successful duplication the caller is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForkResult {
    Parent { child: ProcId },
    Child,
}

impl TryFrom<unistd::ForkResult> for ForkResult {
    type Error = Error;

    fn try_from(value: unistd::ForkResult) -> Result<Self, Self::Error> {
        match value {
            unistd::ForkResult::Child => Ok(Self::Child),
            unistd::ForkResult::Parent { child } => ProcId::from_raw(child.as_raw())
                .map(|child| Self::Parent { child })
                .ok_or(Error::DuplicationFailed(Errno::EINVAL)),
        }
    }
}

/// Duplicates the calling process.
///
/// Exactly one new process is created on success. Buffered stdout is flushed
/// first so that pending output is not written twice.
///
/// # Errors
///
/// Returns [`Error::DuplicationFailed`] when no child was created.
pub fn fork() -> Result<ForkResult, Error> {
    let _ = io::stdout().flush();
    // SAFETY: the demo is single-threaded when it forks, and the child only
    // writes to stdout, sleeps and exits.
    let res = unsafe { unistd::fork() }.map_err(Error::DuplicationFailed)?;
    res.try_into()
}

/// Returns the identity of the calling process.
#[must_use]
pub fn id() -> ProcId {
    // getpid always succeeds with a positive id
    ProcId::from_raw(unistd::getpid().as_raw()).unwrap()
}

/// Terminates the calling process immediately.
///
/// Stdout is flushed, then the process exits via `_exit`, skipping the
/// `atexit` handlers inherited from the parent.
pub fn exit(status: i32) -> ! {
    let _ = io::stdout().flush();
    // SAFETY: `_exit` only terminates the process; nothing runs after it.
    unsafe { libc::_exit(status) }
}

#[cfg(test)]
mod tests {
    use nix::unistd::Pid;

    use super::*;

    #[test]
    fn child_side() {
        let res = ForkResult::try_from(unistd::ForkResult::Child).unwrap();
        assert_eq!(res, ForkResult::Child);
    }

    #[test]
    fn parent_side_carries_child_id() {
        let res = ForkResult::try_from(unistd::ForkResult::Parent {
            child: Pid::from_raw(31337),
        })
        .unwrap();
        assert_eq!(
            res,
            ForkResult::Parent {
                child: ProcId::from_raw(31337).unwrap()
            }
        );
    }

    #[test]
    fn parent_side_rejects_sentinel_ids() {
        let res = ForkResult::try_from(unistd::ForkResult::Parent {
            child: Pid::from_raw(0),
        });
        assert_eq!(res, Err(Error::DuplicationFailed(Errno::EINVAL)));
    }

    #[test]
    fn duplication_failure_message() {
        let e = Error::DuplicationFailed(Errno::EAGAIN);
        assert!(e.to_string().starts_with("process duplication failed: "));
    }

    #[test]
    fn current_id_matches_std() {
        assert_eq!(u32::from(id()), std::process::id());
    }
}
