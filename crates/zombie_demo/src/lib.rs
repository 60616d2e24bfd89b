//! Process duplication demonstration.
//!
//! The process forks once. The child prints a short counter and exits. The
//! parent idles forever without ever collecting the child's exit status, so
//! the child lingers in the process table as a zombie until the parent
//! itself goes away.

use std::{convert::Infallible, io};

use zombie_params::{CHILD_EXIT_STATUS, CHILD_PAUSE, CHILD_STEPS, PARENT_PAUSE};

use self::{
    child::ChildFlow,
    parent::ParentFlow,
    pause::ThreadSleep,
    process::ForkResult,
};

pub mod child;
pub mod message;
pub mod parent;
pub mod pause;
pub mod process;

/// Duplicates the process with `fork` and runs both flows.
///
/// Neither flow returns: the child exits, the parent idles until killed.
/// The only way back to the caller is a failed duplication, in which case
/// nothing has been written to `out`.
///
/// # Errors
///
/// Returns the error from `fork` unchanged.
pub fn run<F, W>(fork: F, out: &mut W) -> Result<Infallible, process::Error>
where
    F: FnOnce() -> Result<ForkResult, process::Error>,
    W: io::Write + ?Sized,
{
    match fork()? {
        ForkResult::Child => {
            let pid = process::id();
            let mut flow = ChildFlow::new(CHILD_STEPS, CHILD_PAUSE);
            if let Err(e) = flow.run(pid, out, ThreadSleep) {
                log::warn!("child {pid}: write to stdout failed: {e}");
            }
            log::debug!("child {pid} exiting with status {CHILD_EXIT_STATUS}");
            process::exit(CHILD_EXIT_STATUS);
        }
        ForkResult::Parent { child } => {
            let pid = process::id();
            log::debug!("parent {pid} forked child {child}, never reaping it");
            let flow = ParentFlow::new(PARENT_PAUSE);
            if let Err(e) = flow.announce(pid, out) {
                log::warn!("parent {pid}: write to stdout failed: {e}");
            }
            flow.run(ThreadSleep);
        }
    }
}
