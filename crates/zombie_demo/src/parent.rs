//! The parent side of the demonstration.
//!
//! The parent never calls a wait-family function. That is what leaves the
//! terminated child behind as a zombie.

use std::{io, time::Duration};

use zombie_types::process::ProcId;

use crate::{message::Message, pause::Pause};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentFlow {
    interval: Duration,
}

impl ParentFlow {
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Prints the parent's identity. Called once, before idling.
    ///
    /// # Errors
    ///
    /// Propagates write errors from `out`.
    pub fn announce<W>(&self, pid: ProcId, out: &mut W) -> io::Result<()>
    where
        W: io::Write + ?Sized,
    {
        Message::ParentPid(pid).emit(out)
    }

    /// A single idle period. Prints nothing.
    pub fn idle_once<P>(&self, mut pause: P)
    where
        P: Pause,
    {
        pause.pause(self.interval);
    }

    /// Idles until the process is killed from outside.
    pub fn run<P>(&self, mut pause: P) -> !
    where
        P: Pause,
    {
        loop {
            self.idle_once(&mut pause);
        }
    }
}
