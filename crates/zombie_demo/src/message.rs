//! Console lines written by both flows.
//!
//! The text is for humans; the exact spelling is kept stable because tests
//! and people watching the demo look for it.

use core::fmt;
use std::io::{self, Write};

use zombie_types::process::ProcId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    SonPid(ProcId),
    SonCounter(u32),
    SonOver,
    ParentPid(ProcId),
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SonPid(pid) => write!(f, "son pid is {pid}"),
            Self::SonCounter(i) => write!(f, "son---i={i}"),
            Self::SonOver => write!(f, "son is over!"),
            Self::ParentPid(pid) => write!(f, "parent pid is {pid}"),
        }
    }
}

impl Message {
    /// Writes the message as one newline-terminated line and flushes it.
    ///
    /// # Errors
    ///
    /// Propagates any write error from `out`.
    pub fn emit<W>(&self, out: &mut W) -> io::Result<()>
    where
        W: Write + ?Sized,
    {
        writeln!(out, "{self}")?;
        out.flush()
    }
}
