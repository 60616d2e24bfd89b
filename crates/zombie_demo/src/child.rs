//! The child side of the demonstration.

use std::{io, time::Duration};

use zombie_types::process::ProcId;

use crate::{message::Message, pause::Pause};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildState {
    Running { i: u32 },
    Terminated,
}

/// Bounded counter loop run by the child after duplication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildFlow {
    state: ChildState,
    steps: u32,
    interval: Duration,
}

impl ChildFlow {
    /// Creates a flow that counts from 0 up to `steps`.
    ///
    /// A flow with zero steps terminates on its first step.
    #[must_use]
    pub fn new(steps: u32, interval: Duration) -> Self {
        Self {
            state: ChildState::Running { i: 0 },
            steps,
            interval,
        }
    }

    #[must_use]
    pub fn state(&self) -> ChildState {
        self.state
    }

    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.state == ChildState::Terminated
    }

    /// Performs one transition of the state machine.
    ///
    /// A running flow prints its counter, increments it and pauses. Once the
    /// counter reaches the step count, the final status line is printed and
    /// the flow becomes [`ChildState::Terminated`]. Stepping a terminated flow
    /// does nothing.
    ///
    /// # Errors
    ///
    /// Propagates write errors from `out`.
    pub fn step<W, P>(&mut self, out: &mut W, mut pause: P) -> io::Result<ChildState>
    where
        W: io::Write + ?Sized,
        P: Pause,
    {
        let ChildState::Running { i } = self.state else {
            return Ok(self.state);
        };

        if i >= self.steps {
            Message::SonOver.emit(out)?;
            self.state = ChildState::Terminated;
            return Ok(self.state);
        }

        Message::SonCounter(i).emit(out)?;
        let i = i + 1;
        pause.pause(self.interval);

        self.state = if i == self.steps {
            Message::SonOver.emit(out)?;
            ChildState::Terminated
        } else {
            ChildState::Running { i }
        };
        Ok(self.state)
    }

    /// Announces `pid` and steps until the flow terminates.
    ///
    /// # Errors
    ///
    /// Propagates write errors from `out`.
    pub fn run<W, P>(&mut self, pid: ProcId, out: &mut W, mut pause: P) -> io::Result<()>
    where
        W: io::Write + ?Sized,
        P: Pause,
    {
        Message::SonPid(pid).emit(out)?;
        while !self.is_terminated() {
            self.step(out, &mut pause)?;
        }
        Ok(())
    }
}
