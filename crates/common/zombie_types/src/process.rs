use core::{fmt, num::NonZero, str::FromStr};

use strum::FromRepr;

/// Process identity assigned by the host.
///
/// Zero and negative values never name a process, so the "this is the child"
/// and "duplication failed" sentinels cannot be represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ProcId(NonZero<u32>);

impl fmt::Display for ProcId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<ProcId> for u32 {
    fn from(value: ProcId) -> Self {
        value.0.get()
    }
}

impl From<ProcId> for NonZero<u32> {
    fn from(value: ProcId) -> Self {
        value.0
    }
}

impl From<NonZero<u32>> for ProcId {
    fn from(value: NonZero<u32>) -> Self {
        Self(value)
    }
}

impl ProcId {
    #[must_use]
    pub const fn new(value: NonZero<u32>) -> Self {
        Self(value)
    }

    /// Converts a raw `pid_t` value.
    ///
    /// Returns `None` for zero and negative values.
    #[must_use]
    pub fn from_raw(raw: i32) -> Option<Self> {
        let raw = u32::try_from(raw).ok()?;
        NonZero::new(raw).map(Self)
    }

    /// Returns the identity as a raw `pid_t` value.
    #[must_use]
    pub fn as_raw(self) -> i32 {
        // pid_max never exceeds 2^22 on Linux
        i32::try_from(self.0.get()).unwrap_or(i32::MAX)
    }
}

impl FromStr for ProcId {
    type Err = <NonZero<u32> as FromStr>::Err;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self::new)
    }
}

/// Scheduling state letter reported in the third field of `/proc/[pid]/stat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromRepr)]
#[repr(u8)]
pub enum ProcState {
    Running = b'R',
    Sleeping = b'S',
    DiskSleep = b'D',
    Zombie = b'Z',
    Stopped = b'T',
    TracingStop = b't',
    Waking = b'W',
    Dead = b'X',
    DeadLegacy = b'x',
    Wakekill = b'K',
    Parked = b'P',
    Idle = b'I',
}

impl ProcState {
    #[must_use]
    pub fn from_code(code: char) -> Option<Self> {
        u8::try_from(code).ok().and_then(Self::from_repr)
    }

    #[must_use]
    pub const fn code(self) -> char {
        self as u8 as char
    }

    /// Terminated, but the exit status has not been collected yet.
    #[must_use]
    pub const fn is_zombie(self) -> bool {
        matches!(self, Self::Zombie)
    }

    #[must_use]
    pub const fn is_alive(self) -> bool {
        !matches!(self, Self::Zombie | Self::Dead | Self::DeadLegacy)
    }
}

impl fmt::Display for ProcState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.code(), f)
    }
}
