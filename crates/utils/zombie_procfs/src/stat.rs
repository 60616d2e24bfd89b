//! Parser for `/proc/[pid]/stat`.
//!
//! See proc(5) for the field list. Field numbers below are 1-based as in the
//! manual.

use zombie_types::process::{ProcId, ProcState};

use crate::error::Error;

/// Selected fields of `/proc/[pid]/stat`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcStat {
    /// (1) pid
    pub pid: ProcId,
    /// (2) comm, without the surrounding parentheses
    pub comm: String,
    /// (3) state
    pub state: ProcState,
    /// (4) ppid; 0 for processes spawned by the kernel
    pub ppid: u32,
    /// (5) pgrp
    pub pgrp: u32,
    /// (6) session
    pub session: u32,
    /// (14) utime, in clock ticks
    pub utime: u64,
    /// (15) stime, in clock ticks
    pub stime: u64,
    /// (16) cutime: user time of waited-for children, in clock ticks
    pub cutime: u64,
    /// (17) cstime: kernel time of waited-for children, in clock ticks
    pub cstime: u64,
    /// (20) num_threads
    pub num_threads: u64,
    /// (22) starttime, in clock ticks since boot
    pub starttime: u64,
    /// (52) exit_code, in `waitpid` encoding; absent before Linux 3.5
    pub exit_code: Option<i32>,
}

impl ProcStat {
    /// Parses the contents of a stat file read for `pid`.
    ///
    /// `comm` may itself contain spaces and parentheses, so it is taken to
    /// span from the first `(` to the last `)`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] when a field is missing or unparsable.
    pub fn parse(pid: ProcId, s: &str) -> Result<Self, Error> {
        let malformed = |reason| Error::Malformed { pid, reason };

        let open = s.find('(').ok_or_else(|| malformed("missing `(`"))?;
        let close = s.rfind(')').ok_or_else(|| malformed("missing `)`"))?;
        if close < open {
            return Err(malformed("unbalanced comm"));
        }

        let stat_pid = s[..open]
            .trim()
            .parse::<ProcId>()
            .map_err(|_| malformed("bad pid"))?;
        if stat_pid != pid {
            return Err(malformed("pid mismatch"));
        }
        let comm = s[open + 1..close].to_owned();

        // fields[0] is field (3)
        let fields = s[close + 1..].split_ascii_whitespace().collect::<Vec<_>>();
        let field = |n: usize| {
            fields
                .get(n - 3)
                .copied()
                .ok_or_else(|| malformed("too few fields"))
        };
        let number = |n: usize| -> Result<u64, Error> {
            field(n)?.parse().map_err(|_| malformed("bad numeric field"))
        };
        let id = |n: usize| -> Result<u32, Error> {
            // pgrp and session are -1 in odd cases; fold those to 0
            let v = field(n)?
                .parse::<i64>()
                .map_err(|_| malformed("bad id field"))?;
            Ok(u32::try_from(v).unwrap_or(0))
        };

        let exit_code = match fields.get(52 - 3) {
            Some(f) => Some(f.parse().map_err(|_| malformed("bad exit_code field"))?),
            None => None,
        };

        let mut state_chars = field(3)?.chars();
        let state = match (state_chars.next(), state_chars.next()) {
            (Some(c), None) => ProcState::from_code(c).ok_or_else(|| malformed("unknown state"))?,
            _ => return Err(malformed("bad state field")),
        };

        Ok(Self {
            pid,
            comm,
            state,
            ppid: id(4)?,
            pgrp: id(5)?,
            session: id(6)?,
            utime: number(14)?,
            stime: number(15)?,
            cutime: number(16)?,
            cstime: number(17)?,
            num_threads: number(20)?,
            starttime: number(22)?,
            exit_code,
        })
    }

    /// CPU time of the process and its waited-for children, in user and
    /// kernel mode, in clock ticks.
    #[must_use]
    pub fn cpu_time(&self) -> u64 {
        self.utime + self.stime + self.cutime + self.cstime
    }

    /// Status passed to `exit` by a terminated process.
    ///
    /// `None` while the process runs (the kernel reports 0 then, which is
    /// indistinguishable from `exit(0)`, so only zombie and dead entries are
    /// decoded), when it was killed by a signal, or when the kernel does not
    /// report the field.
    #[must_use]
    pub fn exit_status(&self) -> Option<i32> {
        if self.state.is_alive() {
            return None;
        }
        let code = self.exit_code?;
        // WIFEXITED / WEXITSTATUS
        (code & 0x7f == 0).then_some((code >> 8) & 0xff)
    }

    /// Returns `self` unless the process is a zombie.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Zombie`] for terminated, uncollected processes.
    pub fn ensure_alive(&self) -> Result<&Self, Error> {
        if self.state.is_zombie() {
            return Err(Error::Zombie {
                pid: self.pid,
                ppid: self.ppid,
            });
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(n: i32) -> ProcId {
        ProcId::from_raw(n).unwrap()
    }

    const SLEEPING: &str = "4321 (zombie) S 4300 4321 4300 34816 4321 4194560 120 0 0 0 \
                            3 7 2 1 20 0 1 0 987654 2502656 230 18446744073709551615 \
                            1 1 0 0 0 0 0 0 0 0 0 0 \
                            17 3 0 0 0 0 0 0 0 0 0 0 0 0 0\n";

    #[test]
    fn parse_typical_line() {
        let st = ProcStat::parse(pid(4321), SLEEPING).unwrap();
        assert_eq!(st.pid, pid(4321));
        assert_eq!(st.comm, "zombie");
        assert_eq!(st.state, ProcState::Sleeping);
        assert_eq!(st.ppid, 4300);
        assert_eq!(st.pgrp, 4321);
        assert_eq!(st.session, 4300);
        assert_eq!(st.utime, 3);
        assert_eq!(st.stime, 7);
        assert_eq!(st.cutime, 2);
        assert_eq!(st.cstime, 1);
        assert_eq!(st.cpu_time(), 13);
        assert_eq!(st.num_threads, 1);
        assert_eq!(st.starttime, 987_654);
        assert_eq!(st.exit_code, Some(0));
        assert_eq!(st.exit_status(), None);
        assert!(st.ensure_alive().is_ok());
    }

    fn zombie_with_exit_code(code: i32) -> ProcStat {
        let line = SLEEPING
            .trim_end()
            .replacen(" S ", " Z ", 1)
            .rsplit_once(' ')
            .map(|(head, _)| format!("{head} {code}"))
            .unwrap();
        ProcStat::parse(pid(4321), &line).unwrap()
    }

    #[test]
    fn exit_status_of_zombie() {
        assert_eq!(zombie_with_exit_code(0).exit_status(), Some(0));
        assert_eq!(zombie_with_exit_code(3 << 8).exit_status(), Some(3));
        // killed by SIGKILL: no exit status
        assert_eq!(zombie_with_exit_code(9).exit_status(), None);
    }

    #[test]
    fn parse_comm_with_spaces_and_parens() {
        let line = "77 (a (b) c) Z 76 76 76 0 -1 4227084 0 0 0 0 0 0 0 0 20 0 1 0 5 0 0";
        let st = ProcStat::parse(pid(77), line).unwrap();
        assert_eq!(st.comm, "a (b) c");
        assert_eq!(st.state, ProcState::Zombie);
        assert_eq!(st.ppid, 76);
        // pre-3.5 layout has no exit_code field
        assert_eq!(st.exit_code, None);
        assert_eq!(st.exit_status(), None);
        let err = st.ensure_alive().unwrap_err();
        assert!(matches!(err, Error::Zombie { ppid: 76, .. }));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(
            ProcStat::parse(pid(1), "1 init S 0"),
            Err(Error::Malformed { .. })
        ));
        assert!(matches!(
            ProcStat::parse(pid(1), "1 (init) S 0 1 1"),
            Err(Error::Malformed {
                reason: "too few fields",
                ..
            })
        ));
        assert!(matches!(
            ProcStat::parse(pid(2), SLEEPING),
            Err(Error::Malformed {
                reason: "pid mismatch",
                ..
            })
        ));
        let bad_state = SLEEPING.replacen(" S ", " ? ", 1);
        assert!(matches!(
            ProcStat::parse(pid(4321), &bad_state),
            Err(Error::Malformed {
                reason: "unknown state",
                ..
            })
        ));
    }
}
