//! CPU usage sampling.
//!
//! Usage is a ratio of two counter deltas, so every figure needs two reads
//! some time apart. [`CpuSampler`] keeps the previous read per process.

use std::collections::HashMap;

use zombie_types::process::ProcId;

use crate::{Error, Procfs};

/// Aggregate counters of the `cpu` line of `/proc/stat`, in clock ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuTimes {
    /// user + nice + system + idle + iowait + irq + softirq + steal
    pub total: u64,
    /// user + nice + system
    pub work: u64,
}

impl CpuTimes {
    /// Parses the contents of `/proc/stat`.
    ///
    /// guest and guest_nice are not added: the kernel already counts them in
    /// user and nice.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedSystemStat`] if the `cpu` line is missing or
    /// has fewer than eight numeric columns.
    pub fn parse(s: &str) -> Result<Self, Error> {
        let malformed = |reason| Error::MalformedSystemStat { reason };

        let line = s
            .lines()
            .find(|l| l.split_ascii_whitespace().next() == Some("cpu"))
            .ok_or_else(|| malformed("missing cpu line"))?;
        let cols = line
            .split_ascii_whitespace()
            .skip(1)
            .take(8)
            .map(str::parse::<u64>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| malformed("bad cpu column"))?;
        let &[user, nice, system, idle, iowait, irq, softirq, steal] = cols.as_slice() else {
            return Err(malformed("too few cpu columns"));
        };

        Ok(Self {
            total: user + nice + system + idle + iowait + irq + softirq + steal,
            work: user + nice + system,
        })
    }

    /// Share of non-idle time between `prev` and `self`, in percent.
    #[must_use]
    pub fn busy_percent_since(&self, prev: &Self) -> Option<f64> {
        percent(self.work, prev.work, self.total, prev.total)
    }
}

fn percent(cur: u64, prev: u64, cur_total: u64, prev_total: u64) -> Option<f64> {
    let total = cur_total.checked_sub(prev_total).filter(|d| *d > 0)?;
    let used = cur.saturating_sub(prev);
    Some(used as f64 * 100.0 / total as f64)
}

/// Per-process CPU usage, as a share of the whole machine's time.
#[derive(Debug, Default)]
pub struct CpuSampler {
    prev: HashMap<ProcId, (u64, CpuTimes)>,
}

impl CpuSampler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the current counters of `pid` and returns its usage since
    /// the previous call for the same process.
    ///
    /// The first call for a process only records and returns `None`. So does
    /// a call made before the system counters have moved.
    ///
    /// # Errors
    ///
    /// Returns an error if `/proc/stat` or `/proc/[pid]/stat` cannot be read.
    pub fn sample(&mut self, procfs: &Procfs, pid: ProcId) -> Result<Option<f64>, Error> {
        let proc_time = procfs.stat(pid)?.cpu_time();
        let times = procfs.cpu_times()?;
        let usage = self.prev.insert(pid, (proc_time, times)).and_then(
            |(prev_proc_time, prev_times)| {
                percent(proc_time, prev_proc_time, times.total, prev_times.total)
            },
        );
        Ok(usage)
    }

    /// Drops the history of `pid`, e.g. once it has been reaped.
    pub fn forget(&mut self, pid: ProcId) {
        self.prev.remove(&pid);
    }
}
