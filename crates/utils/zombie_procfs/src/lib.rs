//! Read-only process-table inspection through Linux procfs.
//!
//! This is the outside observer of the demonstration: it reads what the host
//! reports about a process without touching the process itself.

use std::{
    fs,
    path::{Path, PathBuf},
};

use zombie_types::process::ProcId;

pub use self::{
    cpu::{CpuSampler, CpuTimes},
    error::Error,
    stat::ProcStat,
};

mod cpu;
mod error;
mod stat;

/// Default procfs mount point.
pub const PROC_ROOT: &str = "/proc";

/// How [`Procfs::search`] compares names against the keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    /// The name contains the keyword.
    #[default]
    Contain,
    /// The name equals the keyword.
    Match,
}

impl SearchMode {
    fn matches(self, name: &str, keyword: &str) -> bool {
        match self {
            Self::Contain => name.contains(keyword),
            Self::Match => name == keyword,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Procfs {
    root: PathBuf,
}

impl Default for Procfs {
    fn default() -> Self {
        Self::new(PROC_ROOT)
    }
}

impl Procfs {
    #[must_use]
    pub fn new<P>(root: P) -> Self
    where
        P: Into<PathBuf>,
    {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry(&self, pid: ProcId, name: &str) -> PathBuf {
        self.root.join(pid.to_string()).join(name)
    }

    fn read(&self, pid: ProcId, name: &str) -> Result<Vec<u8>, Error> {
        fs::read(self.entry(pid, name)).map_err(|e| Error::from_io(pid, e))
    }

    /// Lists every process id present, in ascending order.
    ///
    /// # Errors
    ///
    /// Returns an error if the root directory cannot be read.
    pub fn all_pids(&self) -> Result<Vec<ProcId>, Error> {
        let mut pids = vec![];
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let Some(pid) = entry
                .file_name()
                .to_str()
                .and_then(|s| s.parse::<ProcId>().ok())
            else {
                continue;
            };
            pids.push(pid);
        }
        pids.sort_unstable();
        Ok(pids)
    }

    /// Reads and parses `/proc/[pid]/stat`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSuchProcess`] if the process has been reaped.
    pub fn stat(&self, pid: ProcId) -> Result<ProcStat, Error> {
        let bytes = self.read(pid, "stat")?;
        let s = String::from_utf8_lossy(&bytes);
        ProcStat::parse(pid, &s)
    }

    /// Reads the system-wide CPU counters from `/proc/stat`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn cpu_times(&self) -> Result<CpuTimes, Error> {
        let s = fs::read_to_string(self.root.join("stat"))?;
        CpuTimes::parse(&s)
    }

    /// Reads the command line as space-separated arguments.
    ///
    /// Zombies and kernel threads have an empty command line.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSuchProcess`] if the process has been reaped.
    pub fn cmdline(&self, pid: ProcId) -> Result<String, Error> {
        let bytes = self.read(pid, "cmdline")?;
        let args = bytes
            .split(|b| *b == b'\0')
            .filter(|arg| !arg.is_empty())
            .map(String::from_utf8_lossy)
            .collect::<Vec<_>>();
        Ok(args.join(" "))
    }

    /// Returns the display name of a process.
    ///
    /// This is the command line, like `ps -ef`, falling back to `comm` when the
    /// command line is empty.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSuchProcess`] if the process has been reaped.
    pub fn name(&self, pid: ProcId) -> Result<String, Error> {
        let cmdline = self.cmdline(pid)?;
        if !cmdline.trim().is_empty() {
            return Ok(cmdline);
        }
        Ok(self.stat(pid)?.comm)
    }

    /// Finds processes whose name matches `keyword`.
    ///
    /// Processes that exit during the scan are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the root cannot be listed or an entry cannot be
    /// read for a reason other than the process having exited.
    pub fn search(&self, keyword: &str, mode: SearchMode) -> Result<Vec<(ProcId, String)>, Error> {
        let mut found = vec![];
        for pid in self.all_pids()? {
            let name = match self.name(pid) {
                Ok(name) => name,
                Err(e) if e.is_gone() => {
                    log::debug!("pid {pid} exited during scan");
                    continue;
                }
                Err(Error::AccessDenied { .. }) => {
                    log::debug!("pid {pid} not readable, skipped");
                    continue;
                }
                Err(e) => return Err(e),
            };
            if mode.matches(&name, keyword) {
                found.push((pid, name));
            }
        }
        Ok(found)
    }
}
