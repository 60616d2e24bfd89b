//! Driving a demonstration run and watching the process table.

use std::process::ExitStatus;

use anyhow::{Context as _, bail};
use tokio::time::{self, Duration, Instant};
use zombie_procfs::{Error as ProcfsError, ProcStat, Procfs};
use zombie_types::process::ProcId;

use crate::{Demo, Runner};

/// How often [`wait_state`] rereads procfs.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Waits until the child has printed its final line.
///
/// # Errors
///
/// Returns an error if stdout closes first.
pub async fn wait_child_over(demo: &Demo, output_start: usize) -> Result<(), anyhow::Error> {
    demo.wait_output(output_start, |s| s.contains(Demo::CHILD_OVER_MSG))
        .await
}

/// Polls `/proc/[pid]/stat` until `pred` accepts it.
///
/// # Errors
///
/// Returns an error if the process vanishes, procfs cannot be read, or
/// `timeout` elapses first.
pub async fn wait_state<F>(
    procfs: &Procfs,
    pid: ProcId,
    timeout: Duration,
    mut pred: F,
) -> Result<ProcStat, anyhow::Error>
where
    F: FnMut(&ProcStat) -> bool,
{
    let deadline = Instant::now() + timeout;
    loop {
        let stat = match procfs.stat(pid) {
            Ok(stat) => stat,
            Err(e @ ProcfsError::NoSuchProcess { .. }) => bail!(e),
            Err(e) => return Err(e).context("read procfs failed"),
        };
        if pred(&stat) {
            return Ok(stat);
        }
        if Instant::now() >= deadline {
            bail!(
                "pid {pid} still in state {} after {timeout:?}",
                stat.state
            );
        }
        time::sleep(POLL_INTERVAL).await;
    }
}

/// Runs one demonstration under `timeout`.
///
/// The binary is launched, `f` performs the checks while it is running, then
/// the parent is killed and its exit status and full stdout are returned
/// together with `f`'s result.
///
/// # Errors
///
/// Returns an error if the run times out or any step fails.
pub async fn run_test<F, T>(
    r: Runner,
    timeout: Duration,
    f: F,
) -> Result<(ExitStatus, String, T), anyhow::Error>
where
    F: AsyncFnOnce(&Demo) -> Result<T, anyhow::Error>,
{
    time::timeout(timeout, async {
        let demo = r.launch()?;
        let ret = f(&demo).await?;
        let (exit_status, stdout) = demo.terminate().await?;
        Ok((exit_status, stdout, ret))
    })
    .await
    .context("test timeout")?
}

#[cfg(test)]
mod tests {
    use std::process;

    use super::*;

    fn me() -> ProcId {
        ProcId::from_raw(i32::try_from(process::id()).unwrap()).unwrap()
    }

    #[cfg_attr(miri, ignore)]
    #[tokio::test]
    async fn wait_state_accepts_immediately() -> Result<(), anyhow::Error> {
        let stat = wait_state(&Procfs::default(), me(), Duration::from_secs(1), |st| {
            st.state.is_alive()
        })
        .await?;
        assert_eq!(stat.pid, me());
        Ok(())
    }

    #[cfg_attr(miri, ignore)]
    #[tokio::test]
    async fn wait_state_times_out() {
        let res = wait_state(
            &Procfs::default(),
            me(),
            Duration::from_millis(100),
            |st| st.state.is_zombie(),
        )
        .await;
        assert!(res.is_err());
    }
}
