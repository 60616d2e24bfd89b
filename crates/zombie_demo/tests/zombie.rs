#![cfg(all(test, target_os = "linux"))]

use std::{os::unix::process::ExitStatusExt as _, time::Duration};

use anyhow::Context as _;
use regex::Regex;
use zombie_procfs::Procfs;
use zombie_test_utils::{Demo, monitor, runner};
use zombie_types::process::{ProcId, ProcState};

const TIMEOUT: Duration = Duration::from_secs(30);
const STATE_TIMEOUT: Duration = Duration::from_secs(5);

fn find_pid(stdout: &str, label: &str) -> Result<ProcId, anyhow::Error> {
    let re = Regex::new(&format!(r"(?m)^{label} pid is (?P<pid>\d+)$"))?;
    let caps = re
        .captures(stdout)
        .with_context(|| format!("no `{label} pid is` line"))?;
    Ok(caps["pid"].parse()?)
}

async fn wait_pids(demo: &Demo) -> Result<(ProcId, ProcId), anyhow::Error> {
    demo.wait_output(0, |s| s.contains("son pid is") && s.contains("parent pid is"))
        .await?;
    let stdout = demo.stdout();
    Ok((find_pid(&stdout, "parent")?, find_pid(&stdout, "son")?))
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn child_is_left_as_zombie() -> Result<(), anyhow::Error> {
    let r = runner!("child_is_left_as_zombie").await?;
    let procfs = Procfs::default();

    let (exit_status, _stdout, ()) = monitor::run_test(r, TIMEOUT, async |demo| {
        let (parent, child) = wait_pids(demo).await?;
        assert_eq!(parent, demo.pid());
        assert_ne!(parent, child);

        monitor::wait_child_over(demo, 0).await?;

        let zombie = monitor::wait_state(&procfs, child, STATE_TIMEOUT, |st| {
            st.state.is_zombie()
        })
        .await?;
        assert_eq!(zombie.ppid, u32::from(parent));
        assert!(zombie.ensure_alive().is_err());
        // the child left through exit(0), not a signal
        assert_eq!(zombie.exit_code, Some(0));
        assert_eq!(zombie.exit_status(), Some(0));
        // a zombie has no command line left
        assert_eq!(procfs.cmdline(child)?, "");
        assert_eq!(procfs.name(child)?, "zombie");

        let parent_stat = procfs.stat(parent)?;
        assert!(matches!(
            parent_stat.state,
            ProcState::Sleeping | ProcState::Running
        ));
        parent_stat.ensure_alive()?;

        // the zombie is still there a while later: nobody collects it
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(procfs.stat(child)?.state.is_zombie());
        Ok(())
    })
    .await?;

    // the parent only ever stops when killed
    assert_eq!(exit_status.signal(), Some(9));
    Ok(())
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn console_protocol() -> Result<(), anyhow::Error> {
    let r = runner!("console_protocol").await?;
    let (_exit_status, stdout, ()) = monitor::run_test(r, TIMEOUT, async |demo| {
        monitor::wait_child_over(demo, 0).await?;
        Ok(())
    })
    .await?;

    let lines = stdout.lines().collect::<Vec<_>>();
    assert_eq!(lines.len(), 8, "unexpected output: {lines:?}");
    assert_eq!(
        lines.iter().filter(|l| l.starts_with("parent pid is ")).count(),
        1
    );

    // the child's own lines keep their order whatever the parent interleaves
    let child_lines = lines
        .iter()
        .copied()
        .filter(|l| !l.starts_with("parent pid is "))
        .collect::<Vec<_>>();
    assert!(child_lines[0].starts_with("son pid is "));
    assert_eq!(
        child_lines[1..],
        [
            "son---i=0",
            "son---i=1",
            "son---i=2",
            "son---i=3",
            "son---i=4",
            "son is over!",
        ]
    );

    let parent = find_pid(&stdout, "parent")?;
    let child = find_pid(&stdout, "son")?;
    assert_ne!(parent, child);
    Ok(())
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn parent_is_silent_while_idle() -> Result<(), anyhow::Error> {
    let r = runner!("parent_is_silent_while_idle").await?;
    let (_exit_status, stdout, before) = monitor::run_test(r, TIMEOUT, async |demo| {
        monitor::wait_child_over(demo, 0).await?;
        let before = demo.stdout_pos();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(demo.stdout_pos(), before);
        Ok(before)
    })
    .await?;

    assert_eq!(stdout.len(), before);
    assert_eq!(stdout.matches("parent pid is ").count(), 1);
    Ok(())
}
