use std::{path::Path, process::ExitStatus};

use anyhow::Context as _;
use tokio::process::Command;
use zombie_types::process::ProcId;

use crate::logged_command::LoggedCommand;

/// A running instance of the demonstration binary.
pub struct Demo {
    command: LoggedCommand,
    pid: ProcId,
}

impl Demo {
    pub const CHILD_OVER_MSG: &'static str = "son is over!";

    pub(crate) fn spawn(
        runner_id: usize,
        program: &Path,
        workspace_dir: &Path,
    ) -> Result<Self, anyhow::Error> {
        let mut command = Command::new(program);
        command.current_dir(workspace_dir);
        // default log filter only
        command.env_remove("RUST_LOG");

        let command = LoggedCommand::new(command, runner_id, "zombie", workspace_dir)
            .context("spawn zombie failed")?;
        let pid = command.id().context("zombie exited before it could be observed")?;

        Ok(Self { command, pid })
    }

    /// Id of the parent process, the one the harness spawned.
    #[must_use]
    pub fn pid(&self) -> ProcId {
        self.pid
    }

    #[must_use]
    pub fn stdout(&self) -> String {
        self.command.stdout()
    }

    #[must_use]
    pub fn stdout_pos(&self) -> usize {
        self.command.stdout_pos()
    }

    /// Waits until stdout from `start` on satisfies `cond`.
    ///
    /// # Errors
    ///
    /// Returns an error if stdout closes first.
    pub async fn wait_output<F>(&self, start: usize, cond: F) -> Result<(), anyhow::Error>
    where
        F: FnMut(&str) -> bool,
    {
        self.command.wait_output(start, cond).await
    }

    /// Kills the parent, which would otherwise idle forever, and collects
    /// its status and output.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent cannot be killed or awaited.
    pub async fn terminate(mut self) -> Result<(ExitStatus, String), anyhow::Error> {
        self.command.kill().await?;
        self.command.wait_terminate().await
    }
}
