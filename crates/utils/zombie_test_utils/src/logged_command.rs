//! Subprocess wrapper that records everything the child writes.
//!
//! Output is echoed to the test's own stdout/stderr and appended to a log
//! file in the test workspace, so a failed run can be inspected afterwards.

use std::{
    fs::File,
    io::{self, Write as _},
    path::Path,
    process::{self, ExitStatus, Stdio},
    sync::{Arc, Mutex},
};

use anyhow::Context as _;
use tokio::{
    io::AsyncReadExt as _,
    process::{Child, ChildStderr, ChildStdout, Command},
    sync::watch,
    task::JoinHandle,
};
use zombie_types::process::ProcId;

pub struct LoggedCommand {
    proc: Child,
    stdout_handle: JoinHandle<Result<(), anyhow::Error>>,
    stderr_handle: JoinHandle<Result<(), anyhow::Error>>,
    /// Everything written to stdout so far.
    stdout_content: Arc<Mutex<String>>,
    /// Length of `stdout_content`, bumped on every chunk.
    stdout_rx: watch::Receiver<usize>,
}

impl LoggedCommand {
    /// Spawns `command` with stdin closed and stdout/stderr captured.
    ///
    /// The process is killed if the returned value is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the log file cannot be created or the process
    /// cannot be spawned.
    pub fn new(
        mut command: Command,
        runner_id: usize,
        command_name: &str,
        workspace_dir: &Path,
    ) -> Result<Self, anyhow::Error> {
        let log_path = workspace_dir.join(format!(
            "zombie.{}.{}.{}.out",
            process::id(),
            runner_id,
            command_name
        ));
        let log = Arc::new(Mutex::new(
            File::create(&log_path).context("open logfile failed")?,
        ));

        let mut proc = command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .context("spawn command failed")?;

        let stdout = proc.stdout.take().context("stdout not captured")?;
        let stderr = proc.stderr.take().context("stderr not captured")?;

        let (stdout_tx, stdout_rx) = watch::channel(0);
        let stdout_content = Arc::new(Mutex::new(String::new()));

        let stdout_handle = tokio::spawn(handle_stdout(
            Arc::clone(&log),
            stdout,
            Arc::clone(&stdout_content),
            stdout_tx,
        ));
        let stderr_handle = tokio::spawn(handle_stderr(log, stderr));

        Ok(Self {
            proc,
            stdout_handle,
            stderr_handle,
            stdout_content,
            stdout_rx,
        })
    }

    /// Returns the spawned process's id, or `None` once it has been reaped.
    #[must_use]
    pub fn id(&self) -> Option<ProcId> {
        self.proc
            .id()
            .and_then(|id| i32::try_from(id).ok())
            .and_then(ProcId::from_raw)
    }

    /// Returns a copy of everything written to stdout so far.
    #[must_use]
    pub fn stdout(&self) -> String {
        self.stdout_content.lock().unwrap().clone()
    }

    #[must_use]
    pub fn stdout_pos(&self) -> usize {
        *self.stdout_rx.borrow()
    }

    /// Waits until the stdout content from `start` on satisfies `cond`.
    ///
    /// # Errors
    ///
    /// Returns an error if stdout closes before `cond` holds.
    pub async fn wait_output<F>(&self, start: usize, mut cond: F) -> Result<(), anyhow::Error>
    where
        F: FnMut(&str) -> bool,
    {
        let mut stdout_watch = self.stdout_rx.clone();
        loop {
            let _len = *stdout_watch.borrow_and_update();
            if cond(&self.stdout_content.lock().unwrap()[start..]) {
                break;
            }
            stdout_watch
                .changed()
                .await
                .context("stdout closed before expected output")?;
        }
        Ok(())
    }

    /// Sends SIGKILL to the process and reaps it.
    ///
    /// # Errors
    ///
    /// Returns an error if the signal cannot be sent.
    pub async fn kill(&mut self) -> Result<(), anyhow::Error> {
        self.proc.kill().await.context("kill command failed")?;
        Ok(())
    }

    /// Waits for the process and its output streams to finish.
    ///
    /// # Errors
    ///
    /// Returns an error if an output task failed or the process cannot be
    /// awaited.
    pub async fn wait_terminate(mut self) -> Result<(ExitStatus, String), anyhow::Error> {
        let status = self.proc.wait().await?;
        self.stdout_handle
            .await
            .context("stdout handle join failed")??;
        self.stderr_handle
            .await
            .context("stderr handle join failed")??;
        let stdout = self.stdout_content.lock().unwrap().clone();
        Ok((status, stdout))
    }
}

const READ_CHUNK: usize = 4096;

/// Appends `bytes` to the log file and echoes them to `term`.
fn tee<W>(log: &Mutex<File>, term: &mut W, bytes: &[u8]) -> Result<(), anyhow::Error>
where
    W: io::Write,
{
    term.write_all(bytes)?;
    term.flush()?;
    let mut log = log.lock().unwrap();
    log.write_all(bytes)?;
    log.flush()?;
    Ok(())
}

/// Removes and returns the longest decodable prefix of `pending`.
///
/// An incomplete sequence at the end stays in `pending` until more bytes
/// arrive, unless `at_eof` is set. Invalid bytes become U+FFFD.
fn drain_utf8(pending: &mut Vec<u8>, at_eof: bool) -> String {
    let mut text = String::new();
    let mut rest = pending.as_slice();
    while !rest.is_empty() {
        let e = match std::str::from_utf8(rest) {
            Ok(s) => {
                text.push_str(s);
                rest = &[];
                break;
            }
            Err(e) => e,
        };
        let (valid, invalid) = rest.split_at(e.valid_up_to());
        text.push_str(std::str::from_utf8(valid).unwrap_or_default());
        match e.error_len() {
            Some(len) => rest = &invalid[len..],
            None if !at_eof => {
                rest = invalid;
                break;
            }
            None => rest = &[],
        }
        text.push(char::REPLACEMENT_CHARACTER);
    }
    let consumed = pending.len() - rest.len();
    pending.drain(..consumed);
    text
}

async fn handle_stdout(
    log: Arc<Mutex<File>>,
    mut stdout: ChildStdout,
    output: Arc<Mutex<String>>,
    output_tx: watch::Sender<usize>,
) -> Result<(), anyhow::Error> {
    let mut buf = vec![0; READ_CHUNK];
    let mut pending = vec![];
    loop {
        let n = stdout.read(&mut buf).await.context("read stdout failed")?;
        pending.extend_from_slice(&buf[..n]);

        let text = drain_utf8(&mut pending, n == 0);
        if !text.is_empty() {
            tee(&log, &mut io::stdout().lock(), text.as_bytes())?;
            let mut output = output.lock().unwrap();
            output.push_str(&text);
            // receivers may all be gone once the test has what it wants
            let _ = output_tx.send(output.len());
        }

        if n == 0 {
            break;
        }
    }
    Ok(())
}

async fn handle_stderr(
    log: Arc<Mutex<File>>,
    mut stderr: ChildStderr,
) -> Result<(), anyhow::Error> {
    let mut buf = vec![0; READ_CHUNK];
    loop {
        let n = stderr.read(&mut buf).await.context("read stderr failed")?;
        if n == 0 {
            break;
        }
        tee(&log, &mut io::stderr().lock(), &buf[..n])?;
    }
    Ok(())
}
