//! Per-test setup for runs of the demonstration.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::atomic::{AtomicUsize, Ordering},
};

use anyhow::{Context as _, ensure};

use crate::Demo;

/// A global atomic counter for assigning unique runner IDs.
static RUNNER_ID: AtomicUsize = AtomicUsize::new(0);

/// Owns the workspace directory of one test and launches the binary in it.
pub struct Runner {
    id: usize,
    program: PathBuf,
    workspace_dir: PathBuf,
}

impl Runner {
    /// Prepares `target/zombie/<pkg>/<module path>/<fn>` as the workspace.
    ///
    /// # Errors
    ///
    /// Returns an error if the program is missing or the workspace cannot be
    /// created.
    pub async fn new(
        pkg_name: &str,
        module_path: &str,
        fn_name: &str,
        program: &Path,
    ) -> Result<Self, anyhow::Error> {
        let id = RUNNER_ID.fetch_add(1, Ordering::Relaxed);
        let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
        let project_root = manifest_dir
            .ancestors()
            .nth(3)
            .context("harness is not inside the workspace")?;

        let mut workspace_dir = project_root.join("target").join("zombie").join(pkg_name);
        for component in module_path.split("::") {
            workspace_dir.push(component);
        }
        workspace_dir.push(fn_name);

        ensure!(
            program.is_file(),
            "program not found: {}",
            program.display()
        );

        tokio::task::spawn_blocking({
            let workspace_dir = workspace_dir.clone();
            move || fs::create_dir_all(workspace_dir)
        })
        .await?
        .context("create workspace failed")?;

        Ok(Self {
            id,
            program: program.to_owned(),
            workspace_dir,
        })
    }

    /// Starts the demonstration.
    ///
    /// # Errors
    ///
    /// Returns an error if the binary cannot be spawned.
    pub fn launch(self) -> Result<Demo, anyhow::Error> {
        log::debug!(
            "runner {}: launching {} in {}",
            self.id,
            self.program.display(),
            self.workspace_dir.display()
        );
        Demo::spawn(self.id, &self.program, &self.workspace_dir)
    }
}
