use std::{io, process::ExitCode};

use zombie_demo::process;

fn main() -> ExitCode {
    env_logger::init();

    let Err(e) = zombie_demo::run(process::fork, &mut io::stdout());
    // quiet by default: only visible with RUST_LOG=debug
    log::debug!("{e}");
    ExitCode::SUCCESS
}
