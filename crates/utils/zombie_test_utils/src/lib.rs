//! Host-side harness for running the demonstration under test.
//!
//! The demo's parent never exits on its own, so every run is bounded by a
//! timeout and ends with the harness killing the parent.

pub use self::{demo::Demo, runner::Runner};

mod demo;
pub mod logged_command;
pub mod monitor;
mod runner;

/// Creates a [`Runner`] for the `zombie` binary of the calling package.
///
/// Only usable from integration tests of the package that builds the binary,
/// since it relies on `CARGO_BIN_EXE_zombie`.
#[macro_export]
macro_rules! runner {
    ($name:expr) => {
        $crate::Runner::new(
            env!("CARGO_PKG_NAME"),
            module_path!(),
            $name,
            ::std::path::Path::new(env!("CARGO_BIN_EXE_zombie")),
        )
    };
}
