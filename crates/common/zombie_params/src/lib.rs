#![no_std]

use core::time::Duration;

/// Number of counter steps the child prints before it exits.
pub const CHILD_STEPS: u32 = 5;

/// Pause after each child step.
pub const CHILD_PAUSE: Duration = Duration::from_secs(1);

/// Length of one parent idle pause.
pub const PARENT_PAUSE: Duration = Duration::from_secs(100);

/// Exit status reported by the child.
pub const CHILD_EXIT_STATUS: i32 = 0;
