//! Launching and supervising the worker process.

mod launcher;
mod process;

pub use launcher::{AdlLauncher, WorkerLauncher};
pub use process::{WorkerExit, WorkerProcess};

#[cfg(test)]
pub(crate) use launcher::build_adl_command;
