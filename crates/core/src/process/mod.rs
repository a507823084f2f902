//! External process execution.
//!
//! Two layers:
//!
//! - [`ProcessRunner`] spawns a program with piped stdio, drains stdout and
//!   stderr on background tasks, and enforces a timeout by sending a
//!   termination signal followed by a kill after a grace period. It reports
//!   whatever happened as a [`ProcessResult`].
//! - [`CommandExecutor`] logs the command and turns timeouts, non-zero exits
//!   and unobservable exits into [`ExecutionError`]s.
//!
//! # Example
//!
//! ```ignore
//! use vecconv_core::process::{CommandExecutor, CommandLine, CommandSpec};
//!
//! let executor = CommandExecutor::default();
//! let spec = CommandSpec::new(CommandLine::new("gs").arg("--version"))
//!     .timeout(Duration::from_secs(10));
//! let record = executor.execute(&spec).await?;
//! println!("{}", record.result.stdout_text());
//! ```

mod error;
mod executor;
mod runner;
mod types;

pub use error::{ExecutionError, ProcessError, OUTPUT_EXCERPT_LIMIT};
pub use executor::{CommandExecutor, CommandSpec, RunRecord};
pub use runner::{ProcessRunner, DEFAULT_READER_JOIN_TIMEOUT};
pub use types::{
    excerpt, CommandLine, ExitStatus, ProcessResult, RunOptions, TerminationSignal,
    DEFAULT_KILL_AFTER,
};
