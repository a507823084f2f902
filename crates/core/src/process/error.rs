//! Error types for the process layer.

use thiserror::Error;

use super::types::excerpt;

/// Maximum characters of captured output quoted in an error message.
pub const OUTPUT_EXCERPT_LIMIT: usize = 200;

/// Failures to launch a process at all.
///
/// A process that starts and then fails is not an error at this level; see
/// [`ProcessResult`](super::ProcessResult).
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The program could not be found.
    #[error("command not found: {program}")]
    CommandNotFound { program: String },

    /// The program exists but could not be started.
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl ProcessError {
    pub(crate) fn from_spawn(program: String, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::CommandNotFound { program }
        } else {
            Self::Spawn {
                program,
                source: err,
            }
        }
    }
}

/// A process ran but did not succeed.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// The watchdog terminated the process.
    #[error("command timed out after {timeout_secs} seconds: {command}\nstdout: {stdout}\nstderr: {stderr}")]
    Timeout {
        command: String,
        timeout_secs: f64,
        stdout: String,
        stderr: String,
    },

    /// The process exited with a non-zero status.
    #[error("command failed with exit status {code}: {command}\nstdout: {stdout}\nstderr: {stderr}")]
    NonZeroExit {
        command: String,
        code: i32,
        stdout: String,
        stderr: String,
    },

    /// The process could not be waited on, so its outcome is unknown.
    #[error("no exit status could be obtained for command: {command}\nstdout: {stdout}\nstderr: {stderr}")]
    NoExitStatus {
        command: String,
        stdout: String,
        stderr: String,
    },

    #[error(transparent)]
    Launch(#[from] ProcessError),
}

impl ExecutionError {
    pub(crate) fn timeout(command: String, timeout_secs: f64, stdout: &[u8], stderr: &[u8]) -> Self {
        Self::Timeout {
            command,
            timeout_secs,
            stdout: excerpt(stdout, OUTPUT_EXCERPT_LIMIT),
            stderr: excerpt(stderr, OUTPUT_EXCERPT_LIMIT),
        }
    }

    pub(crate) fn non_zero(command: String, code: i32, stdout: &[u8], stderr: &[u8]) -> Self {
        Self::NonZeroExit {
            command,
            code,
            stdout: excerpt(stdout, OUTPUT_EXCERPT_LIMIT),
            stderr: excerpt(stderr, OUTPUT_EXCERPT_LIMIT),
        }
    }

    pub(crate) fn no_status(command: String, stdout: &[u8], stderr: &[u8]) -> Self {
        Self::NoExitStatus {
            command,
            stdout: excerpt(stdout, OUTPUT_EXCERPT_LIMIT),
            stderr: excerpt(stderr, OUTPUT_EXCERPT_LIMIT),
        }
    }

    /// Whether the program itself was missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Launch(ProcessError::CommandNotFound { .. }))
    }
}
