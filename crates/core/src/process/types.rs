//! Types shared by the process runner and command executor.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::platform::Platform;

/// Default grace period between the termination signal and a forced kill.
pub const DEFAULT_KILL_AFTER: Duration = Duration::from_secs(5);

/// What to launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandLine {
    /// Program executed directly with an argument vector. No shell is
    /// involved, so arguments may safely contain metacharacters.
    Args { program: PathBuf, args: Vec<String> },
    /// A pre-quoted command string handed to the platform shell
    /// (`sh -c` or `cmd /C`).
    Shell(String),
}

impl CommandLine {
    /// Starts an argument-vector command.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self::Args {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Creates a shell command string.
    pub fn shell(line: impl Into<String>) -> Self {
        Self::Shell(line.into())
    }

    /// Appends an argument. For shell strings the argument is appended verbatim.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        let arg = arg.into();
        match &mut self {
            Self::Args { args, .. } => args.push(arg),
            Self::Shell(line) => {
                line.push(' ');
                line.push_str(&arg);
            }
        }
        self
    }

    /// Appends several arguments.
    pub fn args<I, S>(self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        args.into_iter().fold(self, |cmd, a| cmd.arg(a))
    }

    /// The program name used in "not found" errors.
    pub fn program(&self) -> String {
        match self {
            Self::Args { program, .. } => program.display().to_string(),
            Self::Shell(line) => line.split_whitespace().next().unwrap_or_default().to_string(),
        }
    }

    /// Renders the command as a single line for logs and error messages.
    pub fn display(&self, platform: &dyn Platform) -> String {
        match self {
            Self::Args { program, args } => {
                let mut parts = vec![platform.quote_arg(&program.display().to_string())];
                parts.extend(args.iter().map(|a| platform.quote_arg(a)));
                parts.join(" ")
            }
            Self::Shell(line) => line.clone(),
        }
    }
}

/// How to stop a process that exceeded its timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationSignal {
    /// SIGTERM on Unix. Windows has no graceful equivalent and kills instead.
    Graceful,
    /// Unconditional kill.
    Forceful,
}

impl Default for TerminationSignal {
    fn default() -> Self {
        if cfg!(unix) {
            Self::Graceful
        } else {
            Self::Forceful
        }
    }
}

/// Knobs for a single process run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Bytes written to stdin before it is closed.
    pub stdin: Option<Vec<u8>>,
    /// Keep captured output byte-for-byte. When false, `\r\n` is folded to `\n`.
    pub binary: bool,
    /// Wall-clock limit. `None` leaves bounding the runtime to the caller.
    pub timeout: Option<Duration>,
    pub termination_signal: TerminationSignal,
    /// Time between the termination signal and the forced kill.
    pub kill_after: Duration,
    /// Environment overrides. `None` removes the variable from the child.
    pub env: BTreeMap<String, Option<String>>,
    pub working_dir: Option<PathBuf>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            stdin: None,
            binary: false,
            timeout: None,
            termination_signal: TerminationSignal::default(),
            kill_after: DEFAULT_KILL_AFTER,
            env: BTreeMap::new(),
            working_dir: None,
        }
    }
}

impl RunOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_stdin(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(data.into());
        self
    }

    pub fn binary(mut self, binary: bool) -> Self {
        self.binary = binary;
        self
    }

    pub fn with_signal(mut self, signal: TerminationSignal) -> Self {
        self.termination_signal = signal;
        self
    }

    pub fn with_kill_after(mut self, kill_after: Duration) -> Self {
        self.kill_after = kill_after;
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), Some(value.into()));
        self
    }

    /// Removes a variable from the child's inherited environment.
    pub fn without_env(mut self, key: impl Into<String>) -> Self {
        self.env.insert(key.into(), None);
        self
    }

    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

/// How a process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitStatus {
    /// Exit code, absent when the process was killed by a signal.
    pub code: Option<i32>,
    /// Terminating signal number (Unix only).
    pub signal: Option<i32>,
}

impl ExitStatus {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// A single number for messages: the exit code, or the negated signal.
    pub fn as_code(&self) -> i32 {
        match (self.code, self.signal) {
            (Some(code), _) => code,
            (None, Some(signal)) => -signal,
            (None, None) => -1,
        }
    }
}

impl From<std::process::ExitStatus> for ExitStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = {
            use std::os::unix::process::ExitStatusExt;
            status.signal()
        };
        #[cfg(not(unix))]
        let signal = None;

        Self {
            code: status.code(),
            signal,
        }
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code, self.signal) {
            (Some(code), _) => write!(f, "exit code {code}"),
            (None, Some(signal)) => write!(f, "signal {signal}"),
            (None, None) => f.write_str("unknown status"),
        }
    }
}

/// Outcome of one process execution.
///
/// When `timed_out` is set the process was terminated by the watchdog and
/// `exit_status` reflects the kill, if it was observed at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessResult {
    pub pid: u32,
    pub exit_status: Option<ExitStatus>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub timed_out: bool,
}

impl ProcessResult {
    /// Exited on its own with status zero.
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_status.is_some_and(|s| s.success())
    }

    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Trims captured output to at most `limit` characters for error messages.
pub fn excerpt(bytes: &[u8], limit: usize) -> String {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim();
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let cut: String = text.chars().take(limit).collect();
    format!("{cut}...")
}
