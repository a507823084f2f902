//! Spawns external programs with captured output and an enforced timeout.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::error::ProcessError;
use super::types::{CommandLine, ExitStatus, ProcessResult, RunOptions, TerminationSignal};
use crate::metrics;
use crate::platform::{Platform, SystemPlatform};

/// How long cleanup waits for the stdout/stderr readers once the process is gone.
pub const DEFAULT_READER_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Runs one external process to completion.
///
/// `run` never fails because the program exited badly or timed out; callers
/// inspect [`ProcessResult::timed_out`] and [`ProcessResult::exit_status`].
/// It only fails when the program cannot be launched.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    platform: Arc<dyn Platform>,
    reader_join_timeout: Duration,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(Arc::new(SystemPlatform))
    }
}

impl ProcessRunner {
    pub fn new(platform: Arc<dyn Platform>) -> Self {
        Self {
            platform,
            reader_join_timeout: DEFAULT_READER_JOIN_TIMEOUT,
        }
    }

    /// Overrides how long output readers may lag behind process exit.
    pub fn with_reader_join_timeout(mut self, timeout: Duration) -> Self {
        self.reader_join_timeout = timeout;
        self
    }

    pub fn platform(&self) -> &Arc<dyn Platform> {
        &self.platform
    }

    /// Runs `command` and collects its result.
    pub async fn run(
        &self,
        command: &CommandLine,
        options: &RunOptions,
    ) -> Result<ProcessResult, ProcessError> {
        let mut cmd = self.build_command(command);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        for (key, value) in &options.env {
            match value {
                Some(value) => cmd.env(key, value),
                None => cmd.env_remove(key),
            };
        }
        if let Some(dir) = &options.working_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| ProcessError::from_spawn(command.program(), e))?;
        let pid = child.id().unwrap_or_default();
        debug!(pid, command = %command.display(self.platform.as_ref()), "spawned process");

        let stdin_task = child.stdin.take().map(|mut stdin| {
            let data = options.stdin.clone();
            tokio::spawn(async move {
                if let Some(data) = data {
                    if let Err(e) = stdin.write_all(&data).await {
                        debug!(error = %e, "failed to write child stdin");
                    }
                }
                // Dropping the handle closes the pipe.
            })
        });
        let stdout_task = child.stdout.take().map(spawn_reader);
        let stderr_task = child.stderr.take().map(spawn_reader);

        let (exit_status, timed_out) = self.wait(&mut child, options, pid).await;

        if let Some(task) = stdin_task {
            task.abort();
        }
        let stdout = self.join_reader(stdout_task, "stdout", pid).await;
        let stderr = self.join_reader(stderr_task, "stderr", pid).await;

        let (stdout, stderr) = if options.binary {
            (stdout, stderr)
        } else {
            (normalize_newlines(stdout), normalize_newlines(stderr))
        };

        debug!(
            pid,
            exit_status = ?exit_status,
            timed_out,
            stdout_len = stdout.len(),
            stderr_len = stderr.len(),
            "process finished"
        );

        Ok(ProcessResult {
            pid,
            exit_status,
            stdout,
            stderr,
            timed_out,
        })
    }

    fn build_command(&self, command: &CommandLine) -> Command {
        match command {
            CommandLine::Args { program, args } => {
                let mut c = Command::new(program);
                c.args(args);
                c
            }
            CommandLine::Shell(line) => {
                if self.platform.is_windows() {
                    let mut c = Command::new("cmd");
                    c.arg("/C").arg(line);
                    c
                } else {
                    let mut c = Command::new("sh");
                    c.arg("-c").arg(line);
                    c
                }
            }
        }
    }

    /// Waits for exit, escalating termination once the timeout elapses.
    async fn wait(
        &self,
        child: &mut Child,
        options: &RunOptions,
        pid: u32,
    ) -> (Option<ExitStatus>, bool) {
        let Some(limit) = options.timeout else {
            return (observe(child.wait().await, pid), false);
        };

        match tokio::time::timeout(limit, child.wait()).await {
            Ok(status) => (observe(status, pid), false),
            Err(_) => {
                metrics::PROCESS_TIMEOUTS.inc();
                warn!(
                    pid,
                    timeout_secs = limit.as_secs_f64(),
                    signal = ?options.termination_signal,
                    "process exceeded timeout, terminating"
                );
                terminate(child, options.termination_signal, pid);

                let status = match tokio::time::timeout(options.kill_after, child.wait()).await {
                    Ok(status) => observe(status, pid),
                    Err(_) => {
                        warn!(
                            pid,
                            kill_after_secs = options.kill_after.as_secs_f64(),
                            "process still alive after grace period, killing"
                        );
                        match child.kill().await {
                            Ok(()) => observe(child.wait().await, pid),
                            Err(e) => {
                                warn!(pid, error = %e, "failed to kill process");
                                child.try_wait().ok().flatten().map(ExitStatus::from)
                            }
                        }
                    }
                };
                (status, true)
            }
        }
    }

    async fn join_reader(
        &self,
        handle: Option<JoinHandle<Vec<u8>>>,
        stream: &'static str,
        pid: u32,
    ) -> Vec<u8> {
        let Some(mut handle) = handle else {
            return Vec::new();
        };
        match tokio::time::timeout(self.reader_join_timeout, &mut handle).await {
            Ok(Ok(buf)) => buf,
            Ok(Err(e)) => {
                warn!(pid, stream, error = %e, "output reader task failed");
                Vec::new()
            }
            Err(_) => {
                handle.abort();
                warn!(
                    pid,
                    stream, "output reader did not finish in time, discarding partial output"
                );
                Vec::new()
            }
        }
    }
}

fn spawn_reader<R>(mut reader: R) -> JoinHandle<Vec<u8>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Err(e) = reader.read_to_end(&mut buf).await {
            debug!(error = %e, "pipe read ended with error");
        }
        buf
    })
}

fn observe(status: std::io::Result<std::process::ExitStatus>, pid: u32) -> Option<ExitStatus> {
    match status {
        Ok(status) => Some(status.into()),
        Err(e) => {
            warn!(pid, error = %e, "could not observe process exit status");
            None
        }
    }
}

fn terminate(child: &mut Child, signal: TerminationSignal, pid: u32) {
    if signal == TerminationSignal::Graceful && send_sigterm(pid) {
        return;
    }
    if let Err(e) = child.start_kill() {
        debug!(pid, error = %e, "kill request failed, process may have exited");
    }
}

#[cfg(unix)]
fn send_sigterm(pid: u32) -> bool {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    if raw <= 0 {
        return false;
    }
    match kill(Pid::from_raw(raw), Signal::SIGTERM) {
        Ok(()) => true,
        Err(e) => {
            debug!(pid, error = %e, "SIGTERM failed");
            false
        }
    }
}

#[cfg(not(unix))]
fn send_sigterm(_pid: u32) -> bool {
    false
}

fn normalize_newlines(buf: Vec<u8>) -> Vec<u8> {
    if !buf.windows(2).any(|w| w == b"\r\n") {
        return buf;
    }
    let mut out = Vec::with_capacity(buf.len());
    let mut iter = buf.iter().peekable();
    while let Some(&b) = iter.next() {
        if b == b'\r' && iter.peek() == Some(&&b'\n') {
            continue;
        }
        out.push(b);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_newlines() {
        assert_eq!(normalize_newlines(b"a\r\nb\r\n".to_vec()), b"a\nb\n");
        assert_eq!(normalize_newlines(b"a\rb".to_vec()), b"a\rb");
    }

    #[tokio::test]
    async fn test_missing_program_is_command_not_found() {
        let runner = ProcessRunner::default();
        let err = runner
            .run(
                &CommandLine::new("vecconv-definitely-not-a-real-tool"),
                &RunOptions::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::CommandNotFound { .. }));
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use std::time::Instant;

        #[tokio::test]
        async fn test_echo_captures_stdout() {
            let runner = ProcessRunner::default();
            let result = runner
                .run(
                    &CommandLine::new("echo").arg("hello world"),
                    &RunOptions::default(),
                )
                .await
                .unwrap();

            assert_eq!(result.stdout_text().trim(), "hello world");
            assert!(result.stderr.is_empty());
            assert!(result.success());
            assert!(!result.timed_out);
            assert!(result.pid > 0);
        }

        #[tokio::test]
        async fn test_timeout_sets_flag() {
            let runner = ProcessRunner::default();
            let start = Instant::now();
            let result = runner
                .run(
                    &CommandLine::new("sleep").arg("10"),
                    &RunOptions::default()
                        .with_timeout(Duration::from_secs(1))
                        .with_kill_after(Duration::from_secs(1)),
                )
                .await
                .unwrap();

            assert!(result.timed_out);
            assert!(!result.success());
            assert!(start.elapsed() < Duration::from_secs(8));
        }

        #[tokio::test]
        async fn test_escalates_to_kill_when_term_ignored() {
            let runner =
                ProcessRunner::default().with_reader_join_timeout(Duration::from_millis(300));
            let result = runner
                .run(
                    &CommandLine::new("sh").args(["-c", "trap '' TERM; sleep 10"]),
                    &RunOptions::default()
                        .with_timeout(Duration::from_millis(500))
                        .with_kill_after(Duration::from_millis(500)),
                )
                .await
                .unwrap();

            assert!(result.timed_out);
            assert_eq!(result.exit_status.and_then(|s| s.signal), Some(9));
        }

        #[tokio::test]
        async fn test_non_zero_exit_is_not_an_error() {
            let runner = ProcessRunner::default();
            let result = runner
                .run(&CommandLine::shell("exit 42"), &RunOptions::default())
                .await
                .unwrap();

            assert_eq!(result.exit_status.and_then(|s| s.code), Some(42));
            assert!(!result.success());
        }

        #[tokio::test]
        async fn test_stdin_is_written_and_closed() {
            let runner = ProcessRunner::default();
            let result = runner
                .run(
                    &CommandLine::new("cat"),
                    &RunOptions::default().with_stdin(b"piped input".to_vec()),
                )
                .await
                .unwrap();

            assert_eq!(result.stdout, b"piped input");
        }

        #[tokio::test]
        async fn test_env_overrides_and_removal() {
            let runner = ProcessRunner::default();
            let result = runner
                .run(
                    &CommandLine::new("sh").args(["-c", "echo \"$VECCONV_A:${HOME:-unset}\""]),
                    &RunOptions::default()
                        .with_env("VECCONV_A", "set")
                        .without_env("HOME"),
                )
                .await
                .unwrap();

            assert_eq!(result.stdout_text().trim(), "set:unset");
        }

        #[tokio::test]
        async fn test_working_directory() {
            let dir = tempfile::tempdir().unwrap();
            let runner = ProcessRunner::default();
            let result = runner
                .run(&CommandLine::new("pwd"), &RunOptions::default().in_dir(dir.path()))
                .await
                .unwrap();

            let reported = std::path::PathBuf::from(result.stdout_text().trim());
            assert_eq!(
                reported.canonicalize().unwrap(),
                dir.path().canonicalize().unwrap()
            );
        }

        #[tokio::test]
        async fn test_large_output_does_not_deadlock() {
            let runner = ProcessRunner::default();
            let result = runner
                .run(
                    &CommandLine::shell("head -c 1000000 /dev/zero; head -c 500000 /dev/zero >&2"),
                    &RunOptions::default()
                        .binary(true)
                        .with_timeout(Duration::from_secs(30)),
                )
                .await
                .unwrap();

            assert_eq!(result.stdout.len(), 1_000_000);
            assert_eq!(result.stderr.len(), 500_000);
            assert!(result.success());
        }

        #[tokio::test]
        async fn test_text_mode_folds_crlf() {
            let runner = ProcessRunner::default();
            let result = runner
                .run(
                    &CommandLine::new("printf").arg("a\\r\\nb\\r\\n"),
                    &RunOptions::default(),
                )
                .await
                .unwrap();
            assert_eq!(result.stdout, b"a\nb\n");

            let raw = runner
                .run(
                    &CommandLine::new("printf").arg("a\\r\\nb"),
                    &RunOptions::default().binary(true),
                )
                .await
                .unwrap();
            assert_eq!(raw.stdout, b"a\r\nb");
        }
    }
}
