//! "Run or fail" wrapper over [`ProcessRunner`].

use std::path::Path;
use std::time::{Duration, Instant};
use tracing::debug;

use super::error::{ExecutionError, OUTPUT_EXCERPT_LIMIT};
use super::runner::ProcessRunner;
use super::types::{excerpt, CommandLine, ProcessResult, RunOptions, TerminationSignal};
use crate::metrics;

/// A fully described invocation: what to run and how.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub command: CommandLine,
    pub options: RunOptions,
}

impl CommandSpec {
    pub fn new(command: CommandLine) -> Self {
        Self {
            command,
            options: RunOptions::default(),
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    pub fn grace_period(mut self, kill_after: Duration) -> Self {
        self.options.kill_after = kill_after;
        self
    }

    pub fn termination_signal(mut self, signal: TerminationSignal) -> Self {
        self.options.termination_signal = signal;
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options = self.options.with_env(key, value);
        self
    }

    pub fn env_remove(mut self, key: impl Into<String>) -> Self {
        self.options = self.options.without_env(key);
        self
    }

    pub fn stdin(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.options.stdin = Some(data.into());
        self
    }

    pub fn working_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.options.working_dir = Some(dir.as_ref().to_path_buf());
        self
    }
}

/// A successful execution.
#[derive(Debug, Clone)]
pub struct RunRecord {
    /// The command as it was logged.
    pub command_line: String,
    pub result: ProcessResult,
    pub elapsed: Duration,
}

/// Runs commands and turns anything but a clean zero exit into an error.
#[derive(Debug, Clone, Default)]
pub struct CommandExecutor {
    runner: ProcessRunner,
}

impl CommandExecutor {
    pub fn new(runner: ProcessRunner) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &ProcessRunner {
        &self.runner
    }

    /// Executes `spec`, failing on timeout, non-zero exit or an unobservable exit.
    pub async fn execute(&self, spec: &CommandSpec) -> Result<RunRecord, ExecutionError> {
        let command_line = spec.command.display(self.runner.platform().as_ref());
        debug!(command = %command_line, "executing command");

        let start = Instant::now();
        let result = self.runner.run(&spec.command, &spec.options).await?;
        let elapsed = start.elapsed();

        metrics::PROCESS_DURATION
            .with_label_values(&[&tool_label(&spec.command)])
            .observe(elapsed.as_secs_f64());

        debug!(
            command = %command_line,
            pid = result.pid,
            exit_status = ?result.exit_status,
            timed_out = result.timed_out,
            elapsed_ms = elapsed.as_millis() as u64,
            stdout = %excerpt(&result.stdout, OUTPUT_EXCERPT_LIMIT),
            stderr = %excerpt(&result.stderr, OUTPUT_EXCERPT_LIMIT),
            "command finished"
        );

        classify(&command_line, &spec.options, &result)?;
        Ok(RunRecord {
            command_line,
            result,
            elapsed,
        })
    }
}

/// Maps a finished process onto the run-or-fail contract.
fn classify(
    command_line: &str,
    options: &RunOptions,
    result: &ProcessResult,
) -> Result<(), ExecutionError> {
    if result.timed_out {
        let timeout_secs = options
            .timeout
            .map(|t| t.as_secs_f64())
            .unwrap_or_default();
        return Err(ExecutionError::timeout(
            command_line.to_string(),
            timeout_secs,
            &result.stdout,
            &result.stderr,
        ));
    }

    match result.exit_status {
        None => Err(ExecutionError::no_status(
            command_line.to_string(),
            &result.stdout,
            &result.stderr,
        )),
        Some(status) if !status.success() => Err(ExecutionError::non_zero(
            command_line.to_string(),
            status.as_code(),
            &result.stdout,
            &result.stderr,
        )),
        Some(_) => Ok(()),
    }
}

/// Metric label for a command: the program's file stem.
fn tool_label(command: &CommandLine) -> String {
    let program = command.program();
    Path::new(&program)
        .file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .unwrap_or(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ExitStatus;

    #[test]
    fn test_tool_label() {
        assert_eq!(
            tool_label(&CommandLine::new("/usr/bin/inkscape")),
            "inkscape"
        );
        assert_eq!(tool_label(&CommandLine::new("gswin64c.exe")), "gswin64c");
    }

    #[test]
    fn test_spec_builder() {
        let spec = CommandSpec::new(CommandLine::new("gs"))
            .timeout(Duration::from_secs(3))
            .grace_period(Duration::from_secs(1))
            .termination_signal(TerminationSignal::Forceful)
            .env_remove("DISPLAY");
        assert_eq!(spec.options.timeout, Some(Duration::from_secs(3)));
        assert_eq!(spec.options.kill_after, Duration::from_secs(1));
        assert_eq!(spec.options.termination_signal, TerminationSignal::Forceful);
        assert_eq!(spec.options.env.get("DISPLAY"), Some(&None));
    }

    fn finished(exit_status: Option<ExitStatus>, timed_out: bool) -> ProcessResult {
        ProcessResult {
            pid: 7,
            exit_status,
            stdout: b"partial page".to_vec(),
            stderr: b"lost child".to_vec(),
            timed_out,
        }
    }

    #[test]
    fn test_classify_without_exit_status() {
        let err = classify("inkscape a.svg", &RunOptions::default(), &finished(None, false))
            .unwrap_err();
        assert!(matches!(err, ExecutionError::NoExitStatus { .. }));
        let msg = err.to_string();
        assert!(msg.contains("no exit status"), "{msg}");
        assert!(msg.contains("inkscape a.svg"), "{msg}");
        assert!(msg.contains("partial page"), "{msg}");
        assert!(msg.contains("lost child"), "{msg}");
    }

    #[test]
    fn test_classify_outcomes() {
        let ok = ExitStatus {
            code: Some(0),
            signal: None,
        };
        let failed = ExitStatus {
            code: Some(2),
            signal: None,
        };
        let options = RunOptions::default();

        assert!(classify("gs", &options, &finished(Some(ok), false)).is_ok());
        assert!(matches!(
            classify("gs", &options, &finished(Some(failed), false)),
            Err(ExecutionError::NonZeroExit { code: 2, .. })
        ));
        // A timeout wins over whatever status the killed process left.
        assert!(matches!(
            classify("gs", &options, &finished(None, true)),
            Err(ExecutionError::Timeout { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_program_is_launch_error() {
        let executor = CommandExecutor::default();
        let err = executor
            .execute(&CommandSpec::new(CommandLine::new(
                "vecconv-definitely-not-a-real-tool",
            )))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[cfg(unix)]
    mod unix {
        use super::*;

        #[tokio::test]
        async fn test_success_returns_record() {
            let executor = CommandExecutor::default();
            let record = executor
                .execute(&CommandSpec::new(CommandLine::new("echo").arg("ok")))
                .await
                .unwrap();
            assert_eq!(record.result.stdout_text().trim(), "ok");
            assert!(record.command_line.starts_with("echo"));
        }

        #[tokio::test]
        async fn test_exit_42_is_execution_failed() {
            let executor = CommandExecutor::default();
            let err = executor
                .execute(&CommandSpec::new(
                    CommandLine::new("sh").args(["-c", "echo oops >&2; exit 42"]),
                ))
                .await
                .unwrap_err();

            assert!(matches!(err, ExecutionError::NonZeroExit { code: 42, .. }));
            let msg = err.to_string();
            assert!(msg.contains("42"));
            assert!(msg.contains("oops"));
        }

        #[tokio::test]
        async fn test_timeout_message_includes_limit() {
            let executor = CommandExecutor::default();
            let err = executor
                .execute(
                    &CommandSpec::new(CommandLine::new("sleep").arg("10"))
                        .timeout(Duration::from_secs(1))
                        .grace_period(Duration::from_secs(1)),
                )
                .await
                .unwrap_err();

            assert!(matches!(err, ExecutionError::Timeout { .. }));
            assert!(err.to_string().contains("timed out after 1 seconds"));
        }
    }
}
