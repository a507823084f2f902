//! Error types for the converter module.

use std::path::PathBuf;
use thiserror::Error;

use crate::format::Format;
use crate::locator::LocatorError;
use crate::process::{ExecutionError, ProcessError};

/// Errors that can occur during conversion.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// The external tool is not installed.
    #[error(transparent)]
    ToolNotFound(#[from] LocatorError),

    /// The external tool ran and failed (timeout, non-zero exit, launch failure).
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// The tool reported success but wrote no output file.
    #[error("{tool} exited successfully but did not create output file {}: {command}", path.display())]
    OutputMissing {
        tool: String,
        path: PathBuf,
        command: String,
    },

    /// The input could not be interpreted.
    #[error("Malformed input: {reason}")]
    MalformedInput { reason: String },

    /// A width/height query produced nothing usable.
    #[error("{query} query failed: {reason}")]
    QueryFailed { query: String, reason: String },

    /// No registered strategy handles the pair.
    #[error("No strategy converts {from} to {to}; supported conversions: {}", format_pairs(supported))]
    NoStrategy {
        from: Format,
        to: Format,
        supported: Vec<(Format, Format)>,
    },

    /// The alternate tool chain failed after the direct conversion produced no output.
    #[error("fallback conversion failed: {source}")]
    FallbackFailed { source: Box<ConversionError> },

    /// I/O error on the temp workspace.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of a [`ConversionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ToolNotFound,
    ExecutionTimeout,
    ExecutionFailed,
    OutputMissing,
    MalformedInput,
    QueryFailed,
    NoStrategy,
    Io,
}

impl ConversionError {
    pub fn malformed_input(reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            reason: reason.into(),
        }
    }

    pub fn query_failed(query: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::QueryFailed {
            query: query.into(),
            reason: reason.into(),
        }
    }

    /// Wraps an error raised by the fallback chain.
    pub fn fallback(cause: ConversionError) -> Self {
        Self::FallbackFailed {
            source: Box::new(cause),
        }
    }

    /// The taxonomy kind. A fallback failure reports the kind of its cause.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ToolNotFound(_) => ErrorKind::ToolNotFound,
            Self::Execution(ExecutionError::Timeout { .. }) => ErrorKind::ExecutionTimeout,
            Self::Execution(ExecutionError::Launch(ProcessError::CommandNotFound { .. })) => {
                ErrorKind::ToolNotFound
            }
            Self::Execution(_) => ErrorKind::ExecutionFailed,
            Self::OutputMissing { .. } => ErrorKind::OutputMissing,
            Self::MalformedInput { .. } => ErrorKind::MalformedInput,
            Self::QueryFailed { .. } => ErrorKind::QueryFailed,
            Self::NoStrategy { .. } => ErrorKind::NoStrategy,
            Self::FallbackFailed { source } => source.kind(),
            Self::Io(_) => ErrorKind::Io,
        }
    }

    /// Whether the alternate tool chain should be tried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::OutputMissing { .. })
    }
}

fn format_pairs(pairs: &[(Format, Format)]) -> String {
    pairs
        .iter()
        .map(|(from, to)| format!("{from}->{to}"))
        .collect::<Vec<_>>()
        .join(", ")
}
