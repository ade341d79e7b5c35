//! Error types used by the controller and by job operations.
//!
//! This module defines two main error enums:
//!
//! - [`JobError`]: errors returned by a job's own `run`/`close` operations.
//! - [`RuntimeError`]: errors reported by the [`Controller`](crate::Controller),
//!   wrapping job errors together with the phase they came from.
//!
//! Both types provide `as_label` for logs/metrics.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Operation of a job, used to name what is missing or what failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// The long-running `run` operation.
    Run,
    /// The `close` (teardown) operation.
    Close,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Run => f.write_str("run"),
            Operation::Close => f.write_str("close"),
        }
    }
}

/// # Errors produced by job operations.
///
/// Returned by [`Job::run`](crate::Job::run) and [`Job::close`](crate::Job::close).
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum JobError {
    /// Operation failed.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Non-recoverable error (also used for caught panics).
    #[error("fatal error: {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },

    /// Close observed its deadline token and gave up.
    #[error("context cancelled")]
    Canceled,
}

impl JobError {
    /// Shorthand for [`JobError::Fail`] from anything printable.
    ///
    /// # Example
    /// ```
    /// use jobvisor::JobError;
    ///
    /// let err = JobError::fail("address in use");
    /// assert_eq!(err.to_string(), "execution failed: address in use");
    /// ```
    pub fn fail(error: impl fmt::Display) -> Self {
        JobError::Fail {
            error: error.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            JobError::Fail { .. } => "job_failed",
            JobError::Fatal { .. } => "job_fatal",
            JobError::Canceled => "job_canceled",
        }
    }
}

impl From<std::io::Error> for JobError {
    fn from(err: std::io::Error) -> Self {
        JobError::fail(err)
    }
}

/// # Errors reported by the controller.
///
/// Configuration errors ([`RuntimeError::MissingOperation`], [`RuntimeError::Signal`])
/// are returned before anything is spawned. Operational errors arrive through the
/// handshake error channel.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The job lacks a required operation.
    #[error("job {job:?}: {op} operation missing")]
    MissingOperation {
        /// Job name.
        job: String,
        /// The first missing operation.
        op: Operation,
    },

    /// Manual close was requested before the job was ever started.
    #[error("job {job:?} has not been started")]
    NotStarted {
        /// Job name.
        job: String,
    },

    /// OS signal handlers could not be installed.
    #[error("failed to register signal handlers: {source}")]
    Signal {
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The run operation failed.
    #[error("job {job:?} run failed: {source}")]
    Run {
        /// Job name.
        job: String,
        /// Error returned by the job.
        #[source]
        source: JobError,
    },

    /// The close operation failed.
    #[error("job {job:?} close failed: {source}")]
    Close {
        /// Job name.
        job: String,
        /// Error returned by the job.
        #[source]
        source: JobError,
    },

    /// The close operation did not finish within the configured deadline.
    #[error("job {job:?} close timed out after {timeout:?}")]
    CloseTimeout {
        /// Job name.
        job: String,
        /// The deadline that was exceeded.
        timeout: Duration,
    },

    /// The supervising task ended without acknowledging close.
    #[error("job {job:?} supervisor exited without acknowledgement")]
    SupervisorLost {
        /// Job name.
        job: String,
    },

    /// More than one failure was collected; kept in arrival order.
    #[error("{} errors: {}", .errors.len(), join(.errors))]
    Many {
        /// Collected errors.
        errors: Vec<RuntimeError>,
    },
}

fn join(errors: &[RuntimeError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use jobvisor::{Operation, RuntimeError};
    ///
    /// let err = RuntimeError::MissingOperation { job: "http".into(), op: Operation::Close };
    /// assert_eq!(err.as_label(), "runtime_missing_operation");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::MissingOperation { .. } => "runtime_missing_operation",
            RuntimeError::NotStarted { .. } => "runtime_not_started",
            RuntimeError::Signal { .. } => "runtime_signal",
            RuntimeError::Run { .. } => "runtime_run_failed",
            RuntimeError::Close { .. } => "runtime_close_failed",
            RuntimeError::CloseTimeout { .. } => "runtime_close_timeout",
            RuntimeError::SupervisorLost { .. } => "runtime_supervisor_lost",
            RuntimeError::Many { .. } => "runtime_many",
        }
    }

    /// True for errors detected before anything was spawned.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            RuntimeError::MissingOperation { .. } | RuntimeError::Signal { .. }
        )
    }

    /// Folds collected errors into one: `None` when empty, the error itself when
    /// alone, [`RuntimeError::Many`] otherwise.
    pub(crate) fn collect(mut errors: Vec<RuntimeError>) -> Option<RuntimeError> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(RuntimeError::Many { errors }),
        }
    }
}
