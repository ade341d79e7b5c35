//! # Job abstraction.
//!
//! A [`Job`] is a long-running unit with a matching teardown: [`run`](Job::run) does
//! the work (serving requests, consuming a queue, ...) and [`close`](Job::close)
//! makes `run` return. The controller never cancels `run` itself; stopping it is
//! entirely the job's business.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::{JobError, RuntimeError};

/// # Shared handle to a job object.
pub type JobRef = Arc<dyn Job>;

/// # Long-running operation with a teardown hook.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use async_trait::async_trait;
/// use tokio::sync::Notify;
/// use tokio_util::sync::CancellationToken;
/// use jobvisor::{Job, JobError};
///
/// struct Server {
///     stop: Arc<Notify>,
/// }
///
/// #[async_trait]
/// impl Job for Server {
///     fn name(&self) -> &str { "server" }
///
///     async fn run(&self) -> Result<(), JobError> {
///         self.stop.notified().await;
///         Ok(())
///     }
///
///     async fn close(&self, _ctx: CancellationToken) -> Result<(), JobError> {
///         self.stop.notify_one();
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Job: Send + Sync + 'static {
    /// Returns a stable, human-readable job name.
    fn name(&self) -> &str;

    /// Checks that the job is complete enough to be started.
    ///
    /// Called before anything is spawned. The default accepts every job.
    fn validate(&self) -> Result<(), RuntimeError> {
        Ok(())
    }

    /// Does the work. Expected to return once [`close`](Job::close) has run,
    /// or earlier on natural completion or failure.
    async fn run(&self) -> Result<(), JobError>;

    /// Stops [`run`](Job::run). Invoked at most once per lifecycle.
    ///
    /// `ctx` is cancelled when the controller's close deadline expires. Long
    /// teardowns should watch it and return [`JobError::Canceled`] promptly; a
    /// close that keeps going is dropped after a short grace period.
    async fn close(&self, ctx: CancellationToken) -> Result<(), JobError>;
}
