//! # Function-backed job (`JobFn`)
//!
//! [`JobFn`] is assembled from two closures, one per operation. Each closure
//! *creates* a fresh future per call, so no state is hidden between calls; share
//! state explicitly through `Arc<...>` captured by both closures.
//!
//! Either closure may be left unset while building. Such a job is rejected by
//! [`Job::validate`] with [`RuntimeError::MissingOperation`] before the controller
//! spawns anything.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use tokio::sync::Notify;
//! use tokio_util::sync::CancellationToken;
//! use jobvisor::{JobFn, JobRef, JobError};
//!
//! let stop = Arc::new(Notify::new());
//! let (r, c) = (Arc::clone(&stop), Arc::clone(&stop));
//!
//! let job: JobRef = JobFn::new("worker")
//!     .with_run(move || {
//!         let stop = Arc::clone(&r);
//!         async move {
//!             stop.notified().await;
//!             Ok::<_, JobError>(())
//!         }
//!     })
//!     .with_close(move |_ctx: CancellationToken| {
//!         let stop = Arc::clone(&c);
//!         async move {
//!             stop.notify_one();
//!             Ok(())
//!         }
//!     })
//!     .arc();
//!
//! assert_eq!(job.name(), "worker");
//! assert!(job.validate().is_ok());
//! ```

use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::{JobError, Operation, RuntimeError};
use crate::jobs::job::{Job, JobRef};

type BoxJobFuture = Pin<Box<dyn Future<Output = Result<(), JobError>> + Send + 'static>>;
type RunFn = Box<dyn Fn() -> BoxJobFuture + Send + Sync + 'static>;
type CloseFn = Box<dyn Fn(CancellationToken) -> BoxJobFuture + Send + Sync + 'static>;

/// Function-backed job implementation.
pub struct JobFn {
    name: Cow<'static, str>,
    run: Option<RunFn>,
    close: Option<CloseFn>,
}

impl JobFn {
    /// Creates a job with no operations set.
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            run: None,
            close: None,
        }
    }

    /// Sets the run operation.
    pub fn with_run<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), JobError>> + Send + 'static,
    {
        self.run = Some(Box::new(move || Box::pin(f())));
        self
    }

    /// Sets the close operation.
    pub fn with_close<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), JobError>> + Send + 'static,
    {
        self.close = Some(Box::new(move |ctx| Box::pin(f(ctx))));
        self
    }

    /// Finishes building and returns the job as a shared handle.
    pub fn arc(self) -> JobRef {
        Arc::new(self)
    }

    fn missing(&self, op: Operation) -> RuntimeError {
        RuntimeError::MissingOperation {
            job: self.name.to_string(),
            op,
        }
    }
}

impl fmt::Debug for JobFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobFn")
            .field("name", &self.name)
            .field("run", &self.run.is_some())
            .field("close", &self.close.is_some())
            .finish()
    }
}

#[async_trait]
impl Job for JobFn {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> Result<(), RuntimeError> {
        if self.run.is_none() {
            return Err(self.missing(Operation::Run));
        }
        if self.close.is_none() {
            return Err(self.missing(Operation::Close));
        }
        Ok(())
    }

    async fn run(&self) -> Result<(), JobError> {
        let fut = match &self.run {
            Some(f) => f(),
            None => {
                return Err(JobError::Fatal {
                    error: self.missing(Operation::Run).to_string(),
                });
            }
        };
        fut.await
    }

    async fn close(&self, ctx: CancellationToken) -> Result<(), JobError> {
        let fut = match &self.close {
            Some(f) => f(ctx),
            None => {
                return Err(JobError::Fatal {
                    error: self.missing(Operation::Close).to_string(),
                });
            }
        };
        fut.await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> JobFn {
        JobFn::new("noop")
    }

    #[test]
    fn test_missing_run_reported_first() {
        let err = noop().validate().unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::MissingOperation {
                op: Operation::Run,
                ..
            }
        ));
    }

    #[test]
    fn test_missing_close() {
        let job = noop().with_run(|| async { Ok(()) });
        let err = job.validate().unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::MissingOperation {
                op: Operation::Close,
                ..
            }
        ));
    }

    #[test]
    fn test_complete_job_is_valid() {
        let job = noop()
            .with_run(|| async { Ok(()) })
            .with_close(|_ctx| async { Ok(()) });
        assert!(job.validate().is_ok());
        assert_eq!(
            format!("{job:?}"),
            "JobFn { name: \"noop\", run: true, close: true }"
        );
    }

    #[tokio::test]
    async fn test_operations_produce_fresh_futures() {
        let job = noop()
            .with_run(|| async { Err(JobError::fail("boom")) })
            .with_close(|ctx| async move {
                if ctx.is_cancelled() {
                    return Err(JobError::Canceled);
                }
                Ok(())
            });

        for _ in 0..2 {
            let err = job.run().await.unwrap_err();
            assert_eq!(err.to_string(), "execution failed: boom");
        }

        let ctx = CancellationToken::new();
        assert!(job.close(ctx.clone()).await.is_ok());
        ctx.cancel();
        assert!(matches!(job.close(ctx).await, Err(JobError::Canceled)));
    }

    #[tokio::test]
    async fn test_unset_operation_fails_when_called_directly() {
        let job = noop();
        assert!(matches!(job.run().await, Err(JobError::Fatal { .. })));
        assert!(matches!(
            job.close(CancellationToken::new()).await,
            Err(JobError::Fatal { .. })
        ));
    }
}
