//! # Job abstractions.
//!
//! This module provides the job-related types:
//! - [`Job`] - trait with the two operations the controller drives (`run`, `close`)
//! - [`JobFn`] - closure-backed implementation
//! - [`JobRef`] - shared reference to a job (`Arc<dyn Job>`)

mod job;
mod job_fn;

pub use job::{Job, JobRef};
pub use job_fn::JobFn;
