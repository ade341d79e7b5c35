//! # jobvisor
//!
//! **jobvisor** runs one long-lived async job (a server loop, a consumer, ...) and
//! closes it exactly once when the process receives a termination signal or when
//! the host asks for it.
//!
//! A job supplies two operations: `run` does the work, `close` makes `run` return.
//! The [`Controller`] starts `run`, waits for a close request, invokes `close`, and
//! reports the outcome of both phases to the caller.
//!
//! ## Architecture
//! ```text
//!   host main()
//!      │ controller.execute().await
//!      ▼
//! ┌───────────────────────────────────────────────────────────────┐
//! │  Controller::execute (control loop)                           │
//! │    select! { OS signal │ ack │ err }                          │
//! └──────┬────────────────────────▲───────────────▲───────────────┘
//!        │ sig (cap 1)            │ ack (oneshot) │ err (unbounded)
//!        ▼                        │               │
//! ┌──────────────────────────┐    │               │
//! │  supervising task        │────┘               │
//! │   ├─► spawn run task ────┼────────────────────┤  run failure
//! │   ├─► wait one request   │                    │
//! │   ├─► job.close(token) ──┼────────────────────┘  close failure / timeout
//! │   └─► ack                │
//! └──────────────────────────┘
//!        ▲
//!        │ sig
//!   Controller::signal_to_close()  (manual trigger)
//! ```
//!
//! ### Lifecycle
//! ```text
//! constructed ──► started ──► close requested (once) ──► close done ──► acknowledged
//!                    │
//!                    └─► run failure ──► execute returns the error immediately
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                        |
//! |-------------------|---------------------------------------------------------------|-------------------------------------------|
//! | **Jobs**          | Define a job as a trait impl or from two closures.            | [`Job`], [`JobFn`], [`JobRef`]            |
//! | **Lifecycle**     | Start, listen for signals, close once, report errors.         | [`Controller`], [`Handshake`]             |
//! | **Configuration** | Signal set, close deadline, bus capacity.                     | [`Config`], [`Signal`]                    |
//! | **Errors**        | Typed errors for job operations and the controller.           | [`JobError`], [`RuntimeError`]            |
//! | **Events**        | Lifecycle events for logging/metrics subscribers.             | [`Event`], [`EventKind`], [`Subscribe`]   |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use tokio::sync::Notify;
//! use tokio_util::sync::CancellationToken;
//! use jobvisor::{Controller, JobError, JobFn};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let stop = Arc::new(Notify::new());
//!     let (r, c) = (Arc::clone(&stop), Arc::clone(&stop));
//!
//!     let job = JobFn::new("server")
//!         .with_run(move || {
//!             let stop = Arc::clone(&r);
//!             async move {
//!                 // serve until told to stop
//!                 stop.notified().await;
//!                 Ok::<_, JobError>(())
//!             }
//!         })
//!         .with_close(move |_ctx: CancellationToken| {
//!             let stop = Arc::clone(&c);
//!             async move {
//!                 stop.notify_one();
//!                 Ok(())
//!             }
//!         })
//!         .arc();
//!
//!     // Blocks until SIGINT/SIGTERM closed the job, or a phase failed.
//!     Controller::new(job).execute().await?;
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod jobs;
mod subscribers;

// ---- Public re-exports ----

pub use crate::core::{
    CloseReason, Config, Controller, ControllerBuilder, Handshake, Signal, request_close,
};
pub use error::{JobError, Operation, RuntimeError};
pub use events::{Bus, Event, EventKind};
pub use jobs::{Job, JobFn, JobRef};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
