//! # Lifecycle events emitted by the controller.
//!
//! The [`EventKind`] enum classifies events in the order a lifecycle produces them:
//! start, run outcome, close request, close outcome, acknowledgement.
//!
//! The [`Event`] struct carries additional metadata such as timestamps, job name,
//! the signal that triggered close, and error text.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use jobvisor::{Event, EventKind, Signal};
//!
//! let ev = Event::new(EventKind::SignalReceived)
//!     .with_job("http")
//!     .with_signal(Signal::Terminate);
//!
//! assert_eq!(ev.kind, EventKind::SignalReceived);
//! assert_eq!(ev.job.as_deref(), Some("http"));
//! assert_eq!(ev.signal, Some(Signal::Terminate));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::core::Signal;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Supervising task spawned; run is about to start.
    ///
    /// Sets: `job`
    JobStarting,

    /// Run returned without error.
    ///
    /// Sets: `job`
    RunStopped,

    /// Run returned an error or panicked.
    ///
    /// Sets: `job`, `reason`
    RunFailed,

    /// A registered OS signal was delivered to the execute loop.
    ///
    /// Sets: `job`, `signal`
    SignalReceived,

    /// The supervising task accepted a close request and is invoking close.
    ///
    /// Sets: `job`, `reason` (who asked), `signal` (if an OS signal asked)
    CloseRequested,

    /// Close returned an error or panicked.
    ///
    /// Sets: `job`, `reason`
    CloseFailed,

    /// Close exceeded its deadline; its token was cancelled.
    ///
    /// Sets: `job`, `timeout_ms`
    CloseTimeoutHit,

    /// Close finished (with or without error) and the acknowledgement was sent.
    ///
    /// Sets: `job`
    CloseAcknowledged,
}

/// Lifecycle event with optional metadata.
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Name of the job.
    pub job: Option<Arc<str>>,
    /// Human-readable reason (error text, close trigger).
    pub reason: Option<Arc<str>>,
    /// OS signal involved, if any.
    pub signal: Option<Signal>,
    /// Close deadline in milliseconds (compact).
    pub timeout_ms: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            job: None,
            reason: None,
            signal: None,
            timeout_ms: None,
        }
    }

    /// Attaches a job name.
    #[inline]
    pub fn with_job(mut self, job: impl Into<Arc<str>>) -> Self {
        self.job = Some(job.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches the signal involved.
    #[inline]
    pub fn with_signal(mut self, signal: Signal) -> Self {
        self.signal = Some(signal);
        self
    }

    /// Attaches a deadline (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.timeout_ms = Some(ms);
        self
    }
}
