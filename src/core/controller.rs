//! # Controller: runs one job and closes it exactly once.
//!
//! The [`Controller`] owns a [`JobRef`], its [`Config`] and the event [`Bus`].
//! It offers the three entry points of a lifecycle:
//!
//! - [`Controller::start_with_close`]: non-blocking start, returns the [`Handshake`];
//! - [`Controller::execute`]: start, listen for OS signals and wait for the outcome;
//! - [`Controller::signal_to_close`]: request close from anywhere holding the controller.
//!
//! ## Execute loop
//! ```text
//! execute()
//!   ├─► job.validate()                 ── Err ─► MissingOperation (nothing spawned)
//!   ├─► SignalListener::register(..)   ── Err ─► Signal           (nothing spawned)
//!   ├─► start_with_close()
//!   └─► loop select! {
//!         signal  ─► publish SignalReceived, try_send(CloseReason::Signal)
//!         ack     ─► drain err: none ─► Ok(()), some ─► Err(..)
//!         err     ─► drain err ─► Err(..)      (does not wait for ack)
//!       }
//! ```
//!
//! No ordering guarantee exists between branches that are ready at the same time.
//! Because close errors are queued before the acknowledgement, a close failure is
//! reported whichever branch wins.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use super::{
    builder::ControllerBuilder,
    config::Config,
    handshake::{self, CloseReason, Handshake},
    shutdown::SignalListener,
};
use crate::{
    error::RuntimeError,
    events::{Bus, Event, EventKind},
    jobs::JobRef,
};

/// Lifecycle controller for a single job.
///
/// Share it through an `Arc` when another task needs [`Controller::signal_to_close`]
/// while [`Controller::execute`] is running.
pub struct Controller {
    job: JobRef,
    cfg: Config,
    bus: Bus,
    /// Request sender of the most recent lifecycle.
    requests: Mutex<Option<mpsc::Sender<CloseReason>>>,
}

impl Controller {
    /// Creates a controller with the default [`Config`] and no subscribers.
    pub fn new(job: JobRef) -> Self {
        Self::with_config(job, Config::default())
    }

    /// Creates a controller with the given config and no subscribers.
    pub fn with_config(job: JobRef, cfg: Config) -> Self {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        Self::new_internal(job, cfg, bus)
    }

    /// Returns a builder, used to attach subscribers.
    pub fn builder(job: JobRef) -> ControllerBuilder {
        ControllerBuilder::new(job)
    }

    pub(super) fn new_internal(job: JobRef, cfg: Config, bus: Bus) -> Self {
        Self {
            job,
            cfg,
            bus,
            requests: Mutex::new(None),
        }
    }

    /// The controlled job.
    pub fn job(&self) -> &JobRef {
        &self.job
    }

    /// The configuration as given; see [`Config::resolved_signals`] for the effective set.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Event bus of this controller.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Starts the job and returns the lifecycle's handles without waiting.
    ///
    /// Validates the job first; an invalid job is rejected before anything is
    /// spawned. A copy of the request sender is kept so that
    /// [`signal_to_close`](Self::signal_to_close) reaches this lifecycle. Starting
    /// again replaces it.
    ///
    /// Must be called within a tokio runtime.
    pub fn start_with_close(&self) -> Result<Handshake, RuntimeError> {
        self.job.validate()?;

        let hs = handshake::spawn(
            Arc::clone(&self.job),
            self.cfg.close_deadline(),
            self.bus.clone(),
        );
        *self.lock_requests() = Some(hs.sig.clone());
        Ok(hs)
    }

    /// Runs the job until it is closed, returning the first failure(s) if any.
    ///
    /// - `Ok(())`: close was requested, completed without error and acknowledged.
    /// - `Err(e)` with `e.is_config()`: rejected before start.
    /// - any other `Err`: run or close failed. A run failure returns immediately,
    ///   without requesting close and without waiting for an acknowledgement.
    ///
    /// A close that never returns, with no `close_timeout` configured, makes this
    /// future pend forever.
    pub async fn execute(&self) -> Result<(), RuntimeError> {
        self.job.validate()?;

        let signals = self.cfg.resolved_signals();
        let mut listener =
            SignalListener::register(&signals).map_err(|source| RuntimeError::Signal { source })?;

        let Handshake {
            sig,
            mut ack,
            mut err,
        } = self.start_with_close()?;

        loop {
            tokio::select! {
                Some(signal) = listener.recv() => {
                    self.bus.publish(
                        Event::new(EventKind::SignalReceived)
                            .with_job(self.job.name())
                            .with_signal(signal),
                    );
                    handshake::request_close(&sig, CloseReason::Signal(signal));
                }
                res = &mut ack => {
                    if res.is_err() {
                        return Err(self.supervisor_lost());
                    }
                    return match RuntimeError::collect(drain(&mut err, Vec::new())) {
                        Some(e) => Err(e),
                        None => Ok(()),
                    };
                }
                Some(first) = err.recv() => {
                    let errors = drain(&mut err, vec![first]);
                    return Err(RuntimeError::collect(errors).unwrap_or_else(|| self.supervisor_lost()));
                }
            }
        }
    }

    /// Requests close of the running lifecycle, as an OS signal would.
    ///
    /// Returns [`RuntimeError::NotStarted`] if the job was never started. A request
    /// made while another is pending, or after close began, is ignored.
    pub fn signal_to_close(&self) -> Result<(), RuntimeError> {
        let guard = self.lock_requests();
        let Some(sig) = guard.as_ref() else {
            return Err(RuntimeError::NotStarted {
                job: self.job.name().to_owned(),
            });
        };
        handshake::request_close(sig, CloseReason::Manual);
        Ok(())
    }

    fn supervisor_lost(&self) -> RuntimeError {
        RuntimeError::SupervisorLost {
            job: self.job.name().to_owned(),
        }
    }

    fn lock_requests(&self) -> std::sync::MutexGuard<'_, Option<mpsc::Sender<CloseReason>>> {
        self.requests.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Appends every error already queued on `rx` to `errors`.
fn drain(
    rx: &mut mpsc::UnboundedReceiver<RuntimeError>,
    mut errors: Vec<RuntimeError>,
) -> Vec<RuntimeError> {
    while let Ok(e) = rx.try_recv() {
        errors.push(e);
    }
    errors
}
