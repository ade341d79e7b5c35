//! # Controller configuration.
//!
//! Provides [`Config`], the settings a [`Controller`](crate::Controller) resolves
//! when a job is started. The stored value is never mutated by the controller;
//! defaults are applied through the accessors below.
//!
//! ## Sentinel values
//! - `signals = []` → [`Signal::DEFAULTS`] (`SIGINT`, `SIGTERM`)
//! - `close_timeout = 0s` → close runs without a deadline

use std::time::Duration;

use super::shutdown::Signal;

/// Configuration for one controller.
///
/// ## Field semantics
/// - `signals`: OS signals that trigger close (`[]` = defaults)
/// - `close_timeout`: Upper bound for the close operation (`0s` = unbounded)
/// - `bus_capacity`: Event bus ring buffer size (min 1; clamped by Bus)
#[derive(Clone, Debug)]
pub struct Config {
    /// Signals that trigger close in [`Controller::execute`](crate::Controller::execute).
    pub signals: Vec<Signal>,

    /// Maximum time the close operation may take.
    ///
    /// When exceeded, the token passed to `close` is cancelled and `close` gets a
    /// short grace period to return before its future is dropped. Either way
    /// `RuntimeError::CloseTimeout` is reported.
    pub close_timeout: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    pub bus_capacity: usize,
}

impl Config {
    /// Returns the signal set to register: the configured one without
    /// duplicates, or [`Signal::DEFAULTS`] when none are configured.
    pub fn resolved_signals(&self) -> Vec<Signal> {
        if self.signals.is_empty() {
            return Signal::DEFAULTS.to_vec();
        }
        let mut out = Vec::with_capacity(self.signals.len());
        for sig in &self.signals {
            if !out.contains(sig) {
                out.push(*sig);
            }
        }
        out
    }

    /// Returns the close deadline as an `Option`.
    #[inline]
    pub fn close_deadline(&self) -> Option<Duration> {
        if self.close_timeout == Duration::ZERO {
            None
        } else {
            Some(self.close_timeout)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Returns a copy listening on `signals` instead.
    pub fn with_signals(mut self, signals: impl IntoIterator<Item = Signal>) -> Self {
        self.signals = signals.into_iter().collect();
        self
    }

    /// Returns a copy with the given close deadline.
    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `signals = []` (SIGINT + SIGTERM)
    /// - `close_timeout = 0s` (no deadline)
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            signals: Vec::new(),
            close_timeout: Duration::ZERO,
            bus_capacity: 1024,
        }
    }
}
