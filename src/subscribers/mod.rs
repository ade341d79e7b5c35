//! # Event subscribers.
//!
//! This module provides the [`Subscribe`] trait and the [`SubscriberSet`] fan-out
//! used to observe lifecycle events broadcast through the [`Bus`](crate::Bus).
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   handshake / execute ── publish(Event) ──► Bus ──► listener ──► SubscriberSet::emit(&Event)
//!                                                                   ┌──────────┼──────────┐
//!                                                                   ▼          ▼          ▼
//!                                                               LogWriter   Metrics    Custom
//! ```
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use jobvisor::{Event, EventKind, Subscribe};
//! use async_trait::async_trait;
//!
//! struct Alerts;
//!
//! #[async_trait]
//! impl Subscribe for Alerts {
//!     async fn on_event(&self, event: &Event) {
//!         if matches!(event.kind, EventKind::RunFailed | EventKind::CloseFailed) {
//!             // page someone
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "alerts" }
//! }
//! ```

mod set;
mod subscriber;

pub use set::SubscriberSet;
pub use subscriber::Subscribe;

#[cfg(feature = "logging")]
mod log;
#[cfg(feature = "logging")]
pub use log::LogWriter;
