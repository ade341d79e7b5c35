//! Runtime core: handshake, control loop and signals.
//!
//! The public API from this module is [`Controller`] (with its builder and
//! config) plus the handshake types handed out by
//! [`Controller::start_with_close`].
//!
//! Internal modules:
//! - [`handshake`]: supervising task, run task, close with deadline;
//! - [`controller`]: validation, signal loop, manual trigger;
//! - [`shutdown`]: portable signal names and signal registration;
//! - [`config`]: signal set, close deadline, bus capacity;
//! - [`builder`]: wiring of subscribers to the event bus.

mod builder;
mod config;
mod controller;
mod handshake;
mod shutdown;

pub use builder::ControllerBuilder;
pub use config::Config;
pub use controller::Controller;
pub use handshake::{CloseReason, Handshake, request_close};
pub use shutdown::Signal;
