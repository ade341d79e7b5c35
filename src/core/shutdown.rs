//! # Cross-platform OS signal handling.
//!
//! Provides [`Signal`], the portable name of a termination signal, and
//! [`SignalListener`], which registers a set of signals once and then yields
//! every delivery of any of them.
//!
//! ## Signals
//! **Unix platforms:** every [`Signal`] variant maps to its `SIG*` counterpart.
//!
//! **Windows platforms:** only [`Signal::Interrupt`] (Ctrl-C via
//! [`tokio::signal::ctrl_c`]) is delivered; other variants never fire.

use std::fmt;

/// Termination signal the controller can listen for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// `SIGINT` (Ctrl-C in terminal).
    Interrupt,
    /// `SIGTERM` (default kill signal, used by systemd/Kubernetes).
    Terminate,
    /// `SIGQUIT`.
    Quit,
    /// `SIGHUP`.
    Hangup,
    /// `SIGUSR1`.
    User1,
    /// `SIGUSR2`.
    User2,
}

impl Signal {
    /// Signals used when none are configured.
    pub const DEFAULTS: [Signal; 2] = [Signal::Interrupt, Signal::Terminate];

    /// Conventional `SIG*` name.
    pub fn as_str(self) -> &'static str {
        match self {
            Signal::Interrupt => "SIGINT",
            Signal::Terminate => "SIGTERM",
            Signal::Quit => "SIGQUIT",
            Signal::Hangup => "SIGHUP",
            Signal::User1 => "SIGUSR1",
            Signal::User2 => "SIGUSR2",
        }
    }

    #[cfg(unix)]
    fn kind(self) -> tokio::signal::unix::SignalKind {
        use tokio::signal::unix::SignalKind;

        match self {
            Signal::Interrupt => SignalKind::interrupt(),
            Signal::Terminate => SignalKind::terminate(),
            Signal::Quit => SignalKind::quit(),
            Signal::Hangup => SignalKind::hangup(),
            Signal::User1 => SignalKind::user_defined1(),
            Signal::User2 => SignalKind::user_defined2(),
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registered set of signal streams.
///
/// Registration happens in [`SignalListener::register`]; from then on the
/// process no longer runs the default action for these signals.
#[cfg(unix)]
pub(crate) struct SignalListener {
    streams: Vec<(Signal, tokio::signal::unix::Signal)>,
}

#[cfg(unix)]
impl SignalListener {
    /// Installs handlers for every signal in `signals`.
    pub(crate) fn register(signals: &[Signal]) -> std::io::Result<Self> {
        let streams = signals
            .iter()
            .map(|&sig| tokio::signal::unix::signal(sig.kind()).map(|s| (sig, s)))
            .collect::<std::io::Result<Vec<_>>>()?;
        Ok(Self { streams })
    }

    /// Waits for the next delivery of any registered signal.
    ///
    /// Cancel safe. Returns `None` only if the runtime's signal driver is gone.
    pub(crate) async fn recv(&mut self) -> Option<Signal> {
        if self.streams.is_empty() {
            return std::future::pending().await;
        }
        let waits = self.streams.iter_mut().map(|(sig, stream)| {
            let sig = *sig;
            Box::pin(async move { stream.recv().await.map(|()| sig) })
        });
        let (got, _idx, _rest) = futures::future::select_all(waits).await;
        got
    }
}

/// Registered set of signal streams.
#[cfg(not(unix))]
pub(crate) struct SignalListener {
    interrupt: bool,
}

#[cfg(not(unix))]
impl SignalListener {
    /// Only Ctrl-C can be observed; other kinds are accepted and never fire.
    pub(crate) fn register(signals: &[Signal]) -> std::io::Result<Self> {
        Ok(Self {
            interrupt: signals.contains(&Signal::Interrupt),
        })
    }

    /// Waits for the next Ctrl-C.
    pub(crate) async fn recv(&mut self) -> Option<Signal> {
        if !self.interrupt {
            return std::future::pending().await;
        }
        tokio::signal::ctrl_c().await.ok().map(|()| Signal::Interrupt)
    }
}
