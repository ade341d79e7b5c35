//! # LogWriter: simple event printer
//!
//! A minimal subscriber that prints incoming [`Event`]s to stdout.
//! Use it for tests or demos.
//!
//! ## Example output
//! ```text
//! [starting] job="http"
//! [signal] job="http" signal=SIGINT
//! [close-requested] job="http" by="signal SIGINT"
//! [close-failed] job="http" err="execution failed: shutdown refused"
//! [close-timeout] job="http" timeout_ms=5000
//! [acknowledged] job="http"
//! [run-stopped] job="http"
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

/// Renders an event as one log line.
fn render(e: &Event) -> String {
    let job = e.job.as_deref().unwrap_or("unknown");
    match e.kind {
        EventKind::JobStarting => format!("[starting] job={job:?}"),
        EventKind::RunStopped => format!("[run-stopped] job={job:?}"),
        EventKind::RunFailed => format!("[run-failed] job={job:?} err={:?}", e.reason),
        EventKind::SignalReceived => match e.signal {
            Some(sig) => format!("[signal] job={job:?} signal={sig}"),
            None => format!("[signal] job={job:?}"),
        },
        EventKind::CloseRequested => {
            format!(
                "[close-requested] job={job:?} by={:?}",
                e.reason.as_deref().unwrap_or("unknown")
            )
        }
        EventKind::CloseFailed => format!("[close-failed] job={job:?} err={:?}", e.reason),
        EventKind::CloseTimeoutHit => {
            format!("[close-timeout] job={job:?} timeout_ms={:?}", e.timeout_ms)
        }
        EventKind::CloseAcknowledged => format!("[acknowledged] job={job:?}"),
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        println!("{}", render(e));
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
