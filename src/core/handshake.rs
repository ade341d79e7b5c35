//! # Start/close handshake for one job lifecycle.
//!
//! [`spawn`] starts the supervising task and hands back the three channels that
//! coordinate it with the caller.
//!
//! ## Flow
//! ```text
//! spawn(job)
//!   └─► supervising task
//!         ├─► publish JobStarting
//!         ├─► tokio::spawn(run task) ──► job.run()
//!         │                                ├─ Ok  ─► publish RunStopped
//!         │                                └─ Err ─► publish RunFailed, err ◄── RuntimeError::Run
//!         ├─► sig.recv()          (one request, then the receiver is dropped)
//!         ├─► publish CloseRequested
//!         ├─► job.close(token)    (bounded by the deadline, if any)
//!         │     ├─ Err     ─► publish CloseFailed,     err ◄── RuntimeError::Close
//!         │     └─ elapsed ─► token.cancel(), grace for close to return,
//!         │                   publish CloseTimeoutHit, err ◄── RuntimeError::CloseTimeout
//!         ├─► publish CloseAcknowledged
//!         └─► ack.send(())
//! ```
//!
//! ## Rules
//! - Run starts before the request wait begins.
//! - Close starts only after a request was observed, and runs at most once.
//! - Any close error is queued **before** the acknowledgement is sent.
//! - If every request sender is dropped before a request arrives, the supervising
//!   task exits without closing and without acknowledging.
//! - Panics in `run`/`close` are caught and reported as [`JobError::Fatal`].

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::{mpsc, oneshot};
use tokio::time;
use tokio_util::sync::CancellationToken;

use super::shutdown::Signal;
use crate::{
    error::{JobError, RuntimeError},
    events::{Bus, Event, EventKind},
    jobs::JobRef,
};

/// Who asked for close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// A registered OS signal was delivered.
    Signal(Signal),
    /// [`Controller::signal_to_close`](crate::Controller::signal_to_close) or a
    /// holder of [`Handshake::sig`].
    Manual,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::Signal(sig) => write!(f, "signal {sig}"),
            CloseReason::Manual => f.write_str("manual"),
        }
    }
}

/// Communication handles of one started lifecycle.
#[derive(Debug)]
pub struct Handshake {
    /// Close request slot (capacity 1). Use [`request_close`] to write without blocking.
    pub sig: mpsc::Sender<CloseReason>,
    /// Resolves once close has finished, whatever its outcome.
    pub ack: oneshot::Receiver<()>,
    /// Run and close failures, in arrival order. Zero, one or more messages.
    pub err: mpsc::UnboundedReceiver<RuntimeError>,
}

/// Queues a close request without blocking.
///
/// Returns `false` when a request is already pending or close is already under
/// way; both mean the request is redundant.
pub fn request_close(sig: &mpsc::Sender<CloseReason>, reason: CloseReason) -> bool {
    sig.try_send(reason).is_ok()
}

/// Spawns the supervising task for `job` and returns its handles.
///
/// Must be called within a tokio runtime.
pub(crate) fn spawn(job: JobRef, close_deadline: Option<Duration>, bus: Bus) -> Handshake {
    let (sig_tx, sig_rx) = mpsc::channel::<CloseReason>(1);
    let (ack_tx, ack_rx) = oneshot::channel::<()>();
    let (err_tx, err_rx) = mpsc::unbounded_channel::<RuntimeError>();

    tokio::spawn(supervise(job, close_deadline, bus, sig_rx, ack_tx, err_tx));

    Handshake {
        sig: sig_tx,
        ack: ack_rx,
        err: err_rx,
    }
}

async fn supervise(
    job: JobRef,
    close_deadline: Option<Duration>,
    bus: Bus,
    mut sig: mpsc::Receiver<CloseReason>,
    ack: oneshot::Sender<()>,
    err: mpsc::UnboundedSender<RuntimeError>,
) {
    bus.publish(Event::new(EventKind::JobStarting).with_job(job.name()));
    tokio::spawn(run_job(Arc::clone(&job), bus.clone(), err.clone()));

    let Some(reason) = sig.recv().await else {
        return;
    };
    drop(sig);

    let mut requested = Event::new(EventKind::CloseRequested)
        .with_job(job.name())
        .with_reason(reason.to_string());
    if let CloseReason::Signal(s) = reason {
        requested = requested.with_signal(s);
    }
    bus.publish(requested);

    if let Err(e) = close_job(&job, close_deadline, &bus).await {
        let _ = err.send(e);
    }

    bus.publish(Event::new(EventKind::CloseAcknowledged).with_job(job.name()));
    let _ = ack.send(());
}

/// Runs the job to completion and reports its outcome.
async fn run_job(job: JobRef, bus: Bus, err: mpsc::UnboundedSender<RuntimeError>) {
    match guarded(job.run()).await {
        Ok(()) => bus.publish(Event::new(EventKind::RunStopped).with_job(job.name())),
        Err(e) => {
            bus.publish(
                Event::new(EventKind::RunFailed)
                    .with_job(job.name())
                    .with_reason(e.to_string()),
            );
            let _ = err.send(RuntimeError::Run {
                job: job.name().to_owned(),
                source: e,
            });
        }
    }
}

/// Time `close` may keep running after its token was cancelled.
const CANCEL_GRACE: Duration = Duration::from_millis(250);

/// Invokes close once, bounded by `deadline` when set.
///
/// When the deadline passes, the token is cancelled while the close future is
/// still alive, so `close` can observe it. The future is dropped after
/// [`CANCEL_GRACE`]; either way the outcome is `CloseTimeout`.
async fn close_job(
    job: &JobRef,
    deadline: Option<Duration>,
    bus: &Bus,
) -> Result<(), RuntimeError> {
    let ctx = CancellationToken::new();
    let mut fut = std::pin::pin!(guarded(job.close(ctx.clone())));

    let res = match deadline {
        Some(dur) => tokio::select! {
            r = &mut fut => r,
            _ = time::sleep(dur) => {
                ctx.cancel();
                let _ = time::timeout(CANCEL_GRACE, &mut fut).await;
                bus.publish(
                    Event::new(EventKind::CloseTimeoutHit)
                        .with_job(job.name())
                        .with_timeout(dur),
                );
                return Err(RuntimeError::CloseTimeout {
                    job: job.name().to_owned(),
                    timeout: dur,
                });
            }
        },
        None => fut.await,
    };

    res.map_err(|e| {
        bus.publish(
            Event::new(EventKind::CloseFailed)
                .with_job(job.name())
                .with_reason(e.to_string()),
        );
        RuntimeError::Close {
            job: job.name().to_owned(),
            source: e,
        }
    })
}

/// Awaits a job operation, turning a panic into [`JobError::Fatal`].
async fn guarded<F>(fut: F) -> Result<(), JobError>
where
    F: Future<Output = Result<(), JobError>>,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(res) => res,
        Err(panic) => Err(JobError::Fatal {
            error: format!("panicked: {}", panic_message(panic.as_ref())),
        }),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::JobFn;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_job(closes: Arc<AtomicUsize>) -> JobRef {
        JobFn::new("counting")
            .with_run(|| async { Ok(()) })
            .with_close(move |_ctx| {
                let closes = Arc::clone(&closes);
                async move {
                    closes.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .arc()
    }

    #[tokio::test]
    async fn test_request_then_ack() {
        let closes = Arc::new(AtomicUsize::new(0));
        let mut hs = spawn(counting_job(Arc::clone(&closes)), None, Bus::new(8));

        assert!(request_close(&hs.sig, CloseReason::Manual));
        hs.ack.await.unwrap();
        assert_eq!(closes.load(Ordering::SeqCst), 1);
        assert!(hs.err.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_second_request_is_redundant() {
        let closes = Arc::new(AtomicUsize::new(0));
        let hs = spawn(counting_job(Arc::clone(&closes)), None, Bus::new(8));

        assert!(request_close(&hs.sig, CloseReason::Manual));
        // slot still holds the first request, or the receiver is already gone
        assert!(!request_close(&hs.sig, CloseReason::Signal(Signal::Interrupt)));
        hs.ack.await.unwrap();
        assert!(!request_close(&hs.sig, CloseReason::Manual));
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_close_error_queued_before_ack() {
        let job = JobFn::new("bad-close")
            .with_run(|| async { Ok(()) })
            .with_close(|_ctx| async { Err(JobError::fail("teardown")) })
            .arc();
        let mut hs = spawn(job, None, Bus::new(8));

        request_close(&hs.sig, CloseReason::Manual);
        hs.ack.await.unwrap();
        let err = hs.err.try_recv().unwrap();
        assert!(matches!(err, RuntimeError::Close { .. }));
    }

    #[tokio::test]
    async fn test_run_panic_is_reported() {
        let job = JobFn::new("panicky")
            .with_run(|| async {
                if true {
                    panic!("kaboom");
                }
                Ok(())
            })
            .with_close(|_ctx| async { Ok(()) })
            .arc();
        let mut hs = spawn(job, None, Bus::new(8));

        let err = hs.err.recv().await.unwrap();
        let RuntimeError::Run {
            source: JobError::Fatal { error },
            ..
        } = err
        else {
            panic!("expected fatal run error");
        };
        assert_eq!(error, "panicked: kaboom");
    }

    #[tokio::test]
    async fn test_close_observes_deadline_cancellation() {
        let seen = Arc::new(AtomicUsize::new(0));
        let flag = Arc::clone(&seen);
        let job = JobFn::new("watching-close")
            .with_run(|| async { Ok(()) })
            .with_close(move |ctx: CancellationToken| {
                let flag = Arc::clone(&flag);
                async move {
                    ctx.cancelled().await;
                    flag.fetch_add(1, Ordering::SeqCst);
                    Err(JobError::Canceled)
                }
            })
            .arc();
        let mut hs = spawn(job, Some(Duration::from_millis(50)), Bus::new(8));

        request_close(&hs.sig, CloseReason::Manual);
        hs.ack.await.unwrap();
        let err = hs.err.try_recv().unwrap();
        assert!(matches!(err, RuntimeError::CloseTimeout { .. }), "got {err:?}");
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_close_ignoring_token_is_dropped_after_grace() {
        let job = JobFn::new("stuck-close")
            .with_run(|| async { Ok(()) })
            .with_close(|_ctx| std::future::pending())
            .arc();
        let mut hs = spawn(job, Some(Duration::from_millis(50)), Bus::new(8));

        let started = std::time::Instant::now();
        request_close(&hs.sig, CloseReason::Manual);
        hs.ack.await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(50) + CANCEL_GRACE);
        assert!(matches!(
            hs.err.try_recv().unwrap(),
            RuntimeError::CloseTimeout { .. }
        ));
    }

    #[tokio::test]
    async fn test_dropped_senders_skip_close() {
        let closes = Arc::new(AtomicUsize::new(0));
        let hs = spawn(counting_job(Arc::clone(&closes)), None, Bus::new(8));
        let Handshake { sig, ack, .. } = hs;
        drop(sig);

        assert!(ack.await.is_err());
        assert_eq!(closes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_events_in_lifecycle_order() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let closes = Arc::new(AtomicUsize::new(0));
        let hs = spawn(counting_job(closes), None, bus);

        request_close(&hs.sig, CloseReason::Signal(Signal::Terminate));
        hs.ack.await.unwrap();

        let mut kinds = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            if ev.kind == EventKind::CloseRequested {
                assert_eq!(ev.signal, Some(Signal::Terminate));
                assert_eq!(ev.reason.as_deref(), Some("signal SIGTERM"));
            }
            kinds.push(ev.kind);
        }
        let pos = |k| kinds.iter().position(|x| *x == k).unwrap();
        assert_eq!(pos(EventKind::JobStarting), 0);
        assert!(pos(EventKind::CloseRequested) < pos(EventKind::CloseAcknowledged));
    }
}
