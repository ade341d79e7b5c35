use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use jobvisor::{
    Config, Controller, Event, EventKind, JobError, JobFn, RuntimeError, Signal, Subscribe,
};

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<Event>>,
}

impl Recorder {
    fn kinds(&self) -> Vec<EventKind> {
        self.events.lock().unwrap().iter().map(|e| e.kind).collect()
    }
}

#[async_trait]
impl Subscribe for Recorder {
    async fn on_event(&self, event: &Event) {
        self.events.lock().unwrap().push(event.clone());
    }

    fn name(&self) -> &'static str {
        "recorder"
    }
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}

async fn close_when_started(ctl: &Controller) {
    while let Err(RuntimeError::NotStarted { .. }) = ctl.signal_to_close() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test]
async fn clean_shutdown_is_observed() {
    let rec = Arc::new(Recorder::default());
    let job = JobFn::new("quick")
        .with_run(|| async { Ok(()) })
        .with_close(|_ctx| async { Ok(()) })
        .arc();
    let ctl = Controller::builder(job)
        .with_config(Config::default().with_signals([Signal::Quit]))
        .with_subscribers(vec![rec.clone() as Arc<dyn Subscribe>])
        .build();

    let exec = tokio::spawn({
        let ctl = Arc::clone(&ctl);
        async move { ctl.execute().await }
    });
    close_when_started(&ctl).await;
    exec.await.unwrap().unwrap();
    settle().await;

    let kinds = rec.kinds();
    assert_eq!(kinds.first(), Some(&EventKind::JobStarting));
    assert!(kinds.contains(&EventKind::RunStopped));
    let requested = kinds
        .iter()
        .position(|k| *k == EventKind::CloseRequested)
        .expect("close requested");
    let acked = kinds
        .iter()
        .position(|k| *k == EventKind::CloseAcknowledged)
        .expect("close acknowledged");
    assert!(requested < acked);

    let events = rec.events.lock().unwrap();
    let req = &events[requested];
    assert_eq!(req.job.as_deref(), Some("quick"));
    assert_eq!(req.reason.as_deref(), Some("manual"));
    assert_eq!(req.signal, None);
}

#[tokio::test]
async fn run_failure_is_observed() {
    let rec = Arc::new(Recorder::default());
    let job = JobFn::new("broken")
        .with_run(|| async { Err(JobError::fail("bind: address in use")) })
        .with_close(|_ctx| async { Ok(()) })
        .arc();
    let ctl = Controller::builder(job)
        .with_config(Config::default().with_signals([Signal::Quit]))
        .with_subscribers(vec![rec.clone() as Arc<dyn Subscribe>])
        .build();

    let err = ctl.execute().await.unwrap_err();
    assert_eq!(err.as_label(), "runtime_run_failed");
    settle().await;

    let events = rec.events.lock().unwrap();
    let failed = events
        .iter()
        .find(|e| e.kind == EventKind::RunFailed)
        .expect("run failure event");
    assert_eq!(
        failed.reason.as_deref(),
        Some("execution failed: bind: address in use")
    );
    assert!(!events.iter().any(|e| e.kind == EventKind::CloseRequested));
}
