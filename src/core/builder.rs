use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;

use super::{config::Config, controller::Controller};
use crate::{
    events::Bus,
    jobs::JobRef,
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for constructing a [`Controller`] with subscribers.
pub struct ControllerBuilder {
    job: JobRef,
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl ControllerBuilder {
    /// Creates a new builder for `job` with the default configuration.
    pub fn new(job: JobRef) -> Self {
        Self {
            job,
            cfg: Config::default(),
            subscribers: Vec::new(),
        }
    }

    /// Sets the configuration.
    pub fn with_config(mut self, cfg: Config) -> Self {
        self.cfg = cfg;
        self
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive lifecycle events through dedicated workers with
    /// bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the controller.
    ///
    /// With subscribers configured, this spawns their workers and the bus
    /// listener, so it must then be called within a tokio runtime.
    pub fn build(self) -> Arc<Controller> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        if !self.subscribers.is_empty() {
            let subs = SubscriberSet::new(self.subscribers);
            subscriber_listener(&bus, subs);
        }
        Arc::new(Controller::new_internal(self.job, self.cfg, bus))
    }
}

/// Subscribes to the bus and forwards events to the subscriber set (fire-and-forget).
///
/// Ends once every bus sender is gone, then lets the workers drain their queues.
fn subscriber_listener(bus: &Bus, set: SubscriberSet) {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(ev) => set.emit(&ev),
                Err(RecvError::Lagged(n)) => {
                    eprintln!("[jobvisor] event listener lagged, skipped {n} events");
                }
                Err(RecvError::Closed) => break,
            }
        }
        set.shutdown().await;
    });
}
