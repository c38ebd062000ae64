//! Simple stateless pub-sub event handler
//!
//! Components subscribe to store events and react to them. The handlers have no access to the internal state of the
//! store; all they receive is the event itself. Handlers can be async, and every event is handled on its own task so
//! that a slow handler (e.g. an HTTP notification) never holds up the order flow.
use std::{future::Future, pin::Pin, sync::Arc};

use log::*;
use tokio::{sync::mpsc, task::JoinSet};

pub type Handler<E> = Arc<dyn Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

pub struct EventHandler<E: Send + Sync + 'static> {
    listener: mpsc::Receiver<E>,
    sender: mpsc::Sender<E>,
    handler: Handler<E>,
}

impl<E: Send + Sync + 'static> EventHandler<E> {
    pub fn new(buffer_size: usize, handler: Handler<E>) -> Self {
        let (sender, receiver) = mpsc::channel(buffer_size);
        Self { listener: receiver, sender, handler }
    }

    pub fn subscribe(&self) -> EventProducer<E> {
        EventProducer::new(self.sender.clone())
    }

    /// Runs until every producer has been dropped, then waits for in-flight handlers to finish.
    pub async fn start_handler(mut self) {
        debug!("📬️ Starting event handler");
        // drop the internal sender so that when the last subscriber is dropped, the handler shuts down
        drop(self.sender);
        let mut jobs = JoinSet::new();
        while let Some(ev) = self.listener.recv().await {
            trace!("📬️ Handling event");
            let handler = Arc::clone(&self.handler);
            jobs.spawn(async move {
                (handler)(ev).await;
                trace!("📬️ Event handled");
            });
            // Reap finished jobs so the set does not grow without bound on a long-running server
            while let Some(done) = jobs.try_join_next() {
                log_join_result(done);
            }
        }
        debug!("📬️ Waiting for {} outstanding jobs to complete", jobs.len());
        while let Some(done) = jobs.join_next().await {
            log_join_result(done);
        }
        debug!("📬️ Event handler has shut down");
    }
}

fn log_join_result(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        warn!("📬️ An event handler task failed: {e}");
    }
}

#[derive(Clone)]
pub struct EventProducer<E: Send + Sync> {
    sender: mpsc::Sender<E>,
}

impl<E: Send + Sync> EventProducer<E> {
    pub fn new(sender: mpsc::Sender<E>) -> Self {
        Self { sender }
    }

    /// Hands the event to the handler. Failure to deliver is logged and otherwise ignored.
    pub async fn publish_event(&self, event: E) {
        if let Err(e) = self.sender.send(event).await {
            error!("📬️ Failed to send event: {e}");
        }
    }
}
