/// In-process feed event queue
///
/// Request handlers publish into a bounded MPSC channel and return
/// immediately. A dispatcher task drains the channel and runs every event on
/// its own task:
/// - at most `workers` handlers run at once (semaphore permits)
/// - each handler runs under `handler_timeout`; late handlers are aborted
/// - failures, timeouts and panics are logged and counted, never retried
///
/// When every publisher is dropped the dispatcher finishes the in-flight
/// handlers and exits.
use crate::config::EventConfig;
use crate::metrics;
use crate::services::FeedFanoutWriter;
use event_schema::{EventEnvelope, FeedEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

const EVENT_SOURCE: &str = "feed-service";

/// Receiving half handed to the dispatcher
pub type FeedEventReceiver = mpsc::Receiver<EventEnvelope<FeedEvent>>;

/// Something that reacts to feed events
#[async_trait::async_trait]
pub trait FeedEventHandler: Send + Sync + 'static {
    async fn handle(&self, event: &FeedEvent);
}

#[async_trait::async_trait]
impl FeedEventHandler for FeedFanoutWriter {
    async fn handle(&self, event: &FeedEvent) {
        FeedFanoutWriter::handle(self, event).await
    }
}

/// Sending half shared by request handlers
#[derive(Clone)]
pub struct FeedEventPublisher {
    sender: mpsc::Sender<EventEnvelope<FeedEvent>>,
}

impl FeedEventPublisher {
    /// Enqueue an event without waiting. A full or closed queue drops it.
    pub fn publish(&self, event: impl Into<FeedEvent>) {
        let envelope = EventEnvelope::new(EVENT_SOURCE, event.into());
        let kind = envelope.data.kind();
        let post_id = envelope.data.post_id();
        let event_id = envelope.event_id;

        match self.sender.try_send(envelope) {
            Ok(()) => {
                debug!(kind, post_id = %post_id, event_id = %event_id, "Feed event queued");
            }
            Err(TrySendError::Full(_)) => {
                metrics::record_dropped_event(kind, "queue_full");
                warn!(kind, post_id = %post_id, event_id = %event_id, "Feed event queue full, dropping event");
            }
            Err(TrySendError::Closed(_)) => {
                metrics::record_dropped_event(kind, "closed");
                warn!(kind, post_id = %post_id, event_id = %event_id, "Feed event queue closed, dropping event");
            }
        }
    }
}

/// Create a bounded feed event queue
pub fn feed_event_queue(capacity: usize) -> (FeedEventPublisher, FeedEventReceiver) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    (FeedEventPublisher { sender }, receiver)
}

/// Spawn the dispatcher that drains `receiver` into `handler`
pub fn spawn_feed_event_workers<H: FeedEventHandler>(
    handler: Arc<H>,
    mut receiver: FeedEventReceiver,
    config: &EventConfig,
) -> tokio::task::JoinHandle<()> {
    let workers = config.workers.max(1);
    let handler_timeout = config.handler_timeout();
    let permits = Arc::new(Semaphore::new(workers));

    tokio::spawn(async move {
        info!(workers, timeout_ms = handler_timeout.as_millis() as u64, "Feed event dispatcher started");

        while let Some(envelope) = receiver.recv().await {
            let permit = match Arc::clone(&permits).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            let handler = Arc::clone(&handler);

            tokio::spawn(async move {
                let _permit = permit;
                run_handler(handler, envelope, handler_timeout).await;
            });
        }

        // wait for in-flight handlers before reporting shutdown
        let _drained = permits.acquire_many(workers as u32).await;
        info!("Feed event dispatcher stopped (channel closed)");
    })
}

async fn run_handler<H: FeedEventHandler>(
    handler: Arc<H>,
    envelope: EventEnvelope<FeedEvent>,
    handler_timeout: Duration,
) {
    let kind = envelope.data.kind();
    let post_id = envelope.data.post_id();
    let event_id = envelope.event_id;

    let task = tokio::spawn(async move { handler.handle(&envelope.data).await });
    let abort = task.abort_handle();

    match tokio::time::timeout(handler_timeout, task).await {
        Ok(Ok(())) => {}
        Ok(Err(join_err)) if join_err.is_panic() => {
            metrics::record_event(kind, "panicked");
            error!(kind, post_id = %post_id, event_id = %event_id, "Feed event handler panicked");
        }
        Ok(Err(join_err)) => {
            warn!(kind, post_id = %post_id, event_id = %event_id, error = %join_err, "Feed event handler cancelled");
        }
        Err(_) => {
            abort.abort();
            metrics::record_event(kind, "timeout");
            warn!(
                kind,
                post_id = %post_id,
                event_id = %event_id,
                timeout_ms = handler_timeout.as_millis() as u64,
                "Feed event handler timed out"
            );
        }
    }
}
