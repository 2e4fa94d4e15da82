//! The long-running progress listener.
//!
//! [`ProgressRelay`] pattern-subscribes to every job's progress channel and
//! forwards each event to that job's live subscribers through the
//! [`SubscriberHub`]. It also answers subscription requests, replaying the
//! stored result when a job finished before the client asked.

use super::{
    bus::{BusMessage, ProgressBus},
    hub::SubscriberHub,
    store::ResultStore,
};
use guessgen_core::{JobId, PROGRESS_CHANNEL_PATTERN, ProgressEvent, job_id_from_channel};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::{sync::broadcast, task::JoinHandle};
use tokio_util::sync::CancellationToken;

/// Outcome of a subscription request.
#[derive(Debug)]
pub enum Subscription {
    /// The job already completed; this event carries the stored result and
    /// nothing else will follow.
    Replayed(ProgressEvent),
    /// Future events for the job arrive on this receiver.
    Live(broadcast::Receiver<Arc<ProgressEvent>>),
}

pub struct ProgressRelay {
    bus: Arc<dyn ProgressBus>,
    store: Arc<dyn ResultStore>,
    hub: Arc<SubscriberHub>,
    shutdown_token: CancellationToken,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl ProgressRelay {
    pub fn new(
        bus: Arc<dyn ProgressBus>,
        store: Arc<dyn ResultStore>,
        hub: Arc<SubscriberHub>,
    ) -> Self {
        Self {
            bus,
            store,
            hub,
            shutdown_token: CancellationToken::new(),
            listener: Mutex::new(None),
        }
    }

    /// Subscribes to the progress namespace and spawns the listener loop.
    ///
    /// The subscription is in place when this returns, so events published
    /// afterwards are not missed. Calling `start` twice is a no-op.
    pub fn start(&self) {
        let mut listener = self.listener.lock();
        if listener.is_some() {
            return;
        }

        let mut subscription = self.bus.psubscribe(PROGRESS_CHANNEL_PATTERN);
        let hub = Arc::clone(&self.hub);
        let token = self.shutdown_token.clone();

        *listener = Some(tokio::spawn(async move {
            tracing::info!("Progress relay listening on {}", subscription.pattern());
            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    message = subscription.next() => match message {
                        Some(message) => forward(&hub, message),
                        None => {
                            tracing::warn!("Progress bus closed");
                            break;
                        }
                    },
                }
            }
            tracing::info!("Progress relay stopped");
        }));
    }

    /// Stops the listener loop and waits for it to exit.
    pub async fn stop(&self) {
        self.shutdown_token.cancel();
        let handle = self.listener.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!("Progress relay task failed: {e}");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.listener.lock().is_some() && !self.shutdown_token.is_cancelled()
    }

    /// Subscribes to `job_id`.
    ///
    /// The live receiver is registered before the result store is checked,
    /// so a job completing in between is seen one way or the other.
    pub fn subscribe(&self, job_id: JobId) -> Subscription {
        let receiver = self.hub.subscribe(job_id);

        match self.store.get(job_id) {
            Some(result) => {
                tracing::debug!("Replaying stored result for {job_id}");
                Subscription::Replayed(ProgressEvent::replay(job_id, result))
            }
            None => Subscription::Live(receiver),
        }
    }
}

fn forward(hub: &SubscriberHub, message: BusMessage) {
    let Some(job_id) = job_id_from_channel(&message.channel) else {
        tracing::trace!("Ignoring message on {}", message.channel);
        return;
    };

    let event = match serde_json::from_str::<ProgressEvent>(&message.payload) {
        Ok(event) if event.job_id == job_id => event,
        Ok(event) => {
            tracing::warn!(
                "Event for {} arrived on channel {}, dropping",
                event.job_id,
                message.channel
            );
            return;
        }
        Err(e) => {
            tracing::warn!("Malformed progress payload on {}: {e}", message.channel);
            return;
        }
    };

    let delivered = hub.deliver(event);
    tracing::trace!("Relayed event for {job_id} to {delivered} subscribers");
}
