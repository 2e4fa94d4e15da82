use super::registry::JobRegistry;
use crate::server::relay::bus::ProgressBus;
use guessgen_core::{ProgressEvent, progress_channel};
use std::sync::Arc;

/// Records lifecycle events in the registry and publishes them on the job's
/// progress channel.
///
/// An event the registry rejects (unknown job, or a transition out of a
/// terminal state) is dropped and not published.
#[derive(Clone)]
pub struct ProgressPublisher {
    bus: Arc<dyn ProgressBus>,
    registry: Arc<JobRegistry>,
}

impl ProgressPublisher {
    pub fn new(bus: Arc<dyn ProgressBus>, registry: Arc<JobRegistry>) -> Self {
        Self { bus, registry }
    }

    pub fn publish(&self, event: ProgressEvent) {
        if !self.registry.apply(&event) {
            tracing::warn!(
                "Dropping {} event for job {}: transition not allowed",
                event.status,
                event.job_id
            );
            return;
        }

        match serde_json::to_string(&event) {
            Ok(payload) => {
                let listeners = self.bus.publish(&progress_channel(event.job_id), payload);
                tracing::debug!(
                    status = %event.status,
                    progress = event.progress,
                    listeners,
                    "Published progress"
                );
            }
            Err(e) => tracing::error!("Failed to serialize progress event: {e}"),
        }
    }
}
