use guessgen_core::{JobId, ProgressEvent};
use parking_lot::Mutex;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::broadcast;

/// Per-job fan-out of progress events to live subscribers.
///
/// Each job with at least one subscriber has its own broadcast channel.
/// Delivery never waits: a subscriber that falls more than `capacity` events
/// behind loses the oldest ones. After a terminal event the job's channel is
/// dropped, so receivers see the event followed by end-of-stream.
pub struct SubscriberHub {
    rooms: Mutex<HashMap<JobId, broadcast::Sender<Arc<ProgressEvent>>>>,
    capacity: usize,
}

impl SubscriberHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Registers a receiver for `job_id`'s future events.
    pub fn subscribe(&self, job_id: JobId) -> broadcast::Receiver<Arc<ProgressEvent>> {
        self.rooms
            .lock()
            .entry(job_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Hands `event` to its job's subscribers and returns how many there
    /// were.
    pub fn deliver(&self, event: ProgressEvent) -> usize {
        let job_id = event.job_id;
        let terminal = event.is_terminal();
        let mut rooms = self.rooms.lock();

        let delivered = rooms
            .get(&job_id)
            .map_or(0, |room| room.send(Arc::new(event)).unwrap_or(0));

        if terminal {
            rooms.remove(&job_id);
        }
        delivered
    }

    /// Drops channels nobody listens to any more. Returns how many were
    /// dropped.
    pub fn prune_idle(&self) -> usize {
        let mut rooms = self.rooms.lock();
        let before = rooms.len();
        rooms.retain(|_, room| room.receiver_count() > 0);
        before - rooms.len()
    }

    #[cfg(test)]
    fn active_rooms(&self) -> usize {
        self.rooms.lock().len()
    }
}
