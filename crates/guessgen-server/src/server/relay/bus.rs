//! Channel-addressed publish/subscribe.
//!
//! Producers publish a serialized payload on a named channel; consumers
//! subscribe with a prefix pattern (`task_progress:*`) and receive every
//! message whose channel matches. Delivery is fire-and-forget: messages
//! published while nobody listens are dropped, and a consumer that falls too
//! far behind loses the oldest messages instead of stalling producers.

use futures::stream::{BoxStream, StreamExt};
use tokio::sync::broadcast;
use tokio_stream::wrappers::{BroadcastStream, errors::BroadcastStreamRecvError};

/// One message as seen by a pattern subscriber.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BusMessage {
    pub channel: String,
    pub payload: String,
}

/// Stream of messages matching a subscription pattern.
pub struct PatternSubscription {
    pattern: String,
    messages: BoxStream<'static, BusMessage>,
}

impl PatternSubscription {
    pub fn new(pattern: impl Into<String>, messages: BoxStream<'static, BusMessage>) -> Self {
        Self {
            pattern: pattern.into(),
            messages,
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Waits for the next matching message; `None` once the bus is gone.
    pub async fn next(&mut self) -> Option<BusMessage> {
        self.messages.next().await
    }
}

/// A pub/sub substrate keyed by channel name.
pub trait ProgressBus: Send + Sync {
    /// Publishes `payload` on `channel` and returns how many subscribers
    /// were listening.
    fn publish(&self, channel: &str, payload: String) -> usize;

    /// Subscribes to every channel matching `pattern`.
    fn psubscribe(&self, pattern: &str) -> PatternSubscription;
}

/// In-process [`ProgressBus`] over a Tokio broadcast channel.
#[derive(Clone)]
pub struct MemoryBus {
    tx: broadcast::Sender<BusMessage>,
}

impl MemoryBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }
}

impl ProgressBus for MemoryBus {
    fn publish(&self, channel: &str, payload: String) -> usize {
        let message = BusMessage {
            channel: channel.to_string(),
            payload,
        };
        // An error only means there are no subscribers.
        self.tx.send(message).unwrap_or(0)
    }

    fn psubscribe(&self, pattern: &str) -> PatternSubscription {
        let owned = pattern.to_string();
        let messages = BroadcastStream::new(self.tx.subscribe())
            .filter_map(move |received| {
                let matched = match received {
                    Ok(message) => channel_matches(&owned, &message.channel).then_some(message),
                    Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                        tracing::warn!("Pattern subscriber {owned:?} lagged, {skipped} messages dropped");
                        None
                    }
                };
                futures::future::ready(matched)
            })
            .boxed();

        PatternSubscription::new(pattern, messages)
    }
}

/// Whether `channel` matches `pattern`. A trailing `*` matches any suffix;
/// otherwise the names must be equal.
pub fn channel_matches(pattern: &str, channel: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => channel.starts_with(prefix),
        None => pattern == channel,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::time::Duration;
    use tokio::time::timeout;

    #[test]
    fn prefix_patterns() {
        assert!(channel_matches("task_progress:*", "task_progress:abc"));
        assert!(channel_matches("task_progress:*", "task_progress:"));
        assert!(!channel_matches("task_progress:*", "task_result:abc"));
        assert!(channel_matches("*", "anything"));
        assert!(channel_matches("exact", "exact"));
        assert!(!channel_matches("exact", "exactly"));
    }

    #[tokio::test]
    async fn pattern_subscriber_sees_only_matching_channels() {
        let bus = MemoryBus::new(16);
        let mut sub = bus.psubscribe("task_progress:*");
        assert_eq!(sub.pattern(), "task_progress:*");

        assert_eq!(bus.publish("other:1", "x".to_string()), 1);
        bus.publish("task_progress:1", "y".to_string());

        let message = timeout(Duration::from_secs(1), sub.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            message,
            BusMessage {
                channel: "task_progress:1".to_string(),
                payload: "y".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_dropped() {
        let bus = MemoryBus::new(4);
        assert_eq!(bus.publish("task_progress:1", "lost".to_string()), 0);
    }

    #[tokio::test]
    async fn lagging_subscriber_skips_instead_of_blocking() {
        let bus = MemoryBus::new(2);
        let mut sub = bus.psubscribe("*");

        for i in 0..5 {
            bus.publish("c", i.to_string());
        }

        let first = sub.next().await.unwrap();
        assert_eq!(first.payload, "3");
        assert_eq!(sub.next().await.unwrap().payload, "4");
    }
}
