//! Community event channel
//!
//! Committed mutations are published to a broadcast bus so callers can
//! subscribe to live updates instead of polling. Delivery is best
//! effort: core correctness never depends on it, and a lagging
//! subscriber misses events rather than blocking writers.

use serde::Serialize;
use tokio::sync::broadcast;

/// A committed change to the community tables.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CommunityEvent {
    PostCreated { post_id: i64 },
    PostDeleted { post_id: i64 },
    CommentCreated { post_id: i64, comment_id: i64 },
    CommentDeleted { comment_id: i64 },
    LikeToggled { post_id: i64, liked: bool },
}

/// Broadcast bus for community events.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CommunityEvent>,
}

impl EventBus {
    /// Create a bus buffering `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// Having no subscribers is not an error.
    pub fn publish(&self, event: CommunityEvent) {
        if let Ok(delivered) = self.sender.send(event) {
            tracing::debug!(delivered, "Community event published");
        }
    }

    /// Subscribe to events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<CommunityEvent> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_published_events() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(CommunityEvent::PostCreated { post_id: 1 });
        bus.publish(CommunityEvent::LikeToggled {
            post_id: 1,
            liked: true,
        });

        assert!(matches!(
            rx.recv().await.unwrap(),
            CommunityEvent::PostCreated { post_id: 1 }
        ));
        assert!(matches!(
            rx.recv().await.unwrap(),
            CommunityEvent::LikeToggled {
                post_id: 1,
                liked: true
            }
        ));
    }

    #[test]
    fn publish_without_subscribers_is_fine() {
        let bus = EventBus::new(16);
        bus.publish(CommunityEvent::PostDeleted { post_id: 7 });
        assert_eq!(bus.subscriber_count(), 0);
    }
}
