//! Event publisher service.
//!
//! Provides an abstraction for publishing real-time events to connected
//! clients. Broadcasts are fire-and-forget count/state accelerators and are
//! never required for correctness.

use async_trait::async_trait;
use koinonia_common::AppResult;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Trait for publishing real-time events.
///
/// This allows the core services to publish events without directly
/// depending on the broadcast implementation.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a live attending-count update for an event.
    async fn publish_rsvp_count(&self, event_id: &str, attending_count: u64) -> AppResult<()>;

    /// Publish a followed event (follow counts changed).
    async fn publish_followed(&self, follower_id: &str, followee_id: &str) -> AppResult<()>;

    /// Publish an unfollowed event (follow counts changed).
    async fn publish_unfollowed(&self, follower_id: &str, followee_id: &str) -> AppResult<()>;

    /// Publish a new-notification event to the recipient.
    async fn publish_notification(
        &self,
        id: &str,
        user_id: &str,
        category: &str,
        actor_id: Option<&str>,
    ) -> AppResult<()>;

    /// Publish an event-canceled broadcast.
    async fn publish_event_canceled(&self, event_id: &str) -> AppResult<()>;
}

/// A no-op implementation of `EventPublisher` for testing or when real-time
/// events are disabled.
#[derive(Clone, Default)]
pub struct NoOpEventPublisher;

#[async_trait]
impl EventPublisher for NoOpEventPublisher {
    async fn publish_rsvp_count(&self, _event_id: &str, _attending_count: u64) -> AppResult<()> {
        Ok(())
    }

    async fn publish_followed(&self, _follower_id: &str, _followee_id: &str) -> AppResult<()> {
        Ok(())
    }

    async fn publish_unfollowed(&self, _follower_id: &str, _followee_id: &str) -> AppResult<()> {
        Ok(())
    }

    async fn publish_notification(
        &self,
        _id: &str,
        _user_id: &str,
        _category: &str,
        _actor_id: Option<&str>,
    ) -> AppResult<()> {
        Ok(())
    }

    async fn publish_event_canceled(&self, _event_id: &str) -> AppResult<()> {
        Ok(())
    }
}

/// Wrapper for boxed `EventPublisher` trait object.
pub type EventPublisherService = Arc<dyn EventPublisher>;

/// Live event types streamed to connected clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LiveEvent {
    /// Attending count changed for an event.
    RsvpCount {
        event_id: String,
        attending_count: u64,
    },
    /// A follow edge was accepted.
    Followed {
        follower_id: String,
        followee_id: String,
    },
    /// A follow edge was removed.
    Unfollowed {
        follower_id: String,
        followee_id: String,
    },
    /// A notification record was created for `user_id`.
    Notification {
        id: String,
        user_id: String,
        category: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        actor_id: Option<String>,
    },
    /// An event was canceled.
    EventCanceled { event_id: String },
    /// Connection established.
    Connected,
}

/// Broadcast-channel backed publisher. Every subscriber sees every event;
/// per-user filtering happens at the stream edge. A send with no live
/// subscribers is not an error.
#[derive(Clone)]
pub struct ChannelEventPublisher {
    sender: broadcast::Sender<LiveEvent>,
}

impl ChannelEventPublisher {
    /// Create a publisher with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to the live event stream.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<LiveEvent> {
        self.sender.subscribe()
    }

    fn send(&self, event: LiveEvent) {
        // Err means no subscribers are connected right now.
        let _ = self.sender.send(event);
    }
}

#[async_trait]
impl EventPublisher for ChannelEventPublisher {
    async fn publish_rsvp_count(&self, event_id: &str, attending_count: u64) -> AppResult<()> {
        self.send(LiveEvent::RsvpCount {
            event_id: event_id.to_string(),
            attending_count,
        });
        Ok(())
    }

    async fn publish_followed(&self, follower_id: &str, followee_id: &str) -> AppResult<()> {
        self.send(LiveEvent::Followed {
            follower_id: follower_id.to_string(),
            followee_id: followee_id.to_string(),
        });
        Ok(())
    }

    async fn publish_unfollowed(&self, follower_id: &str, followee_id: &str) -> AppResult<()> {
        self.send(LiveEvent::Unfollowed {
            follower_id: follower_id.to_string(),
            followee_id: followee_id.to_string(),
        });
        Ok(())
    }

    async fn publish_notification(
        &self,
        id: &str,
        user_id: &str,
        category: &str,
        actor_id: Option<&str>,
    ) -> AppResult<()> {
        self.send(LiveEvent::Notification {
            id: id.to_string(),
            user_id: user_id.to_string(),
            category: category.to_string(),
            actor_id: actor_id.map(ToString::to_string),
        });
        Ok(())
    }

    async fn publish_event_canceled(&self, event_id: &str) -> AppResult<()> {
        self.send(LiveEvent::EventCanceled {
            event_id: event_id.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let publisher = ChannelEventPublisher::new(16);
        let mut rx = publisher.subscribe();

        publisher.publish_rsvp_count("e1", 20).await.unwrap();

        match rx.recv().await.unwrap() {
            LiveEvent::RsvpCount {
                event_id,
                attending_count,
            } => {
                assert_eq!(event_id, "e1");
                assert_eq!(attending_count, 20);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_ok() {
        let publisher = ChannelEventPublisher::new(16);
        assert!(publisher.publish_event_canceled("e1").await.is_ok());
    }

    #[tokio::test]
    async fn noop_publisher_accepts_everything() {
        let publisher = NoOpEventPublisher;
        assert!(publisher.publish_rsvp_count("e1", 1).await.is_ok());
        assert!(publisher.publish_followed("u1", "u2").await.is_ok());
        assert!(publisher.publish_unfollowed("u1", "u2").await.is_ok());
        assert!(
            publisher
                .publish_notification("n1", "u1", "community", None)
                .await
                .is_ok()
        );
        assert!(publisher.publish_event_canceled("e1").await.is_ok());
    }
}
