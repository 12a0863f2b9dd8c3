//! Event service.
//!
//! Event lookup, creation and soft cancellation. Canceling is terminal,
//! never a hard delete, and fans a notification out to going/maybe
//! attendees.

use crate::services::event_publisher::EventPublisherService;
use crate::services::notification::{NotificationInput, NotificationService};
use koinonia_common::{AppError, AppResult, IdGenerator};
use koinonia_db::entities::event::{self, EventStatus, EventVisibility};
use koinonia_db::entities::notification::NotificationCategory;
use koinonia_db::repositories::{
    CommunityRepository, EventRepository, FollowEdgeRepository, RsvpRepository,
};
use sea_orm::Set;
use serde::Deserialize;

/// Input for creating an event.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventInput {
    pub title: String,
    pub description: Option<String>,
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub community_id: Option<String>,
    pub event_date: chrono::NaiveDate,
    pub end_date: Option<chrono::NaiveDate>,
    pub start_time: Option<chrono::NaiveTime>,
    pub end_time: Option<chrono::NaiveTime>,
    #[serde(default)]
    pub visibility: Option<EventVisibility>,
}

/// Event service.
#[derive(Clone)]
pub struct EventService {
    event_repo: EventRepository,
    rsvp_repo: RsvpRepository,
    community_repo: CommunityRepository,
    follow_repo: FollowEdgeRepository,
    notifications: Option<NotificationService>,
    event_publisher: Option<EventPublisherService>,
    id_gen: IdGenerator,
}

impl EventService {
    /// Create a new event service.
    #[must_use]
    pub const fn new(
        event_repo: EventRepository,
        rsvp_repo: RsvpRepository,
        community_repo: CommunityRepository,
        follow_repo: FollowEdgeRepository,
    ) -> Self {
        Self {
            event_repo,
            rsvp_repo,
            community_repo,
            follow_repo,
            notifications: None,
            event_publisher: None,
            id_gen: IdGenerator::new(),
        }
    }

    /// Set the notification dispatcher.
    pub fn set_notifications(&mut self, notifications: NotificationService) {
        self.notifications = Some(notifications);
    }

    /// Set the event publisher.
    pub fn set_event_publisher(&mut self, event_publisher: EventPublisherService) {
        self.event_publisher = Some(event_publisher);
    }

    /// Get an event, enforcing its visibility against the viewer.
    ///
    /// Community events require membership, host-channel events require an
    /// accepted follow of the host. The host always sees their own events.
    /// A hidden event reads as not found, never as forbidden.
    pub async fn get_visible(
        &self,
        event_id: &str,
        viewer_id: Option<&str>,
    ) -> AppResult<event::Model> {
        let event = self.event_repo.get_by_id(event_id).await?;

        let allowed = match event.visibility {
            EventVisibility::Public => true,
            _ if viewer_id == Some(event.host_id.as_str()) => true,
            EventVisibility::Community => match (&event.community_id, viewer_id) {
                (Some(community_id), Some(viewer)) => {
                    self.community_repo.is_member(community_id, viewer).await?
                }
                _ => false,
            },
            EventVisibility::HostChannel => match viewer_id {
                Some(viewer) => self.follow_repo.is_following(viewer, &event.host_id).await?,
                None => false,
            },
        };

        if !allowed {
            return Err(AppError::EventNotFound(event_id.to_string()));
        }

        Ok(event)
    }

    /// Create an event hosted by `host_id`.
    ///
    /// Coordinates must come as a pair: one without the other is rejected
    /// before any write.
    pub async fn create(&self, host_id: &str, input: CreateEventInput) -> AppResult<event::Model> {
        if input.latitude.is_some() != input.longitude.is_some() {
            return Err(AppError::Validation(
                "latitude and longitude must be provided together".to_string(),
            ));
        }
        if input.title.trim().is_empty() {
            return Err(AppError::Validation("title must not be empty".to_string()));
        }

        let model = event::ActiveModel {
            id: Set(self.id_gen.generate()),
            host_id: Set(host_id.to_string()),
            community_id: Set(input.community_id),
            title: Set(input.title),
            description: Set(input.description),
            location: Set(input.location),
            latitude: Set(input.latitude),
            longitude: Set(input.longitude),
            event_date: Set(input.event_date),
            end_date: Set(input.end_date),
            start_time: Set(input.start_time),
            end_time: Set(input.end_time),
            visibility: Set(input.visibility.unwrap_or(EventVisibility::Public)),
            status: Set(EventStatus::Active),
            proximity_alerted: Set(false),
            created_at: Set(chrono::Utc::now().into()),
            updated_at: Set(None),
        };

        self.event_repo.create(model).await
    }

    /// Soft-cancel an event.
    ///
    /// Only the host, or a moderator of the event's community, may cancel.
    /// Already-canceled events return success. Going/maybe attendees are
    /// notified best-effort.
    pub async fn cancel(&self, event_id: &str, actor_id: &str) -> AppResult<event::Model> {
        let event = self.event_repo.get_by_id(event_id).await?;

        if event.status == EventStatus::Canceled {
            return Ok(event);
        }

        if event.host_id != actor_id && !self.is_community_moderator(&event, actor_id).await? {
            return Err(AppError::Forbidden(
                "Only the host or a community moderator can cancel an event".to_string(),
            ));
        }

        self.event_repo.set_canceled(event_id).await?;

        if let Some(ref event_publisher) = self.event_publisher
            && let Err(e) = event_publisher.publish_event_canceled(event_id).await
        {
            tracing::warn!(event_id = %event_id, error = %e, "Failed to publish event-canceled broadcast");
        }

        if let Some(ref notifications) = self.notifications {
            let attendees = self.rsvp_repo.attendee_ids(event_id).await?;
            let input = NotificationInput {
                category: NotificationCategory::Community,
                title: "Event canceled".to_string(),
                body: format!("\"{}\" has been canceled", event.title),
                payload: Some(serde_json::json!({ "eventId": event.id })),
            };

            if let Err(e) = notifications
                .notify_many(&attendees, Some(actor_id), &input)
                .await
            {
                tracing::warn!(event_id = %event_id, error = %e, "Failed to notify attendees of cancellation");
            }
        }

        self.event_repo.get_by_id(event_id).await
    }

    async fn is_community_moderator(
        &self,
        event: &event::Model,
        actor_id: &str,
    ) -> AppResult<bool> {
        match event.community_id {
            Some(ref community_id) => {
                self.community_repo.is_moderator(community_id, actor_id).await
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
    use std::sync::Arc;

    fn test_event(id: &str, status: EventStatus) -> event::Model {
        event::Model {
            id: id.to_string(),
            host_id: "host".to_string(),
            community_id: None,
            title: "Bake sale".to_string(),
            description: None,
            location: "Yard".to_string(),
            latitude: None,
            longitude: None,
            event_date: NaiveDate::from_ymd_opt(2030, 6, 1).unwrap(),
            end_date: None,
            start_time: None,
            end_time: None,
            visibility: EventVisibility::Public,
            status,
            proximity_alerted: false,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn empty_db() -> DatabaseConnection {
        MockDatabase::new(DatabaseBackend::Postgres).into_connection()
    }

    fn service(event_db: DatabaseConnection) -> EventService {
        EventService::new(
            EventRepository::new(Arc::new(event_db)),
            RsvpRepository::new(Arc::new(empty_db())),
            CommunityRepository::new(Arc::new(empty_db())),
            FollowEdgeRepository::new(Arc::new(empty_db())),
        )
    }

    fn input() -> CreateEventInput {
        CreateEventInput {
            title: "Bake sale".to_string(),
            description: None,
            location: "Yard".to_string(),
            latitude: None,
            longitude: None,
            community_id: None,
            event_date: NaiveDate::from_ymd_opt(2030, 6, 1).unwrap(),
            end_date: None,
            start_time: None,
            end_time: None,
            visibility: None,
        }
    }

    #[tokio::test]
    async fn create_rejects_half_a_coordinate() {
        let svc = service(empty_db());
        let result = svc
            .create(
                "host",
                CreateEventInput {
                    latitude: Some(1.0),
                    ..input()
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn create_rejects_empty_title() {
        let svc = service(empty_db());
        let result = svc
            .create(
                "host",
                CreateEventInput {
                    title: "  ".to_string(),
                    ..input()
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn host_channel_event_is_hidden_from_anonymous() {
        let mut event = test_event("e1", EventStatus::Active);
        event.visibility = EventVisibility::HostChannel;
        let event_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[event]])
            .into_connection();

        let svc = service(event_db);
        let result = svc.get_visible("e1", None).await;

        assert!(matches!(result, Err(AppError::EventNotFound(_))));
    }

    #[tokio::test]
    async fn host_channel_event_is_visible_to_follower() {
        use koinonia_db::entities::follow_edge::{self, FollowStatus};

        let mut event = test_event("e1", EventStatus::Active);
        event.visibility = EventVisibility::HostChannel;
        let event_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[event]])
            .into_connection();
        let follow_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[follow_edge::Model {
                id: "fe1".to_string(),
                follower_id: "u1".to_string(),
                followee_id: "host".to_string(),
                status: FollowStatus::Accepted,
                created_at: Utc::now().into(),
            }]])
            .into_connection();

        let svc = EventService::new(
            EventRepository::new(Arc::new(event_db)),
            RsvpRepository::new(Arc::new(empty_db())),
            CommunityRepository::new(Arc::new(empty_db())),
            FollowEdgeRepository::new(Arc::new(follow_db)),
        );
        let found = svc.get_visible("e1", Some("u1")).await.unwrap();

        assert_eq!(found.id, "e1");
    }

    #[tokio::test]
    async fn community_event_requires_membership() {
        use koinonia_db::entities::community_member;

        let mut event = test_event("e1", EventStatus::Active);
        event.visibility = EventVisibility::Community;
        event.community_id = Some("c1".to_string());
        let event_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[event]])
            .into_connection();
        let community_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<community_member::Model>::new()])
            .into_connection();

        let svc = EventService::new(
            EventRepository::new(Arc::new(event_db)),
            RsvpRepository::new(Arc::new(empty_db())),
            CommunityRepository::new(Arc::new(community_db)),
            FollowEdgeRepository::new(Arc::new(empty_db())),
        );
        let result = svc.get_visible("e1", Some("outsider")).await;

        assert!(matches!(result, Err(AppError::EventNotFound(_))));
    }

    #[tokio::test]
    async fn cancel_requires_host_or_moderator() {
        let event_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_event("e1", EventStatus::Active)]])
            .into_connection();

        let svc = service(event_db);
        let result = svc.cancel("e1", "stranger").await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn cancel_by_host_publishes_broadcast() {
        use crate::services::event_publisher::{ChannelEventPublisher, LiveEvent};
        use sea_orm::MockExecResult;

        let mut canceled = test_event("e1", EventStatus::Canceled);
        canceled.updated_at = Some(Utc::now().into());
        let event_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_event("e1", EventStatus::Active)]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .append_query_results([[canceled]])
            .into_connection();

        let publisher = ChannelEventPublisher::new(16);
        let mut rx = publisher.subscribe();
        let mut svc = service(event_db);
        svc.set_event_publisher(Arc::new(publisher));

        let result = svc.cancel("e1", "host").await.unwrap();

        assert_eq!(result.status, EventStatus::Canceled);
        assert!(matches!(
            rx.recv().await.unwrap(),
            LiveEvent::EventCanceled { event_id } if event_id == "e1"
        ));
    }

    #[tokio::test]
    async fn cancel_is_idempotent() {
        let event_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_event("e1", EventStatus::Canceled)]])
            .into_connection();

        let svc = service(event_db);
        let canceled = svc.cancel("e1", "stranger").await.unwrap();

        assert_eq!(canceled.status, EventStatus::Canceled);
    }
}
