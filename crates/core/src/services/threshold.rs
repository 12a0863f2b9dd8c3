//! Attendance threshold monitor.
//!
//! Watches before/after attending counts around an RSVP write and, on the
//! single crossing of the configured threshold, claims the per-event
//! proximity-alert flag and fans a nearby-event notification out to users
//! within the configured radius. The claim is a conditional update at the
//! storage layer, so concurrent crossings resolve to exactly one fan-out
//! even across process instances.

use crate::services::audience::AudienceResolver;
use crate::services::jobs::JobSender;
use crate::services::notification::{NotificationInput, NotificationService};
use koinonia_common::config::EngagementConfig;
use koinonia_common::AppResult;
use koinonia_db::entities::event;
use koinonia_db::entities::notification::NotificationCategory;
use koinonia_db::repositories::{EventRepository, RsvpRepository};
use std::collections::HashSet;

/// Threshold monitor service.
#[derive(Clone)]
pub struct ThresholdMonitor {
    event_repo: EventRepository,
    rsvp_repo: RsvpRepository,
    audience: AudienceResolver,
    notifications: NotificationService,
    job_sender: Option<JobSender>,
    config: EngagementConfig,
}

impl ThresholdMonitor {
    /// Create a new threshold monitor.
    #[must_use]
    pub const fn new(
        event_repo: EventRepository,
        rsvp_repo: RsvpRepository,
        audience: AudienceResolver,
        notifications: NotificationService,
        config: EngagementConfig,
    ) -> Self {
        Self {
            event_repo,
            rsvp_repo,
            audience,
            notifications,
            job_sender: None,
            config,
        }
    }

    /// Set the job sender. When present, the fan-out runs on the job queue
    /// instead of inline.
    pub fn set_job_sender(&mut self, job_sender: JobSender) {
        self.job_sender = Some(job_sender);
    }

    /// Whether a before/after pair constitutes the threshold crossing.
    #[must_use]
    pub const fn is_crossing(&self, before: u64, after: u64) -> bool {
        before < self.config.attendance_threshold && self.config.attendance_threshold <= after
    }

    /// Inspect an attending-count transition and trigger the one-shot
    /// proximity fan-out on a crossing.
    ///
    /// Crossings on events without coordinates are logged and skipped.
    /// Losing the claim race is not an error: the winner fans out.
    pub async fn observe(&self, event: &event::Model, before: u64, after: u64) -> AppResult<()> {
        if !self.is_crossing(before, after) {
            return Ok(());
        }

        if event.latitude.is_none() || event.longitude.is_none() {
            tracing::info!(
                event_id = %event.id,
                "Attendance threshold crossed but event has no coordinates, skipping proximity alert"
            );
            return Ok(());
        }

        if !self.event_repo.claim_proximity_alert(&event.id).await? {
            tracing::debug!(event_id = %event.id, "Proximity alert already claimed");
            return Ok(());
        }

        tracing::info!(
            event_id = %event.id,
            attending = after,
            "Attendance threshold crossed, dispatching proximity alert"
        );

        if let Some(ref job_sender) = self.job_sender {
            match job_sender.proximity_alert(event.id.clone()).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    // The one-shot claim is already consumed; a dropped
                    // enqueue would lose the fan-out for good.
                    tracing::warn!(
                        event_id = %event.id,
                        error = %e,
                        "Failed to enqueue proximity alert job, fanning out inline"
                    );
                }
            }
        }

        self.fan_out(&event.id).await
    }

    /// Resolve the nearby audience for an event and notify every match.
    ///
    /// Attendees and the host are excluded. Per-recipient failures are
    /// isolated and logged.
    pub async fn fan_out(&self, event_id: &str) -> AppResult<()> {
        let event = self.event_repo.get_by_id(event_id).await?;
        let (Some(latitude), Some(longitude)) = (event.latitude, event.longitude) else {
            return Ok(());
        };

        let mut exclude: HashSet<String> =
            self.rsvp_repo.attendee_ids(event_id).await?.into_iter().collect();
        exclude.insert(event.host_id.clone());

        let matches = self
            .audience
            .within_radius(latitude, longitude, self.config.proximity_radius_km, &exclude)
            .await?;

        tracing::debug!(
            event_id = %event_id,
            recipients = matches.len(),
            "Proximity alert audience resolved"
        );

        for m in matches {
            let input = NotificationInput {
                category: NotificationCategory::Community,
                title: "An event near you is filling up".to_string(),
                body: format!(
                    "\"{}\" at {} is {} km away and getting popular",
                    event.title, event.location, m.distance_km
                ),
                payload: Some(serde_json::json!({
                    "eventId": event.id,
                    "distanceKm": m.distance_km,
                })),
            };

            if let Err(e) = self.notifications.notify(&m.user_id, None, input).await {
                tracing::warn!(
                    event_id = %event_id,
                    user_id = %m.user_id,
                    error = %e,
                    "Failed to deliver proximity alert"
                );
            }
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::preference_cache::InMemoryPreferenceCache;
    use chrono::{NaiveDate, Utc};
    use koinonia_db::repositories::{
        CommunityRepository, DeviceTokenRepository, NotificationPreferenceRepository,
        NotificationRepository, UserRepository,
    };
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
    use std::sync::Arc;
    use std::time::Duration;

    fn test_config() -> EngagementConfig {
        EngagementConfig {
            attendance_threshold: 20,
            proximity_radius_km: 10.0,
            min_radius_km: 1.0,
            max_radius_km: 100.0,
        }
    }

    fn test_event(id: &str, coords: Option<(f64, f64)>) -> event::Model {
        event::Model {
            id: id.to_string(),
            host_id: "host".to_string(),
            community_id: None,
            title: "Retreat".to_string(),
            description: None,
            location: "Hall".to_string(),
            latitude: coords.map(|c| c.0),
            longitude: coords.map(|c| c.1),
            event_date: NaiveDate::from_ymd_opt(2030, 6, 1).unwrap(),
            end_date: None,
            start_time: None,
            end_time: None,
            visibility: koinonia_db::entities::event::EventVisibility::Public,
            status: koinonia_db::entities::event::EventStatus::Active,
            proximity_alerted: false,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn empty_db() -> DatabaseConnection {
        MockDatabase::new(DatabaseBackend::Postgres).into_connection()
    }

    fn monitor(event_db: DatabaseConnection) -> ThresholdMonitor {
        let audience = AudienceResolver::new(
            UserRepository::new(Arc::new(empty_db())),
            RsvpRepository::new(Arc::new(empty_db())),
            CommunityRepository::new(Arc::new(empty_db())),
            test_config(),
        );
        let notifications = NotificationService::new(
            NotificationRepository::new(Arc::new(empty_db())),
            NotificationPreferenceRepository::new(Arc::new(empty_db())),
            DeviceTokenRepository::new(Arc::new(empty_db())),
            Arc::new(InMemoryPreferenceCache::new(Duration::from_secs(300))),
        );
        ThresholdMonitor::new(
            EventRepository::new(Arc::new(event_db)),
            RsvpRepository::new(Arc::new(empty_db())),
            audience,
            notifications,
            test_config(),
        )
    }

    #[test]
    fn crossing_detection() {
        let m = monitor(empty_db());
        assert!(m.is_crossing(19, 20));
        assert!(m.is_crossing(15, 25));
        assert!(!m.is_crossing(20, 21));
        assert!(!m.is_crossing(19, 19));
        assert!(!m.is_crossing(20, 19));
    }

    #[tokio::test]
    async fn non_crossing_transition_touches_nothing() {
        // No queries appended: any repo call would fail the test.
        let m = monitor(empty_db());
        let event = test_event("e1", Some((0.0, 0.0)));

        assert!(m.observe(&event, 5, 6).await.is_ok());
    }

    #[tokio::test]
    async fn crossing_without_coordinates_is_skipped() {
        let m = monitor(empty_db());
        let event = test_event("e1", None);

        assert!(m.observe(&event, 19, 20).await.is_ok());
    }

    #[tokio::test]
    async fn enqueue_failure_falls_back_to_inline_fan_out() {
        use crate::services::event_publisher::{ChannelEventPublisher, LiveEvent};
        use crate::services::jobs::JobService;
        use koinonia_db::entities::{notification, notification_preference, user};

        let event_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .append_query_results([[test_event("e1", Some((0.0, 0.0)))]])
            .into_connection();
        // No attendees to exclude.
        let rsvp_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<std::collections::BTreeMap<&str, sea_orm::Value>>::new()])
            .into_connection();
        // One user about 5.6 km from the event.
        let user_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[user::Model {
                id: "near".to_string(),
                username: "near".to_string(),
                username_lower: "near".to_string(),
                token: None,
                name: None,
                avatar_url: None,
                is_private: false,
                latitude: Some(0.05),
                longitude: Some(0.0),
                followers_count: 0,
                following_count: 0,
                created_at: Utc::now().into(),
                updated_at: None,
            }]])
            .into_connection();
        let notification_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .append_query_results([[notification::Model {
                id: "n1".to_string(),
                user_id: "near".to_string(),
                actor_id: None,
                category: koinonia_db::entities::notification::NotificationCategory::Community,
                title: "t".to_string(),
                body: "b".to_string(),
                payload: None,
                is_read: false,
                created_at: Utc::now().into(),
            }]])
            .into_connection();
        let preference_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<notification_preference::Model>::new()])
            .into_connection();

        let audience = AudienceResolver::new(
            UserRepository::new(Arc::new(user_db)),
            RsvpRepository::new(Arc::new(empty_db())),
            CommunityRepository::new(Arc::new(empty_db())),
            test_config(),
        );
        let mut notifications = NotificationService::new(
            NotificationRepository::new(Arc::new(notification_db)),
            NotificationPreferenceRepository::new(Arc::new(preference_db)),
            DeviceTokenRepository::new(Arc::new(empty_db())),
            Arc::new(InMemoryPreferenceCache::new(Duration::from_secs(300))),
        );
        let publisher = ChannelEventPublisher::new(16);
        let mut rx = publisher.subscribe();
        notifications.set_event_publisher(Arc::new(publisher));

        let mut m = ThresholdMonitor::new(
            EventRepository::new(Arc::new(event_db)),
            RsvpRepository::new(Arc::new(rsvp_db)),
            audience,
            notifications,
            test_config(),
        );

        // A sender whose queue was never started and is already gone: every
        // enqueue fails.
        let jobs = JobService::new();
        let sender = jobs.sender();
        drop(jobs);
        m.set_job_sender(sender);

        let event = test_event("e1", Some((0.0, 0.0)));
        assert!(m.observe(&event, 19, 20).await.is_ok());

        // The inline fan-out reached the nearby user.
        match rx.try_recv().unwrap() {
            LiveEvent::Notification { user_id, .. } => assert_eq!(user_id, "near"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn lost_claim_race_does_not_fan_out() {
        // Conditional update affects zero rows: another writer won.
        let event_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();
        let m = monitor(event_db);
        let event = test_event("e1", Some((0.0, 0.0)));

        assert!(m.observe(&event, 19, 20).await.is_ok());
    }
}
