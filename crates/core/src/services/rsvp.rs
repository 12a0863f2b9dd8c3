//! RSVP ledger.
//!
//! Idempotent upsert of a user's RSVP status against an event. The attending
//! count is always recomputed from the ledger, never kept as a separately
//! mutated counter, so it cannot drift.

use crate::services::event_publisher::EventPublisherService;
use crate::services::threshold::ThresholdMonitor;
use koinonia_common::{AppError, AppResult, IdGenerator};
use koinonia_db::entities::event::EventStatus;
use koinonia_db::entities::rsvp::{self, RsvpStatus};
use koinonia_db::entities::{bookmark, event};
use koinonia_db::repositories::{BookmarkRepository, EventRepository, RsvpRepository};
use sea_orm::Set;

/// RSVP ledger service.
#[derive(Clone)]
pub struct RsvpService {
    rsvp_repo: RsvpRepository,
    event_repo: EventRepository,
    bookmark_repo: BookmarkRepository,
    threshold: Option<ThresholdMonitor>,
    event_publisher: Option<EventPublisherService>,
    id_gen: IdGenerator,
}

impl RsvpService {
    /// Create a new RSVP service.
    #[must_use]
    pub const fn new(
        rsvp_repo: RsvpRepository,
        event_repo: EventRepository,
        bookmark_repo: BookmarkRepository,
    ) -> Self {
        Self {
            rsvp_repo,
            event_repo,
            bookmark_repo,
            threshold: None,
            event_publisher: None,
            id_gen: IdGenerator::new(),
        }
    }

    /// Set the threshold monitor consulted after every counting write.
    pub fn set_threshold_monitor(&mut self, threshold: ThresholdMonitor) {
        self.threshold = Some(threshold);
    }

    /// Set the event publisher.
    pub fn set_event_publisher(&mut self, event_publisher: EventPublisherService) {
        self.event_publisher = Some(event_publisher);
    }

    /// Upsert the RSVP for an event/user pair.
    ///
    /// Re-submitting the current status is a no-op: it returns the existing
    /// row without touching counters or the threshold monitor. A real
    /// transition reads the attending count before and after the write and
    /// hands both to the monitor; monitor failures are logged and never fail
    /// the RSVP.
    pub async fn set_rsvp(
        &self,
        event_id: &str,
        user_id: &str,
        status: RsvpStatus,
    ) -> AppResult<rsvp::Model> {
        let event = self.active_event(event_id).await?;

        if let Some(existing) = self
            .rsvp_repo
            .find_by_event_and_user(event_id, user_id)
            .await?
            && existing.status == status
        {
            return Ok(existing);
        }

        let before = self.rsvp_repo.count_going(event_id).await?;

        let model = rsvp::ActiveModel {
            id: Set(self.id_gen.generate()),
            event_id: Set(event_id.to_string()),
            user_id: Set(user_id.to_string()),
            status: Set(status),
            confirmed_at: Set(None),
            created_at: Set(chrono::Utc::now().into()),
            updated_at: Set(Some(chrono::Utc::now().into())),
        };
        let saved = self.rsvp_repo.upsert(model, event_id, user_id).await?;

        let after = self.rsvp_repo.count_going(event_id).await?;

        self.publish_count(event_id, after).await;

        if let Some(ref threshold) = self.threshold
            && let Err(e) = threshold.observe(&event, before, after).await
        {
            tracing::warn!(event_id = %event_id, error = %e, "Threshold check failed after RSVP");
        }

        Ok(saved)
    }

    /// Remove the RSVP for an event/user pair. Idempotent.
    pub async fn cancel_rsvp(&self, event_id: &str, user_id: &str) -> AppResult<()> {
        self.event_repo.get_by_id(event_id).await?;
        self.rsvp_repo
            .delete_by_event_and_user(event_id, user_id)
            .await?;

        let after = self.rsvp_repo.count_going(event_id).await?;
        self.publish_count(event_id, after).await;

        Ok(())
    }

    /// Current attending count for an event.
    pub async fn attending_count(&self, event_id: &str) -> AppResult<u64> {
        self.rsvp_repo.count_going(event_id).await
    }

    /// Confirm attendance after the event window has passed.
    pub async fn confirm_attendance(&self, event_id: &str, user_id: &str) -> AppResult<rsvp::Model> {
        let event = self.event_repo.get_by_id(event_id).await?;

        if chrono::Utc::now().naive_utc() < event.ends_at() {
            return Err(AppError::BadRequest(
                "Attendance can only be confirmed after the event has ended".to_string(),
            ));
        }

        let existing = self
            .rsvp_repo
            .find_by_event_and_user(event_id, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("No RSVP for this event".to_string()))?;

        if !existing.status.is_attending() {
            return Err(AppError::BadRequest(
                "Only going or maybe RSVPs can confirm attendance".to_string(),
            ));
        }

        if existing.confirmed_at.is_some() {
            return Ok(existing);
        }

        self.rsvp_repo.set_confirmed(existing).await
    }

    /// Bookmark an event for a user. Idempotent.
    pub async fn bookmark(&self, event_id: &str, user_id: &str) -> AppResult<()> {
        self.event_repo.get_by_id(event_id).await?;

        let model = bookmark::ActiveModel {
            id: Set(self.id_gen.generate()),
            event_id: Set(event_id.to_string()),
            user_id: Set(user_id.to_string()),
            created_at: Set(chrono::Utc::now().into()),
        };
        self.bookmark_repo.add(model).await
    }

    /// Remove a bookmark. Idempotent.
    pub async fn unbookmark(&self, event_id: &str, user_id: &str) -> AppResult<()> {
        self.bookmark_repo.remove(event_id, user_id).await
    }

    /// IDs of the events a user has bookmarked.
    pub async fn bookmarked_event_ids(&self, user_id: &str) -> AppResult<Vec<String>> {
        self.bookmark_repo.event_ids_for_user(user_id).await
    }

    /// Load an event, rejecting canceled ones.
    async fn active_event(&self, event_id: &str) -> AppResult<event::Model> {
        let event = self.event_repo.get_by_id(event_id).await?;
        if event.status == EventStatus::Canceled {
            return Err(AppError::EventCanceled(event_id.to_string()));
        }
        Ok(event)
    }

    async fn publish_count(&self, event_id: &str, count: u64) {
        if let Some(ref event_publisher) = self.event_publisher
            && let Err(e) = event_publisher.publish_rsvp_count(event_id, count).await
        {
            tracing::warn!(event_id = %event_id, error = %e, "Failed to publish RSVP count");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn test_event(id: &str, status: EventStatus) -> event::Model {
        event::Model {
            id: id.to_string(),
            host_id: "host".to_string(),
            community_id: None,
            title: "Picnic".to_string(),
            description: None,
            location: "Park".to_string(),
            latitude: None,
            longitude: None,
            event_date: NaiveDate::from_ymd_opt(2030, 6, 1).unwrap(),
            end_date: None,
            start_time: None,
            end_time: None,
            visibility: koinonia_db::entities::event::EventVisibility::Public,
            status,
            proximity_alerted: false,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn test_rsvp(event_id: &str, user_id: &str, status: RsvpStatus) -> rsvp::Model {
        rsvp::Model {
            id: "r1".to_string(),
            event_id: event_id.to_string(),
            user_id: user_id.to_string(),
            status,
            confirmed_at: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn service(
        rsvp_db: sea_orm::DatabaseConnection,
        event_db: sea_orm::DatabaseConnection,
    ) -> RsvpService {
        let bookmark_db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        RsvpService::new(
            RsvpRepository::new(Arc::new(rsvp_db)),
            EventRepository::new(Arc::new(event_db)),
            BookmarkRepository::new(Arc::new(bookmark_db)),
        )
    }

    #[tokio::test]
    async fn set_rsvp_rejects_canceled_event() {
        let event_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_event("e1", EventStatus::Canceled)]])
            .into_connection();
        let rsvp_db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let result = service(rsvp_db, event_db)
            .set_rsvp("e1", "u1", RsvpStatus::Going)
            .await;

        assert!(matches!(result, Err(AppError::EventCanceled(_))));
    }

    #[tokio::test]
    async fn set_rsvp_same_status_is_a_no_op() {
        let event_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_event("e1", EventStatus::Active)]])
            .into_connection();
        // Only the existing-row lookup runs; no upsert, no counting.
        let rsvp_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_rsvp("e1", "u1", RsvpStatus::Going)]])
            .into_connection();

        let saved = service(rsvp_db, event_db)
            .set_rsvp("e1", "u1", RsvpStatus::Going)
            .await
            .unwrap();

        assert_eq!(saved.status, RsvpStatus::Going);
    }

    #[tokio::test]
    async fn set_rsvp_missing_event_is_not_found() {
        let event_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<event::Model>::new()])
            .into_connection();
        let rsvp_db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let result = service(rsvp_db, event_db)
            .set_rsvp("missing", "u1", RsvpStatus::Maybe)
            .await;

        assert!(matches!(result, Err(AppError::EventNotFound(_))));
    }

    #[tokio::test]
    async fn confirm_attendance_rejects_future_event() {
        let event_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_event("e1", EventStatus::Active)]])
            .into_connection();
        let rsvp_db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let result = service(rsvp_db, event_db)
            .confirm_attendance("e1", "u1")
            .await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn confirm_attendance_requires_attending_status() {
        let mut past = test_event("e1", EventStatus::Active);
        past.event_date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let event_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[past]])
            .into_connection();
        let rsvp_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_rsvp("e1", "u1", RsvpStatus::NotGoing)]])
            .into_connection();

        let result = service(rsvp_db, event_db)
            .confirm_attendance("e1", "u1")
            .await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn bookmark_tolerates_duplicate_insert() {
        let event_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_event("e1", EventStatus::Active)]])
            .into_connection();
        let rsvp_db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let bookmark_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .append_query_results([Vec::<bookmark::Model>::new()])
            .into_connection();

        let service = RsvpService::new(
            RsvpRepository::new(Arc::new(rsvp_db)),
            EventRepository::new(Arc::new(event_db)),
            BookmarkRepository::new(Arc::new(bookmark_db)),
        );

        assert!(service.bookmark("e1", "u1").await.is_ok());
    }
}
