//! RSVP repository.
//!
//! The attending count is always recomputed from rows here; it is never a
//! separately mutated counter, so it cannot drift.

use std::sync::Arc;

use crate::entities::{Rsvp, rsvp};
use koinonia_common::{AppError, AppResult};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QuerySelect, Set,
};

/// RSVP repository for database operations.
#[derive(Clone)]
pub struct RsvpRepository {
    db: Arc<DatabaseConnection>,
}

impl RsvpRepository {
    /// Create a new RSVP repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find the RSVP row for an event/user pair.
    pub async fn find_by_event_and_user(
        &self,
        event_id: &str,
        user_id: &str,
    ) -> AppResult<Option<rsvp::Model>> {
        Rsvp::find()
            .filter(rsvp::Column::EventId.eq(event_id))
            .filter(rsvp::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Atomically upsert an RSVP row.
    ///
    /// `ON CONFLICT (event_id, user_id) DO UPDATE` at the storage layer, so
    /// two concurrent RSVPs on the same pair cannot race to a lost update.
    pub async fn upsert(
        &self,
        model: rsvp::ActiveModel,
        event_id: &str,
        user_id: &str,
    ) -> AppResult<rsvp::Model> {
        Rsvp::insert(model)
            .on_conflict(
                OnConflict::columns([rsvp::Column::EventId, rsvp::Column::UserId])
                    .update_columns([rsvp::Column::Status, rsvp::Column::UpdatedAt])
                    .to_owned(),
            )
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_by_event_and_user(event_id, user_id)
            .await?
            .ok_or_else(|| AppError::Database("RSVP row missing after upsert".to_string()))
    }

    /// Delete the RSVP row for an event/user pair.
    pub async fn delete_by_event_and_user(&self, event_id: &str, user_id: &str) -> AppResult<()> {
        Rsvp::delete_many()
            .filter(rsvp::Column::EventId.eq(event_id))
            .filter(rsvp::Column::UserId.eq(user_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Count of `going` rows for an event: the attending count used for
    /// threshold detection.
    pub async fn count_going(&self, event_id: &str) -> AppResult<u64> {
        Rsvp::find()
            .filter(rsvp::Column::EventId.eq(event_id))
            .filter(rsvp::Column::Status.eq(rsvp::RsvpStatus::Going))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// User IDs with a going or maybe RSVP for an event.
    pub async fn attendee_ids(&self, event_id: &str) -> AppResult<Vec<String>> {
        Rsvp::find()
            .select_only()
            .column(rsvp::Column::UserId)
            .filter(rsvp::Column::EventId.eq(event_id))
            .filter(
                rsvp::Column::Status
                    .is_in([rsvp::RsvpStatus::Going, rsvp::RsvpStatus::Maybe]),
            )
            .into_tuple::<String>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Mark an RSVP as attendance-confirmed.
    pub async fn set_confirmed(&self, model: rsvp::Model) -> AppResult<rsvp::Model> {
        let mut active: rsvp::ActiveModel = model.into();
        active.confirmed_at = Set(Some(chrono::Utc::now().into()));
        active
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_count_going_returns_count() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(7))
                }]])
                .into_connection(),
        );

        let repo = RsvpRepository::new(db);
        let count = repo.count_going("e1").await.unwrap();

        assert_eq!(count, 7);
    }

    #[tokio::test]
    async fn test_attendee_ids_returns_user_ids() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[
                    maplit::btreemap! {
                        "user_id" => sea_orm::Value::from("u1")
                    },
                    maplit::btreemap! {
                        "user_id" => sea_orm::Value::from("u2")
                    },
                ]])
                .into_connection(),
        );

        let repo = RsvpRepository::new(db);
        let ids = repo.attendee_ids("e1").await.unwrap();

        assert_eq!(ids, vec!["u1".to_string(), "u2".to_string()]);
    }

    #[tokio::test]
    async fn test_find_by_event_and_user_absent_is_none() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<rsvp::Model>::new()])
                .into_connection(),
        );

        let repo = RsvpRepository::new(db);
        let found = repo.find_by_event_and_user("e1", "u1").await.unwrap();

        assert!(found.is_none());
    }
}
