//! Event repository.

use std::sync::Arc;

use crate::entities::{Event, event};
use koinonia_common::{AppError, AppResult};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

/// Event repository for database operations.
#[derive(Clone)]
pub struct EventRepository {
    db: Arc<DatabaseConnection>,
}

impl EventRepository {
    /// Create a new event repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find an event by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<event::Model>> {
        Event::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get an event by ID, failing if absent.
    pub async fn get_by_id(&self, id: &str) -> AppResult<event::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::EventNotFound(id.to_string()))
    }

    /// Create a new event.
    pub async fn create(&self, model: event::ActiveModel) -> AppResult<event::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Mark an event as canceled. Terminal; the row is never deleted.
    pub async fn set_canceled(&self, id: &str) -> AppResult<()> {
        Event::update_many()
            .filter(event::Column::Id.eq(id))
            .col_expr(
                event::Column::Status,
                event::EventStatus::Canceled.into(),
            )
            .col_expr(
                event::Column::UpdatedAt,
                chrono::Utc::now().into(),
            )
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Atomically claim the one-shot proximity alert for an event.
    ///
    /// Conditional update: only the writer that flips `proximity_alerted`
    /// from false to true owns the fan-out. Returns `true` for the winner;
    /// concurrent losers (and repeat crossings) get `false`.
    pub async fn claim_proximity_alert(&self, id: &str) -> AppResult<bool> {
        let result = Event::update_many()
            .filter(event::Column::Id.eq(id))
            .filter(event::Column::ProximityAlerted.eq(false))
            .col_expr(event::Column::ProximityAlerted, true.into())
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected == 1)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    #[tokio::test]
    async fn test_claim_proximity_alert_winner() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let repo = EventRepository::new(db);
        assert!(repo.claim_proximity_alert("e1").await.unwrap());
    }

    #[tokio::test]
    async fn test_claim_proximity_alert_already_claimed() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .into_connection(),
        );

        let repo = EventRepository::new(db);
        assert!(!repo.claim_proximity_alert("e1").await.unwrap());
    }
}
