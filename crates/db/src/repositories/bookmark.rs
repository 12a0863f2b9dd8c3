//! Bookmark repository.

use std::sync::Arc;

use crate::entities::{Bookmark, bookmark};
use koinonia_common::{AppError, AppResult};
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QuerySelect};

/// Bookmark repository for database operations.
#[derive(Clone)]
pub struct BookmarkRepository {
    db: Arc<DatabaseConnection>,
}

impl BookmarkRepository {
    /// Create a new bookmark repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Add a bookmark. Idempotent: re-bookmarking is a no-op.
    pub async fn add(&self, model: bookmark::ActiveModel) -> AppResult<()> {
        let result = Bookmark::insert(model)
            .on_conflict(
                OnConflict::columns([bookmark::Column::EventId, bookmark::Column::UserId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec(self.db.as_ref())
            .await;

        match result {
            Ok(_) | Err(DbErr::RecordNotInserted) => Ok(()),
            Err(e) => Err(AppError::Database(e.to_string())),
        }
    }

    /// Remove a bookmark. Idempotent: removing an absent bookmark is a no-op.
    pub async fn remove(&self, event_id: &str, user_id: &str) -> AppResult<()> {
        Bookmark::delete_many()
            .filter(bookmark::Column::EventId.eq(event_id))
            .filter(bookmark::Column::UserId.eq(user_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Event IDs bookmarked by a user.
    pub async fn event_ids_for_user(&self, user_id: &str) -> AppResult<Vec<String>> {
        Bookmark::find()
            .select_only()
            .column(bookmark::Column::EventId)
            .filter(bookmark::Column::UserId.eq(user_id))
            .into_tuple::<String>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
