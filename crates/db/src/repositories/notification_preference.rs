//! Notification preference repository.

use std::sync::Arc;

use crate::entities::{NotificationPreference, notification_preference};
use koinonia_common::{AppError, AppResult};
use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, EntityTrait};

/// Notification preference repository for database operations.
#[derive(Clone)]
pub struct NotificationPreferenceRepository {
    db: Arc<DatabaseConnection>,
}

impl NotificationPreferenceRepository {
    /// Create a new notification preference repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find the preference row for a user. Absent means all enabled.
    pub async fn find_by_user(
        &self,
        user_id: &str,
    ) -> AppResult<Option<notification_preference::Model>> {
        NotificationPreference::find_by_id(user_id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Upsert the preference row for a user.
    pub async fn upsert(
        &self,
        model: notification_preference::ActiveModel,
        user_id: &str,
    ) -> AppResult<notification_preference::Model> {
        NotificationPreference::insert(model)
            .on_conflict(
                OnConflict::column(notification_preference::Column::UserId)
                    .update_columns([
                        notification_preference::Column::DirectMessage,
                        notification_preference::Column::Community,
                        notification_preference::Column::Forum,
                        notification_preference::Column::Feed,
                        notification_preference::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_by_user(user_id)
            .await?
            .ok_or_else(|| AppError::Database("preference row missing after upsert".to_string()))
    }
}
