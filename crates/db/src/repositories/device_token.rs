//! Device token repository.

use std::sync::Arc;

use crate::entities::{DeviceToken, device_token};
use koinonia_common::{AppError, AppResult};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

/// Device token repository for database operations.
#[derive(Clone)]
pub struct DeviceTokenRepository {
    db: Arc<DatabaseConnection>,
}

impl DeviceTokenRepository {
    /// Create a new device token repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// All tokens registered for a user.
    pub async fn find_by_user(&self, user_id: &str) -> AppResult<Vec<device_token::Model>> {
        DeviceToken::find()
            .filter(device_token::Column::UserId.eq(user_id))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Register a token. Re-registering an existing token value moves it to
    /// the registering user and resets its failure count.
    pub async fn register(&self, model: device_token::ActiveModel) -> AppResult<()> {
        DeviceToken::insert(model)
            .on_conflict(
                OnConflict::column(device_token::Column::Token)
                    .update_columns([
                        device_token::Column::UserId,
                        device_token::Column::Platform,
                    ])
                    .value(device_token::Column::FailCount, 0)
                    .to_owned(),
            )
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Unregister a token owned by a user. Idempotent.
    pub async fn unregister(&self, user_id: &str, token: &str) -> AppResult<()> {
        DeviceToken::delete_many()
            .filter(device_token::Column::UserId.eq(user_id))
            .filter(device_token::Column::Token.eq(token))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Record a delivery failure for a token.
    pub async fn increment_fail_count(&self, id: &str) -> AppResult<()> {
        DeviceToken::update_many()
            .filter(device_token::Column::Id.eq(id))
            .col_expr(
                device_token::Column::FailCount,
                Expr::col(device_token::Column::FailCount).add(1),
            )
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Reset the failure count after a successful delivery.
    pub async fn reset_fail_count(&self, id: &str) -> AppResult<()> {
        DeviceToken::update_many()
            .filter(device_token::Column::Id.eq(id))
            .filter(device_token::Column::FailCount.gt(0))
            .col_expr(device_token::Column::FailCount, 0.into())
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}
