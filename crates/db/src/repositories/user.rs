//! User repository.

use std::sync::Arc;

use crate::entities::{User, user};
use koinonia_common::{AppError, AppResult};
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

/// User repository for database operations.
#[derive(Clone)]
pub struct UserRepository {
    db: Arc<DatabaseConnection>,
}

impl UserRepository {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a user by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<user::Model>> {
        User::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a user by ID, failing if absent.
    pub async fn get_by_id(&self, id: &str) -> AppResult<user::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::UserNotFound(id.to_string()))
    }

    /// Find a user by access token.
    pub async fn find_by_token(&self, token: &str) -> AppResult<Option<user::Model>> {
        User::find()
            .filter(user::Column::Token.eq(token))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// All users that have a stored coordinate.
    ///
    /// Geo-radius candidates; users without coordinates are never matched.
    pub async fn find_with_coordinates(&self) -> AppResult<Vec<user::Model>> {
        User::find()
            .filter(user::Column::Latitude.is_not_null())
            .filter(user::Column::Longitude.is_not_null())
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Increment the follower count of `followee_id` and the following count
    /// of `follower_id` by `delta` (may be negative).
    pub async fn adjust_follow_counts(
        &self,
        follower_id: &str,
        followee_id: &str,
        delta: i32,
    ) -> AppResult<()> {
        User::update_many()
            .filter(user::Column::Id.eq(follower_id))
            .col_expr(
                user::Column::FollowingCount,
                Expr::col(user::Column::FollowingCount).add(delta),
            )
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        User::update_many()
            .filter(user::Column::Id.eq(followee_id))
            .col_expr(
                user::Column::FollowersCount,
                Expr::col(user::Column::FollowersCount).add(delta),
            )
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }
}
