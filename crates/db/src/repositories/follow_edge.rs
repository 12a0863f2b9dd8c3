//! Follow edge repository.

use std::sync::Arc;

use crate::entities::{FollowEdge, follow_edge};
use koinonia_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

/// Follow edge repository for database operations.
#[derive(Clone)]
pub struct FollowEdgeRepository {
    db: Arc<DatabaseConnection>,
}

impl FollowEdgeRepository {
    /// Create a new follow edge repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find the edge for a follower/followee pair.
    pub async fn find_by_pair(
        &self,
        follower_id: &str,
        followee_id: &str,
    ) -> AppResult<Option<follow_edge::Model>> {
        FollowEdge::find()
            .filter(follow_edge::Column::FollowerId.eq(follower_id))
            .filter(follow_edge::Column::FolloweeId.eq(followee_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Check whether an accepted edge exists.
    pub async fn is_following(&self, follower_id: &str, followee_id: &str) -> AppResult<bool> {
        let edge = self.find_by_pair(follower_id, followee_id).await?;
        Ok(edge.is_some_and(|e| e.status == follow_edge::FollowStatus::Accepted))
    }

    /// Create a new edge.
    pub async fn create(&self, model: follow_edge::ActiveModel) -> AppResult<follow_edge::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Promote a pending edge to accepted.
    pub async fn set_accepted(&self, model: follow_edge::Model) -> AppResult<follow_edge::Model> {
        let mut active: follow_edge::ActiveModel = model.into();
        active.status = Set(follow_edge::FollowStatus::Accepted);
        active
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete the edge for a pair. Idempotent.
    pub async fn delete_by_pair(&self, follower_id: &str, followee_id: &str) -> AppResult<()> {
        FollowEdge::delete_many()
            .filter(follow_edge::Column::FollowerId.eq(follower_id))
            .filter(follow_edge::Column::FolloweeId.eq(followee_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Pending follow requests received by a user (paginated).
    pub async fn find_pending_received(
        &self,
        followee_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<follow_edge::Model>> {
        let mut query = FollowEdge::find()
            .filter(follow_edge::Column::FolloweeId.eq(followee_id))
            .filter(follow_edge::Column::Status.eq(follow_edge::FollowStatus::Pending))
            .order_by_desc(follow_edge::Column::Id);

        if let Some(id) = until_id {
            query = query.filter(follow_edge::Column::Id.lt(id));
        }

        query
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
