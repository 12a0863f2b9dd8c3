//! Community membership repository.

use std::sync::Arc;

use crate::entities::{CommunityMember, community_member};
use koinonia_common::{AppError, AppResult};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect};

/// Community membership repository for database operations.
#[derive(Clone)]
pub struct CommunityRepository {
    db: Arc<DatabaseConnection>,
}

impl CommunityRepository {
    /// Create a new community repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// User IDs of all members of a community.
    pub async fn member_ids(&self, community_id: &str) -> AppResult<Vec<String>> {
        CommunityMember::find()
            .select_only()
            .column(community_member::Column::UserId)
            .filter(community_member::Column::CommunityId.eq(community_id))
            .into_tuple::<String>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Check whether a user is a member of a community.
    pub async fn is_member(&self, community_id: &str, user_id: &str) -> AppResult<bool> {
        let found = CommunityMember::find()
            .filter(community_member::Column::CommunityId.eq(community_id))
            .filter(community_member::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(found.is_some())
    }

    /// Check whether a user moderates a community.
    pub async fn is_moderator(&self, community_id: &str, user_id: &str) -> AppResult<bool> {
        let found = CommunityMember::find()
            .filter(community_member::Column::CommunityId.eq(community_id))
            .filter(community_member::Column::UserId.eq(user_id))
            .filter(community_member::Column::IsModerator.eq(true))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(found.is_some())
    }
}
