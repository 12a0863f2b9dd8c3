//! Blocking service.
//!
//! A block severs follow edges in both directions and forbids new ones
//! while it stands.

use koinonia_common::{AppError, AppResult, IdGenerator};
use koinonia_db::entities::blocking;
use koinonia_db::entities::follow_edge::FollowStatus;
use koinonia_db::repositories::{BlockingRepository, FollowEdgeRepository, UserRepository};
use sea_orm::Set;

/// Blocking service.
#[derive(Clone)]
pub struct BlockingService {
    blocking_repo: BlockingRepository,
    follow_repo: FollowEdgeRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl BlockingService {
    /// Create a new blocking service.
    #[must_use]
    pub const fn new(
        blocking_repo: BlockingRepository,
        follow_repo: FollowEdgeRepository,
        user_repo: UserRepository,
    ) -> Self {
        Self {
            blocking_repo,
            follow_repo,
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Block a user. Idempotent; severs follow edges in both directions.
    pub async fn block(&self, blocker_id: &str, blockee_id: &str) -> AppResult<()> {
        if blocker_id == blockee_id {
            return Err(AppError::BadRequest("Cannot block yourself".to_string()));
        }

        self.user_repo.get_by_id(blockee_id).await?;

        if self.blocking_repo.is_blocking(blocker_id, blockee_id).await? {
            return Ok(());
        }

        let model = blocking::ActiveModel {
            id: Set(self.id_gen.generate()),
            blocker_id: Set(blocker_id.to_string()),
            blockee_id: Set(blockee_id.to_string()),
            created_at: Set(chrono::Utc::now().into()),
        };
        self.blocking_repo.create(model).await?;

        self.sever_edge(blocker_id, blockee_id).await?;
        self.sever_edge(blockee_id, blocker_id).await?;

        Ok(())
    }

    /// Remove a block. Idempotent.
    pub async fn unblock(&self, blocker_id: &str, blockee_id: &str) -> AppResult<()> {
        self.blocking_repo
            .delete_by_pair(blocker_id, blockee_id)
            .await
    }

    /// Whether a block exists in either direction.
    pub async fn is_blocked_between(&self, user_a: &str, user_b: &str) -> AppResult<bool> {
        self.blocking_repo.is_blocked_between(user_a, user_b).await
    }

    /// Delete the follow edge for a pair, correcting counts when the edge
    /// was accepted.
    async fn sever_edge(&self, follower_id: &str, followee_id: &str) -> AppResult<()> {
        let Some(edge) = self.follow_repo.find_by_pair(follower_id, followee_id).await? else {
            return Ok(());
        };

        self.follow_repo
            .delete_by_pair(follower_id, followee_id)
            .await?;

        if edge.status == FollowStatus::Accepted {
            self.user_repo
                .adjust_follow_counts(follower_id, followee_id, -1)
                .await?;
        }

        Ok(())
    }
}
