//! Follow gate.
//!
//! Idempotent follow/accept/deny workflow gating private-account
//! visibility. Retried calls return the existing edge state instead of
//! erroring, and a block in either direction forbids any edge.

use crate::services::event_publisher::EventPublisherService;
use crate::services::notification::{NotificationInput, NotificationService};
use koinonia_common::{AppError, AppResult, IdGenerator};
use koinonia_db::entities::follow_edge::{self, FollowStatus};
use koinonia_db::entities::notification::NotificationCategory;
use koinonia_db::repositories::{BlockingRepository, FollowEdgeRepository, UserRepository};
use sea_orm::Set;

/// Resulting state of a follow operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FollowState {
    pub is_following: bool,
    pub is_pending: bool,
}

impl FollowState {
    const fn from_status(status: FollowStatus) -> Self {
        match status {
            FollowStatus::Accepted => Self {
                is_following: true,
                is_pending: false,
            },
            FollowStatus::Pending => Self {
                is_following: false,
                is_pending: true,
            },
        }
    }
}

/// Follow service.
#[derive(Clone)]
pub struct FollowService {
    follow_repo: FollowEdgeRepository,
    user_repo: UserRepository,
    blocking_repo: BlockingRepository,
    notifications: Option<NotificationService>,
    event_publisher: Option<EventPublisherService>,
    id_gen: IdGenerator,
}

impl FollowService {
    /// Create a new follow service.
    #[must_use]
    pub const fn new(
        follow_repo: FollowEdgeRepository,
        user_repo: UserRepository,
        blocking_repo: BlockingRepository,
    ) -> Self {
        Self {
            follow_repo,
            user_repo,
            blocking_repo,
            notifications: None,
            event_publisher: None,
            id_gen: IdGenerator::new(),
        }
    }

    /// Set the notification dispatcher.
    pub fn set_notifications(&mut self, notifications: NotificationService) {
        self.notifications = Some(notifications);
    }

    /// Set the event publisher.
    pub fn set_event_publisher(&mut self, event_publisher: EventPublisherService) {
        self.event_publisher = Some(event_publisher);
    }

    /// Follow a user.
    ///
    /// A private target gets a pending edge and a follow-request
    /// notification; a public target gets an accepted edge immediately. An
    /// existing edge is returned as-is so retries are safe.
    pub async fn follow(&self, follower_id: &str, followee_id: &str) -> AppResult<FollowState> {
        if follower_id == followee_id {
            return Err(AppError::BadRequest("Cannot follow yourself".to_string()));
        }

        if self
            .blocking_repo
            .is_blocked_between(follower_id, followee_id)
            .await?
        {
            return Err(AppError::Blocked);
        }

        let followee = self.user_repo.get_by_id(followee_id).await?;

        if let Some(edge) = self.follow_repo.find_by_pair(follower_id, followee_id).await? {
            return Ok(FollowState::from_status(edge.status));
        }

        let status = if followee.is_private {
            FollowStatus::Pending
        } else {
            FollowStatus::Accepted
        };

        let model = follow_edge::ActiveModel {
            id: Set(self.id_gen.generate()),
            follower_id: Set(follower_id.to_string()),
            followee_id: Set(followee_id.to_string()),
            status: Set(status),
            created_at: Set(chrono::Utc::now().into()),
        };
        let edge = self.follow_repo.create(model).await?;

        if edge.status == FollowStatus::Accepted {
            self.user_repo
                .adjust_follow_counts(follower_id, followee_id, 1)
                .await?;

            self.notify_followee(
                followee_id,
                follower_id,
                "New follower",
                "started following you",
            )
            .await;
            self.publish_followed(follower_id, followee_id).await;
        } else {
            self.notify_followee(
                followee_id,
                follower_id,
                "New follow request",
                "wants to follow you",
            )
            .await;
        }

        Ok(FollowState::from_status(edge.status))
    }

    /// Remove a follow edge or pending request. Idempotent.
    pub async fn unfollow(&self, follower_id: &str, followee_id: &str) -> AppResult<()> {
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

            if let Some(ref event_publisher) = self.event_publisher
                && let Err(e) = event_publisher
                    .publish_unfollowed(follower_id, followee_id)
                    .await
            {
                tracing::warn!(error = %e, "Failed to publish unfollowed event");
            }
        }

        Ok(())
    }

    /// Accept a pending follow request. Already-accepted edges return
    /// success.
    pub async fn accept_follow(
        &self,
        followee_id: &str,
        follower_id: &str,
    ) -> AppResult<FollowState> {
        let edge = self
            .follow_repo
            .find_by_pair(follower_id, followee_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Follow request not found".to_string()))?;

        if edge.status == FollowStatus::Accepted {
            return Ok(FollowState::from_status(FollowStatus::Accepted));
        }

        let accepted = self.follow_repo.set_accepted(edge).await?;

        self.user_repo
            .adjust_follow_counts(follower_id, followee_id, 1)
            .await?;

        self.notify_follower_accepted(follower_id, followee_id).await;
        self.publish_followed(follower_id, followee_id).await;

        Ok(FollowState::from_status(accepted.status))
    }

    /// Deny a pending follow request by deleting the edge.
    pub async fn deny_follow(&self, followee_id: &str, follower_id: &str) -> AppResult<()> {
        let edge = self
            .follow_repo
            .find_by_pair(follower_id, followee_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Follow request not found".to_string()))?;

        if edge.status != FollowStatus::Pending {
            return Err(AppError::BadRequest(
                "Follow request is not pending".to_string(),
            ));
        }

        self.follow_repo
            .delete_by_pair(follower_id, followee_id)
            .await
    }

    /// Pending follow requests received by a user.
    pub async fn pending_received(
        &self,
        user_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<follow_edge::Model>> {
        self.follow_repo
            .find_pending_received(user_id, limit, until_id)
            .await
    }

    async fn notify_followee(&self, followee_id: &str, follower_id: &str, title: &str, verb: &str) {
        let Some(ref notifications) = self.notifications else {
            return;
        };

        let body = match self.user_repo.find_by_id(follower_id).await {
            Ok(Some(follower)) => {
                format!("{} {verb}", follower.name.unwrap_or(follower.username))
            }
            _ => format!("Someone {verb}"),
        };

        let input = NotificationInput {
            category: NotificationCategory::Feed,
            title: title.to_string(),
            body,
            payload: Some(serde_json::json!({ "followerId": follower_id })),
        };
        if let Err(e) = notifications
            .notify(followee_id, Some(follower_id), input)
            .await
        {
            tracing::warn!(error = %e, "Failed to notify followee");
        }
    }

    async fn notify_follower_accepted(&self, follower_id: &str, followee_id: &str) {
        let Some(ref notifications) = self.notifications else {
            return;
        };

        let input = NotificationInput {
            category: NotificationCategory::Feed,
            title: "Follow request accepted".to_string(),
            body: "Your follow request was accepted".to_string(),
            payload: Some(serde_json::json!({ "followeeId": followee_id })),
        };
        if let Err(e) = notifications
            .notify(follower_id, Some(followee_id), input)
            .await
        {
            tracing::warn!(error = %e, "Failed to notify follower of acceptance");
        }
    }

    async fn publish_followed(&self, follower_id: &str, followee_id: &str) {
        if let Some(ref event_publisher) = self.event_publisher
            && let Err(e) = event_publisher
                .publish_followed(follower_id, followee_id)
                .await
        {
            tracing::warn!(error = %e, "Failed to publish followed event");
        }
    }
}
