//! Invitation repository.

use std::sync::Arc;

use crate::entities::{Invitation, invitation};
use koinonia_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

/// Invitation repository for database operations.
#[derive(Clone)]
pub struct InvitationRepository {
    db: Arc<DatabaseConnection>,
}

impl InvitationRepository {
    /// Create a new invitation repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find an invitation by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<invitation::Model>> {
        Invitation::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get an invitation by ID, failing if absent.
    pub async fn get_by_id(&self, id: &str) -> AppResult<invitation::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::InvitationNotFound(id.to_string()))
    }

    /// Find any invitation for an event/invitee pair, regardless of status.
    pub async fn find_by_event_and_invitee(
        &self,
        event_id: &str,
        invitee_id: &str,
    ) -> AppResult<Option<invitation::Model>> {
        Invitation::find()
            .filter(invitation::Column::EventId.eq(event_id))
            .filter(invitation::Column::InviteeId.eq(invitee_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new invitation.
    pub async fn create(&self, model: invitation::ActiveModel) -> AppResult<invitation::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Transition an invitation out of pending.
    pub async fn set_status(
        &self,
        model: invitation::Model,
        status: invitation::InvitationStatus,
    ) -> AppResult<invitation::Model> {
        let mut active: invitation::ActiveModel = model.into();
        active.status = Set(status);
        active.responded_at = Set(Some(chrono::Utc::now().into()));
        active
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Pending invitations received by a user (paginated).
    pub async fn find_pending_for_invitee(
        &self,
        invitee_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<invitation::Model>> {
        let mut query = Invitation::find()
            .filter(invitation::Column::InviteeId.eq(invitee_id))
            .filter(invitation::Column::Status.eq(invitation::InvitationStatus::Pending))
            .order_by_desc(invitation::Column::Id);

        if let Some(id) = until_id {
            query = query.filter(invitation::Column::Id.lt(id));
        }

        query
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
