//! Invitation state machine.
//!
//! pending -> {accepted, declined, expired}; terminal once left pending.
//! Duplicate invites and already-attending invitees are skip outcomes, not
//! errors, so bulk inviting never partially fails. Accepting composes the
//! single RSVP upsert path instead of duplicating the write.

use crate::services::audience::AudienceResolver;
use crate::services::notification::{NotificationInput, NotificationService};
use crate::services::rsvp::RsvpService;
use koinonia_common::{AppError, AppResult, IdGenerator};
use koinonia_db::entities::event::EventStatus;
use koinonia_db::entities::invitation::{self, InvitationStatus};
use koinonia_db::entities::notification::NotificationCategory;
use koinonia_db::entities::rsvp::RsvpStatus;
use koinonia_db::repositories::{
    EventRepository, InvitationRepository, RsvpRepository, UserRepository,
};
use sea_orm::Set;
use std::collections::HashSet;

/// Outcome of a single invite attempt.
#[derive(Debug, Clone)]
pub enum InviteOutcome {
    /// A pending invitation was created.
    Invited(invitation::Model),
    /// The invitee already has a going or maybe RSVP; no write performed.
    AlreadyAttending,
    /// An invitation for this pair already exists; no write performed.
    AlreadyInvited,
    /// The candidate failed for an unrelated reason during a batch; logged
    /// and skipped.
    Skipped,
}

impl InviteOutcome {
    /// Stable wire label for the outcome.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Invited(_) => "invited",
            Self::AlreadyAttending => "alreadyAttending",
            Self::AlreadyInvited => "alreadyInvited",
            Self::Skipped => "skipped",
        }
    }
}

/// Per-candidate result of a bulk invite.
#[derive(Debug, Clone)]
pub struct BulkInviteItem {
    pub user_id: String,
    pub outcome: InviteOutcome,
}

/// Invitation service.
#[derive(Clone)]
pub struct InvitationService {
    invitation_repo: InvitationRepository,
    rsvp_repo: RsvpRepository,
    event_repo: EventRepository,
    user_repo: UserRepository,
    rsvp_service: RsvpService,
    audience: AudienceResolver,
    notifications: Option<NotificationService>,
    id_gen: IdGenerator,
}

impl InvitationService {
    /// Create a new invitation service.
    #[must_use]
    pub const fn new(
        invitation_repo: InvitationRepository,
        rsvp_repo: RsvpRepository,
        event_repo: EventRepository,
        user_repo: UserRepository,
        rsvp_service: RsvpService,
        audience: AudienceResolver,
    ) -> Self {
        Self {
            invitation_repo,
            rsvp_repo,
            event_repo,
            user_repo,
            rsvp_service,
            audience,
            notifications: None,
            id_gen: IdGenerator::new(),
        }
    }

    /// Set the notification dispatcher.
    pub fn set_notifications(&mut self, notifications: NotificationService) {
        self.notifications = Some(notifications);
    }

    /// Invite a user to an event.
    ///
    /// Already-attending and already-invited are reported as outcomes, not
    /// errors, and perform no writes.
    pub async fn invite(
        &self,
        event_id: &str,
        inviter_id: &str,
        invitee_id: &str,
    ) -> AppResult<InviteOutcome> {
        let event = self.event_repo.get_by_id(event_id).await?;
        if event.status == EventStatus::Canceled {
            return Err(AppError::EventCanceled(event_id.to_string()));
        }

        let invitee = self.user_repo.get_by_id(invitee_id).await?;

        if let Some(rsvp) = self
            .rsvp_repo
            .find_by_event_and_user(event_id, invitee_id)
            .await?
            && rsvp.status.is_attending()
        {
            return Ok(InviteOutcome::AlreadyAttending);
        }

        if self
            .invitation_repo
            .find_by_event_and_invitee(event_id, invitee_id)
            .await?
            .is_some()
        {
            return Ok(InviteOutcome::AlreadyInvited);
        }

        let model = invitation::ActiveModel {
            id: Set(self.id_gen.generate()),
            event_id: Set(event_id.to_string()),
            inviter_id: Set(inviter_id.to_string()),
            invitee_id: Set(invitee_id.to_string()),
            status: Set(InvitationStatus::Pending),
            created_at: Set(chrono::Utc::now().into()),
            responded_at: Set(None),
        };
        let created = self.invitation_repo.create(model).await?;

        if let Some(ref notifications) = self.notifications {
            let input = NotificationInput {
                category: NotificationCategory::Community,
                title: "You're invited".to_string(),
                body: format!("You've been invited to \"{}\"", event.title),
                payload: Some(serde_json::json!({
                    "eventId": event.id,
                    "invitationId": created.id,
                })),
            };
            if let Err(e) = notifications.notify(&invitee.id, Some(inviter_id), input).await {
                tracing::warn!(
                    invitation_id = %created.id,
                    error = %e,
                    "Failed to notify invitee"
                );
            }
        }

        Ok(InviteOutcome::Invited(created))
    }

    /// Invite a list of users, collecting per-candidate outcomes. A failing
    /// candidate is skipped, never aborting the batch.
    pub async fn invite_users(
        &self,
        event_id: &str,
        inviter_id: &str,
        invitee_ids: &[String],
    ) -> AppResult<Vec<BulkInviteItem>> {
        // Event existence and cancellation are checked once up front.
        let event = self.event_repo.get_by_id(event_id).await?;
        if event.status == EventStatus::Canceled {
            return Err(AppError::EventCanceled(event_id.to_string()));
        }

        let mut items = Vec::with_capacity(invitee_ids.len());

        for invitee_id in invitee_ids {
            let outcome = match self.invite(event_id, inviter_id, invitee_id).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::warn!(
                        event_id = %event_id,
                        invitee_id = %invitee_id,
                        error = %e,
                        "Invite candidate skipped"
                    );
                    InviteOutcome::Skipped
                }
            };
            items.push(BulkInviteItem {
                user_id: invitee_id.clone(),
                outcome,
            });
        }

        Ok(items)
    }

    /// Invite all users within `radius_km` of the event's coordinates.
    ///
    /// Attendees, the host, and the inviter are excluded from the candidate
    /// set before inviting.
    pub async fn invite_nearby(
        &self,
        event_id: &str,
        inviter_id: &str,
        radius_km: f64,
    ) -> AppResult<Vec<BulkInviteItem>> {
        let event = self.event_repo.get_by_id(event_id).await?;
        if event.status == EventStatus::Canceled {
            return Err(AppError::EventCanceled(event_id.to_string()));
        }
        let (Some(latitude), Some(longitude)) = (event.latitude, event.longitude) else {
            return Err(AppError::Validation(
                "Event has no coordinates for a radius invite".to_string(),
            ));
        };

        let mut exclude: HashSet<String> = self
            .rsvp_repo
            .attendee_ids(event_id)
            .await?
            .into_iter()
            .collect();
        exclude.insert(event.host_id.clone());
        exclude.insert(inviter_id.to_string());

        let matches = self
            .audience
            .within_radius(latitude, longitude, radius_km, &exclude)
            .await?;

        let candidate_ids: Vec<String> = matches.into_iter().map(|m| m.user_id).collect();
        self.invite_users(event_id, inviter_id, &candidate_ids).await
    }

    /// Accept a pending invitation.
    ///
    /// Only the invitee may accept; a pending invitation to an event that
    /// has already passed transitions to expired and reports `EVENT_PASSED`.
    /// On success the invitee gets a going RSVP through the ledger's normal
    /// upsert path.
    pub async fn accept(
        &self,
        invitation_id: &str,
        user_id: &str,
    ) -> AppResult<invitation::Model> {
        let inv = self.invitation_repo.get_by_id(invitation_id).await?;

        if inv.invitee_id != user_id {
            return Err(AppError::Forbidden(
                "Only the invitee can respond to an invitation".to_string(),
            ));
        }
        if inv.status != InvitationStatus::Pending {
            return Err(AppError::Conflict(
                "Invitation has already been responded to".to_string(),
            ));
        }

        let event = self.event_repo.get_by_id(&inv.event_id).await?;
        if event.status == EventStatus::Canceled {
            return Err(AppError::EventCanceled(event.id));
        }
        if chrono::Utc::now().naive_utc() > event.ends_at() {
            self.invitation_repo
                .set_status(inv, InvitationStatus::Expired)
                .await?;
            return Err(AppError::EventPassed(event.id));
        }

        self.rsvp_service
            .set_rsvp(&event.id, user_id, RsvpStatus::Going)
            .await?;

        let accepted = self
            .invitation_repo
            .set_status(inv, InvitationStatus::Accepted)
            .await?;

        if let Some(ref notifications) = self.notifications {
            let input = NotificationInput {
                category: NotificationCategory::Community,
                title: "Invitation accepted".to_string(),
                body: format!("Your invitation to \"{}\" was accepted", event.title),
                payload: Some(serde_json::json!({ "eventId": event.id })),
            };
            if let Err(e) = notifications
                .notify(&accepted.inviter_id, Some(user_id), input)
                .await
            {
                tracing::warn!(
                    invitation_id = %accepted.id,
                    error = %e,
                    "Failed to notify inviter of acceptance"
                );
            }
        }

        Ok(accepted)
    }

    /// Decline a pending invitation. No RSVP side effect.
    pub async fn decline(
        &self,
        invitation_id: &str,
        user_id: &str,
    ) -> AppResult<invitation::Model> {
        let inv = self.invitation_repo.get_by_id(invitation_id).await?;

        if inv.invitee_id != user_id {
            return Err(AppError::Forbidden(
                "Only the invitee can respond to an invitation".to_string(),
            ));
        }
        if inv.status != InvitationStatus::Pending {
            return Err(AppError::Conflict(
                "Invitation has already been responded to".to_string(),
            ));
        }

        self.invitation_repo
            .set_status(inv, InvitationStatus::Declined)
            .await
    }

    /// Pending invitations received by a user.
    pub async fn pending_for(
        &self,
        user_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<invitation::Model>> {
        self.invitation_repo
            .find_pending_for_invitee(user_id, limit, until_id)
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use koinonia_db::entities::{event, rsvp, user};
    use koinonia_db::repositories::{BookmarkRepository, CommunityRepository};
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
    use std::sync::Arc;

    fn test_config() -> koinonia_common::config::EngagementConfig {
        koinonia_common::config::EngagementConfig {
            attendance_threshold: 20,
            proximity_radius_km: 10.0,
            min_radius_km: 1.0,
            max_radius_km: 100.0,
        }
    }

    fn test_event(id: &str, date: NaiveDate) -> event::Model {
        event::Model {
            id: id.to_string(),
            host_id: "host".to_string(),
            community_id: None,
            title: "Potluck".to_string(),
            description: None,
            location: "Hall".to_string(),
            latitude: None,
            longitude: None,
            event_date: date,
            end_date: None,
            start_time: None,
            end_time: None,
            visibility: event::EventVisibility::Public,
            status: event::EventStatus::Active,
            proximity_alerted: false,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn test_invitation(id: &str, status: InvitationStatus) -> invitation::Model {
        invitation::Model {
            id: id.to_string(),
            event_id: "e1".to_string(),
            inviter_id: "inviter".to_string(),
            invitee_id: "invitee".to_string(),
            status,
            created_at: Utc::now().into(),
            responded_at: None,
        }
    }

    fn test_user(id: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: id.to_string(),
            username_lower: id.to_lowercase(),
            token: None,
            name: None,
            avatar_url: None,
            is_private: false,
            latitude: None,
            longitude: None,
            followers_count: 0,
            following_count: 0,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn empty_db() -> DatabaseConnection {
        MockDatabase::new(DatabaseBackend::Postgres).into_connection()
    }

    fn service(
        invitation_db: DatabaseConnection,
        rsvp_db: DatabaseConnection,
        event_db: DatabaseConnection,
        user_db: DatabaseConnection,
    ) -> InvitationService {
        let rsvp_service = RsvpService::new(
            RsvpRepository::new(Arc::new(empty_db())),
            EventRepository::new(Arc::new(empty_db())),
            BookmarkRepository::new(Arc::new(empty_db())),
        );
        let audience = AudienceResolver::new(
            UserRepository::new(Arc::new(empty_db())),
            RsvpRepository::new(Arc::new(empty_db())),
            CommunityRepository::new(Arc::new(empty_db())),
            test_config(),
        );
        InvitationService::new(
            InvitationRepository::new(Arc::new(invitation_db)),
            RsvpRepository::new(Arc::new(rsvp_db)),
            EventRepository::new(Arc::new(event_db)),
            UserRepository::new(Arc::new(user_db)),
            rsvp_service,
            audience,
        )
    }

    #[tokio::test]
    async fn invite_already_attending_is_a_skip_outcome() {
        let event_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_event(
                "e1",
                NaiveDate::from_ymd_opt(2030, 6, 1).unwrap(),
            )]])
            .into_connection();
        let user_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_user("invitee")]])
            .into_connection();
        let rsvp_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[rsvp::Model {
                id: "r1".to_string(),
                event_id: "e1".to_string(),
                user_id: "invitee".to_string(),
                status: rsvp::RsvpStatus::Going,
                confirmed_at: None,
                created_at: Utc::now().into(),
                updated_at: None,
            }]])
            .into_connection();

        let svc = service(empty_db(), rsvp_db, event_db, user_db);
        let outcome = svc.invite("e1", "inviter", "invitee").await.unwrap();

        assert!(matches!(outcome, InviteOutcome::AlreadyAttending));
    }

    #[tokio::test]
    async fn invite_duplicate_is_a_skip_outcome() {
        let event_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_event(
                "e1",
                NaiveDate::from_ymd_opt(2030, 6, 1).unwrap(),
            )]])
            .into_connection();
        let user_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_user("invitee")]])
            .into_connection();
        let rsvp_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<rsvp::Model>::new()])
            .into_connection();
        let invitation_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_invitation("i1", InvitationStatus::Pending)]])
            .into_connection();

        let svc = service(invitation_db, rsvp_db, event_db, user_db);
        let outcome = svc.invite("e1", "inviter", "invitee").await.unwrap();

        assert!(matches!(outcome, InviteOutcome::AlreadyInvited));
    }

    #[tokio::test]
    async fn accept_requires_the_invitee() {
        let invitation_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_invitation("i1", InvitationStatus::Pending)]])
            .into_connection();

        let svc = service(invitation_db, empty_db(), empty_db(), empty_db());
        let result = svc.accept("i1", "someone_else").await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn accept_rejects_terminal_invitation() {
        let invitation_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_invitation("i1", InvitationStatus::Declined)]])
            .into_connection();

        let svc = service(invitation_db, empty_db(), empty_db(), empty_db());
        let result = svc.accept("i1", "invitee").await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn accept_on_passed_event_expires_and_reports() {
        let invitation_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_invitation("i1", InvitationStatus::Pending)]])
            .append_exec_results([sea_orm::MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            // the expire transition returns the updated row
            .append_query_results([[test_invitation("i1", InvitationStatus::Expired)]])
            .into_connection();
        let event_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_event(
                "e1",
                NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            )]])
            .into_connection();

        let svc = service(invitation_db, empty_db(), event_db, empty_db());
        let result = svc.accept("i1", "invitee").await;

        assert!(matches!(result, Err(AppError::EventPassed(_))));
    }

    #[test]
    fn outcome_labels_are_stable() {
        assert_eq!(InviteOutcome::AlreadyAttending.label(), "alreadyAttending");
        assert_eq!(InviteOutcome::AlreadyInvited.label(), "alreadyInvited");
        assert_eq!(InviteOutcome::Skipped.label(), "skipped");
    }
}
