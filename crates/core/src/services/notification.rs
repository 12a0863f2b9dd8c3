//! Notification dispatcher.
//!
//! Every notification produces exactly one durable in-app record; failing
//! that write fails the whole call. Everything after the record exists is
//! best-effort: preference gating via the cache, then independent per-device
//! push attempts.

use crate::services::event_publisher::EventPublisherService;
use crate::services::jobs::JobSender;
use crate::services::preference_cache::{CategoryPreferences, PreferenceCacheService};
use crate::services::push::{PushMessage, PushTransportService};
use koinonia_common::{AppResult, IdGenerator};
use koinonia_db::entities::notification::{self, NotificationCategory};
use koinonia_db::entities::{device_token, notification_preference};
use koinonia_db::repositories::{
    DeviceTokenRepository, NotificationPreferenceRepository, NotificationRepository,
};
use sea_orm::Set;

/// Payload for a notification to dispatch.
#[derive(Debug, Clone)]
pub struct NotificationInput {
    pub category: NotificationCategory,
    pub title: String,
    pub body: String,
    pub payload: Option<serde_json::Value>,
}

/// Notification dispatcher service.
#[derive(Clone)]
pub struct NotificationService {
    notification_repo: NotificationRepository,
    preference_repo: NotificationPreferenceRepository,
    device_token_repo: DeviceTokenRepository,
    cache: PreferenceCacheService,
    push: Option<PushTransportService>,
    event_publisher: Option<EventPublisherService>,
    job_sender: Option<JobSender>,
    id_gen: IdGenerator,
}

impl NotificationService {
    /// Create a new notification service.
    #[must_use]
    pub fn new(
        notification_repo: NotificationRepository,
        preference_repo: NotificationPreferenceRepository,
        device_token_repo: DeviceTokenRepository,
        cache: PreferenceCacheService,
    ) -> Self {
        Self {
            notification_repo,
            preference_repo,
            device_token_repo,
            cache,
            push: None,
            event_publisher: None,
            job_sender: None,
            id_gen: IdGenerator::new(),
        }
    }

    /// Set the push transport.
    pub fn set_push_transport(&mut self, push: PushTransportService) {
        self.push = Some(push);
    }

    /// Set the event publisher.
    pub fn set_event_publisher(&mut self, event_publisher: EventPublisherService) {
        self.event_publisher = Some(event_publisher);
    }

    /// Set the job sender. When present, push fan-out runs on the job queue
    /// instead of inline, so mutations never block on delivery.
    pub fn set_job_sender(&mut self, job_sender: JobSender) {
        self.job_sender = Some(job_sender);
    }

    /// Dispatch a notification to a single user.
    ///
    /// Persists the durable record first (fatal on failure), then publishes
    /// the real-time event and attempts push delivery, both best-effort.
    pub async fn notify(
        &self,
        user_id: &str,
        actor_id: Option<&str>,
        input: NotificationInput,
    ) -> AppResult<notification::Model> {
        let model = notification::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(user_id.to_string()),
            actor_id: Set(actor_id.map(std::string::ToString::to_string)),
            category: Set(input.category.clone()),
            title: Set(input.title.clone()),
            body: Set(input.body.clone()),
            payload: Set(input.payload.clone()),
            is_read: Set(false),
            created_at: Set(chrono::Utc::now().into()),
        };

        let record = self.notification_repo.create(model).await?;

        if let Some(ref event_publisher) = self.event_publisher
            && let Err(e) = event_publisher
                .publish_notification(
                    &record.id,
                    user_id,
                    &input.category.to_string(),
                    actor_id,
                )
                .await
        {
            tracing::warn!(error = %e, "Failed to publish notification event");
        }

        // The record is already durable; a preference-store failure must not
        // turn this call into an error. Fall back to the defaults.
        let prefs = match self.preferences(user_id).await {
            Ok(prefs) => prefs,
            Err(e) => {
                tracing::warn!(
                    user_id = %user_id,
                    error = %e,
                    "Failed to load preferences, assuming defaults"
                );
                CategoryPreferences::default()
            }
        };
        if !prefs.allows(&input.category) {
            tracing::debug!(
                user_id = %user_id,
                category = %input.category,
                "Push skipped: category disabled by preference"
            );
            return Ok(record);
        }

        let message = PushMessage {
            category: input.category.to_string(),
            title: input.title,
            body: input.body,
            data: input.payload,
        };

        if let Some(ref job_sender) = self.job_sender {
            if let Err(e) = job_sender
                .push_notification(user_id.to_string(), message)
                .await
            {
                tracing::warn!(error = %e, "Failed to enqueue push notification job");
            }
        } else {
            self.push_to_devices(user_id, &message).await;
        }

        Ok(record)
    }

    /// Dispatch the same notification to many users.
    ///
    /// Per-recipient failures are isolated: one user's persistence failure
    /// never aborts notification of the others. Returns the number of users
    /// whose record was persisted.
    pub async fn notify_many(
        &self,
        user_ids: &[String],
        actor_id: Option<&str>,
        input: &NotificationInput,
    ) -> AppResult<usize> {
        let mut succeeded = 0;

        for user_id in user_ids {
            match self.notify(user_id, actor_id, input.clone()).await {
                Ok(_) => succeeded += 1,
                Err(e) => {
                    tracing::warn!(
                        user_id = %user_id,
                        error = %e,
                        "Failed to notify recipient in batch"
                    );
                }
            }
        }

        tracing::debug!(
            total = user_ids.len(),
            succeeded,
            "Batch notification dispatched"
        );

        Ok(succeeded)
    }

    /// Attempt push delivery to every registered device of a user.
    ///
    /// Each token is independent: a failed or timed-out device is logged,
    /// its fail count bumped, and the loop continues. Returns the number of
    /// successful sends.
    pub async fn push_to_devices(&self, user_id: &str, message: &PushMessage) -> usize {
        let Some(ref push) = self.push else {
            tracing::debug!("Push transport not configured, skipping delivery");
            return 0;
        };

        let tokens = match self.device_token_repo.find_by_user(user_id).await {
            Ok(tokens) => tokens,
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Failed to load device tokens");
                return 0;
            }
        };

        let mut success_count = 0;

        for token in tokens {
            match push.send(&token.token, message).await {
                Ok(()) => {
                    let _ = self.device_token_repo.reset_fail_count(&token.id).await;
                    success_count += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        device_token_id = %token.id,
                        error = %e,
                        "Push delivery failed for device"
                    );
                    let _ = self.device_token_repo.increment_fail_count(&token.id).await;
                }
            }
        }

        success_count
    }

    /// Resolve a user's category preferences through the cache.
    async fn preferences(&self, user_id: &str) -> AppResult<CategoryPreferences> {
        if let Some(prefs) = self.cache.get(user_id) {
            return Ok(prefs);
        }

        let prefs = self
            .preference_repo
            .find_by_user(user_id)
            .await?
            .as_ref()
            .map_or_else(CategoryPreferences::default, CategoryPreferences::from);

        self.cache.set(user_id, prefs);
        Ok(prefs)
    }

    /// Update a user's preferences and synchronously invalidate the cache
    /// entry so a subsequent read never observes the pre-update value.
    pub async fn update_preferences(
        &self,
        user_id: &str,
        prefs: CategoryPreferences,
    ) -> AppResult<notification_preference::Model> {
        let model = notification_preference::ActiveModel {
            user_id: Set(user_id.to_string()),
            direct_message: Set(prefs.direct_message),
            community: Set(prefs.community),
            forum: Set(prefs.forum),
            feed: Set(prefs.feed),
            updated_at: Set(Some(chrono::Utc::now().into())),
        };

        let updated = self.preference_repo.upsert(model, user_id).await?;
        self.cache.invalidate(user_id);

        Ok(updated)
    }

    /// Get notifications for a user.
    pub async fn list(
        &self,
        user_id: &str,
        limit: u64,
        until_id: Option<&str>,
        unread_only: bool,
    ) -> AppResult<Vec<notification::Model>> {
        self.notification_repo
            .find_by_user(user_id, limit, until_id, unread_only)
            .await
    }

    /// Mark a notification as read.
    pub async fn mark_as_read(&self, user_id: &str, notification_id: &str) -> AppResult<()> {
        let record = self.notification_repo.find_by_id(notification_id).await?;
        if let Some(n) = record
            && n.user_id == user_id
        {
            self.notification_repo.mark_as_read(notification_id).await?;
        }
        Ok(())
    }

    /// Mark all notifications as read for a user.
    pub async fn mark_all_as_read(&self, user_id: &str) -> AppResult<u64> {
        self.notification_repo.mark_all_as_read(user_id).await
    }

    /// Count unread notifications for a user.
    pub async fn count_unread(&self, user_id: &str) -> AppResult<u64> {
        self.notification_repo.count_unread(user_id).await
    }

    /// Register a push delivery target for a user. Re-registering an
    /// existing token moves it to the registering user.
    pub async fn register_device(
        &self,
        user_id: &str,
        token: &str,
        platform: Option<&str>,
    ) -> AppResult<()> {
        let model = device_token::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(user_id.to_string()),
            token: Set(token.to_string()),
            platform: Set(platform.map(ToString::to_string)),
            fail_count: Set(0),
            created_at: Set(chrono::Utc::now().into()),
        };
        self.device_token_repo.register(model).await
    }

    /// Remove a push delivery target. Idempotent.
    pub async fn unregister_device(&self, user_id: &str, token: &str) -> AppResult<()> {
        self.device_token_repo.unregister(user_id, token).await
    }

    /// Delete a notification.
    pub async fn delete(&self, user_id: &str, notification_id: &str) -> AppResult<()> {
        let record = self.notification_repo.find_by_id(notification_id).await?;
        if let Some(n) = record
            && n.user_id == user_id
        {
            self.notification_repo.delete(notification_id).await?;
        }
        Ok(())
    }
}
