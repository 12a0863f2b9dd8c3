//! Notification endpoints: listing, read state, preferences and devices.

use axum::{Json, Router, extract::State, routing::post};
use koinonia_common::AppResult;
use koinonia_core::CategoryPreferences;
use koinonia_db::entities::notification;
use serde::{Deserialize, Serialize};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// List notifications request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListNotificationsRequest {
    /// Maximum results (default: 10, max: 100)
    #[serde(default = "default_limit")]
    pub limit: u64,
    /// Cursor for pagination (before this ID)
    pub until_id: Option<String>,
    /// Only unread notifications
    #[serde(default)]
    pub unread_only: bool,
    /// Include unread count in response metadata
    #[serde(default)]
    pub with_unread_count: bool,
}

const fn default_limit() -> u64 {
    10
}

/// Notifications response with optional metadata.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationsListResponse {
    pub notifications: Vec<NotificationResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unread_count: Option<u64>,
}

/// Notification response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub id: String,
    pub created_at: String,
    pub is_read: bool,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<String>,
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl From<notification::Model> for NotificationResponse {
    fn from(n: notification::Model) -> Self {
        Self {
            id: n.id,
            created_at: n.created_at.to_rfc3339(),
            is_read: n.is_read,
            category: n.category.to_string(),
            actor_id: n.actor_id,
            title: n.title,
            body: n.body,
            payload: n.payload,
        }
    }
}

/// List notifications for the caller.
async fn list(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ListNotificationsRequest>,
) -> AppResult<ApiResponse<NotificationsListResponse>> {
    let limit = req.limit.min(100);
    let notifications = state
        .notification_service
        .list(&user.id, limit, req.until_id.as_deref(), req.unread_only)
        .await?;

    let unread_count = if req.with_unread_count {
        Some(state.notification_service.count_unread(&user.id).await?)
    } else {
        None
    };

    Ok(ApiResponse::ok(NotificationsListResponse {
        notifications: notifications.into_iter().map(Into::into).collect(),
        unread_count,
    }))
}

/// Single notification request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationIdRequest {
    pub notification_id: String,
}

/// Mark one notification as read.
async fn mark_as_read(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<NotificationIdRequest>,
) -> AppResult<ApiResponse<()>> {
    state
        .notification_service
        .mark_as_read(&user.id, &req.notification_id)
        .await?;
    Ok(ApiResponse::ok(()))
}

/// Marked count response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkAllResponse {
    pub marked: u64,
}

/// Mark all notifications as read.
async fn mark_all_as_read(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<MarkAllResponse>> {
    let marked = state.notification_service.mark_all_as_read(&user.id).await?;
    Ok(ApiResponse::ok(MarkAllResponse { marked }))
}

/// Unread count response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCountResponse {
    pub count: u64,
}

/// Count unread notifications.
async fn unread_count(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<UnreadCountResponse>> {
    let count = state.notification_service.count_unread(&user.id).await?;
    Ok(ApiResponse::ok(UnreadCountResponse { count }))
}

/// Delete a notification.
async fn delete(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<NotificationIdRequest>,
) -> AppResult<ApiResponse<()>> {
    state
        .notification_service
        .delete(&user.id, &req.notification_id)
        .await?;
    Ok(ApiResponse::ok(()))
}

/// Category preference update. Omitted categories keep their default.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePreferencesRequest {
    #[serde(default = "default_true")]
    pub direct_message: bool,
    #[serde(default = "default_true")]
    pub community: bool,
    #[serde(default = "default_true")]
    pub forum: bool,
    #[serde(default = "default_true")]
    pub feed: bool,
}

const fn default_true() -> bool {
    true
}

/// Preferences response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesResponse {
    pub direct_message: bool,
    pub community: bool,
    pub forum: bool,
    pub feed: bool,
}

/// Update per-category notification preferences.
async fn update_preferences(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<UpdatePreferencesRequest>,
) -> AppResult<ApiResponse<PreferencesResponse>> {
    let prefs = CategoryPreferences {
        direct_message: req.direct_message,
        community: req.community,
        forum: req.forum,
        feed: req.feed,
    };

    let updated = state
        .notification_service
        .update_preferences(&user.id, prefs)
        .await?;

    Ok(ApiResponse::ok(PreferencesResponse {
        direct_message: updated.direct_message,
        community: updated.community,
        forum: updated.forum,
        feed: updated.feed,
    }))
}

/// Device registration request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDeviceRequest {
    pub token: String,
    pub platform: Option<String>,
}

/// Register a push delivery target.
async fn register_device(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<RegisterDeviceRequest>,
) -> AppResult<ApiResponse<()>> {
    state
        .notification_service
        .register_device(&user.id, &req.token, req.platform.as_deref())
        .await?;
    Ok(ApiResponse::ok(()))
}

/// Device removal request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnregisterDeviceRequest {
    pub token: String,
}

/// Remove a push delivery target.
async fn unregister_device(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<UnregisterDeviceRequest>,
) -> AppResult<ApiResponse<()>> {
    state
        .notification_service
        .unregister_device(&user.id, &req.token)
        .await?;
    Ok(ApiResponse::ok(()))
}

/// Create the notifications router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/list", post(list))
        .route("/mark-as-read", post(mark_as_read))
        .route("/mark-all-as-read", post(mark_all_as_read))
        .route("/unread-count", post(unread_count))
        .route("/delete", post(delete))
        .route("/preferences/update", post(update_preferences))
        .route("/devices/register", post(register_device))
        .route("/devices/unregister", post(unregister_device))
}
