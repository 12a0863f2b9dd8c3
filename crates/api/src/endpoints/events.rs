//! Event endpoints: lifecycle, RSVPs, bookmarks and invitations.

use axum::{Json, Router, extract::State, routing::post};
use koinonia_common::AppResult;
use koinonia_core::{BulkInviteItem, CreateEventInput};
use koinonia_db::entities::event::{EventStatus, EventVisibility};
use koinonia_db::entities::invitation::InvitationStatus;
use koinonia_db::entities::rsvp::RsvpStatus;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    extractors::{AuthUser, MaybeAuthUser},
    middleware::AppState,
    response::ApiResponse,
};

/// Event response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResponse {
    pub id: String,
    pub host_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub community_id: Option<String>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    pub event_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    pub visibility: EventVisibility,
    pub status: EventStatus,
    pub created_at: String,
}

impl From<koinonia_db::entities::event::Model> for EventResponse {
    fn from(e: koinonia_db::entities::event::Model) -> Self {
        Self {
            id: e.id,
            host_id: e.host_id,
            community_id: e.community_id,
            title: e.title,
            description: e.description,
            location: e.location,
            latitude: e.latitude,
            longitude: e.longitude,
            event_date: e.event_date.to_string(),
            end_date: e.end_date.map(|d| d.to_string()),
            start_time: e.start_time.map(|t| t.to_string()),
            end_time: e.end_time.map(|t| t.to_string()),
            visibility: e.visibility,
            status: e.status,
            created_at: e.created_at.to_rfc3339(),
        }
    }
}

/// Create an event.
async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreateEventInput>,
) -> AppResult<ApiResponse<EventResponse>> {
    let event = state.event_service.create(&user.id, req).await?;
    Ok(ApiResponse::ok(event.into()))
}

/// Single-event request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventIdRequest {
    pub event_id: String,
}

/// Event detail response with the live attending count.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDetailResponse {
    #[serde(flatten)]
    pub event: EventResponse,
    pub attending_count: u64,
}

/// Show an event. Anonymous callers see public events only.
async fn show(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    Json(req): Json<EventIdRequest>,
) -> AppResult<ApiResponse<EventDetailResponse>> {
    let event = state
        .event_service
        .get_visible(&req.event_id, viewer.actor_id())
        .await?;
    let attending_count = state.rsvp_service.attending_count(&req.event_id).await?;

    Ok(ApiResponse::ok(EventDetailResponse {
        event: event.into(),
        attending_count,
    }))
}

/// Cancel an event.
async fn cancel(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<EventIdRequest>,
) -> AppResult<ApiResponse<EventResponse>> {
    let event = state.event_service.cancel(&req.event_id, &user.id).await?;
    Ok(ApiResponse::ok(event.into()))
}

/// RSVP request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetRsvpRequest {
    pub event_id: String,
    pub status: RsvpStatus,
}

/// RSVP response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RsvpResponse {
    pub id: String,
    pub event_id: String,
    pub user_id: String,
    pub status: RsvpStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmed_at: Option<String>,
    pub created_at: String,
}

impl From<koinonia_db::entities::rsvp::Model> for RsvpResponse {
    fn from(r: koinonia_db::entities::rsvp::Model) -> Self {
        Self {
            id: r.id,
            event_id: r.event_id,
            user_id: r.user_id,
            status: r.status,
            confirmed_at: r.confirmed_at.map(|t| t.to_rfc3339()),
            created_at: r.created_at.to_rfc3339(),
        }
    }
}

/// Set or change an RSVP.
async fn rsvp(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<SetRsvpRequest>,
) -> AppResult<ApiResponse<RsvpResponse>> {
    let row = state
        .rsvp_service
        .set_rsvp(&req.event_id, &user.id, req.status)
        .await?;
    Ok(ApiResponse::ok(row.into()))
}

/// Withdraw an RSVP.
async fn rsvp_cancel(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<EventIdRequest>,
) -> AppResult<ApiResponse<()>> {
    state.rsvp_service.cancel_rsvp(&req.event_id, &user.id).await?;
    Ok(ApiResponse::ok(()))
}

/// Confirm attendance after the event has ended.
async fn rsvp_confirm(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<EventIdRequest>,
) -> AppResult<ApiResponse<RsvpResponse>> {
    let row = state
        .rsvp_service
        .confirm_attendance(&req.event_id, &user.id)
        .await?;
    Ok(ApiResponse::ok(row.into()))
}

/// Bookmark an event.
async fn bookmark(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<EventIdRequest>,
) -> AppResult<ApiResponse<()>> {
    state.rsvp_service.bookmark(&req.event_id, &user.id).await?;
    Ok(ApiResponse::ok(()))
}

/// Remove a bookmark.
async fn unbookmark(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<EventIdRequest>,
) -> AppResult<ApiResponse<()>> {
    state.rsvp_service.unbookmark(&req.event_id, &user.id).await?;
    Ok(ApiResponse::ok(()))
}

/// Bookmarked event IDs response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarksResponse {
    pub event_ids: Vec<String>,
}

/// List the caller's bookmarked event IDs.
async fn bookmarks(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<BookmarksResponse>> {
    let event_ids = state.rsvp_service.bookmarked_event_ids(&user.id).await?;
    Ok(ApiResponse::ok(BookmarksResponse { event_ids }))
}

/// Bulk invite request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteRequest {
    pub event_id: String,
    pub user_ids: Vec<String>,
}

/// Per-candidate invite outcome.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteItemResponse {
    pub user_id: String,
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invitation: Option<InvitationResponse>,
}

/// Invitation response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitationResponse {
    pub id: String,
    pub event_id: String,
    pub inviter_id: String,
    pub invitee_id: String,
    pub status: InvitationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responded_at: Option<String>,
    pub created_at: String,
}

impl From<koinonia_db::entities::invitation::Model> for InvitationResponse {
    fn from(i: koinonia_db::entities::invitation::Model) -> Self {
        Self {
            id: i.id,
            event_id: i.event_id,
            inviter_id: i.inviter_id,
            invitee_id: i.invitee_id,
            status: i.status,
            responded_at: i.responded_at.map(|t| t.to_rfc3339()),
            created_at: i.created_at.to_rfc3339(),
        }
    }
}

fn invite_items(items: Vec<BulkInviteItem>) -> Vec<InviteItemResponse> {
    items
        .into_iter()
        .map(|item| {
            let outcome = item.outcome.label().to_string();
            let invitation = match item.outcome {
                koinonia_core::InviteOutcome::Invited(model) => Some(model.into()),
                _ => None,
            };
            InviteItemResponse {
                user_id: item.user_id,
                outcome,
                invitation,
            }
        })
        .collect()
}

/// Invite specific users to an event.
async fn invite(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<InviteRequest>,
) -> AppResult<ApiResponse<Vec<InviteItemResponse>>> {
    let items = state
        .invitation_service
        .invite_users(&req.event_id, &user.id, &req.user_ids)
        .await?;
    Ok(ApiResponse::ok(invite_items(items)))
}

/// Radius invite request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InviteNearbyRequest {
    pub event_id: String,
    /// Search radius in kilometers, clamped server-side.
    #[validate(range(min = 0.1, max = 500.0))]
    pub radius_km: f64,
}

/// Invite everyone within a radius of the event's coordinates.
async fn invite_nearby(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<InviteNearbyRequest>,
) -> AppResult<ApiResponse<Vec<InviteItemResponse>>> {
    req.validate()?;

    let items = state
        .invitation_service
        .invite_nearby(&req.event_id, &user.id, req.radius_km)
        .await?;
    Ok(ApiResponse::ok(invite_items(items)))
}

/// Create the events router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(create))
        .route("/show", post(show))
        .route("/cancel", post(cancel))
        .route("/rsvp", post(rsvp))
        .route("/rsvp/cancel", post(rsvp_cancel))
        .route("/rsvp/confirm", post(rsvp_confirm))
        .route("/bookmarks/create", post(bookmark))
        .route("/bookmarks/delete", post(unbookmark))
        .route("/bookmarks", post(bookmarks))
        .route("/invite", post(invite))
        .route("/invite-nearby", post(invite_nearby))
}
