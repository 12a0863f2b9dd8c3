//! Invitation endpoints.

use axum::{Json, Router, extract::State, routing::post};
use koinonia_common::AppResult;
use serde::Deserialize;

use crate::endpoints::events::InvitationResponse;
use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Invitation response request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitationIdRequest {
    pub invitation_id: String,
}

/// Accept an invitation. Creates a going RSVP for the caller.
async fn accept(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<InvitationIdRequest>,
) -> AppResult<ApiResponse<InvitationResponse>> {
    let inv = state
        .invitation_service
        .accept(&req.invitation_id, &user.id)
        .await?;
    Ok(ApiResponse::ok(inv.into()))
}

/// Decline an invitation.
async fn decline(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<InvitationIdRequest>,
) -> AppResult<ApiResponse<InvitationResponse>> {
    let inv = state
        .invitation_service
        .decline(&req.invitation_id, &user.id)
        .await?;
    Ok(ApiResponse::ok(inv.into()))
}

/// List pending invitations params.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingListRequest {
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub until_id: Option<String>,
}

const fn default_limit() -> u64 {
    10
}

/// List the caller's pending invitations.
async fn list_pending(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<PendingListRequest>,
) -> AppResult<ApiResponse<Vec<InvitationResponse>>> {
    let limit = req.limit.min(100);
    let invitations = state
        .invitation_service
        .pending_for(&user.id, limit, req.until_id.as_deref())
        .await?;

    Ok(ApiResponse::ok(
        invitations.into_iter().map(Into::into).collect(),
    ))
}

/// Create the invitations router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/accept", post(accept))
        .route("/decline", post(decline))
        .route("/list", post(list_pending))
}
