//! Following endpoints.

use axum::{Json, Router, extract::State, routing::post};
use koinonia_common::AppResult;
use serde::{Deserialize, Serialize};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Follow request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowRequest {
    pub user_id: String,
}

/// Follow result response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowResponse {
    pub status: String,
}

/// Follow a user.
async fn follow(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<FollowRequest>,
) -> AppResult<ApiResponse<FollowResponse>> {
    let state_after = state.follow_service.follow(&user.id, &req.user_id).await?;

    let status = if state_after.is_following {
        "following"
    } else {
        "pending"
    };

    Ok(ApiResponse::ok(FollowResponse {
        status: status.to_string(),
    }))
}

/// Unfollow a user.
async fn unfollow(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<FollowRequest>,
) -> AppResult<ApiResponse<()>> {
    state.follow_service.unfollow(&user.id, &req.user_id).await?;
    Ok(ApiResponse::ok(()))
}

/// Accept a follow request from `user_id`.
async fn accept(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<FollowRequest>,
) -> AppResult<ApiResponse<FollowResponse>> {
    let state_after = state
        .follow_service
        .accept_follow(&user.id, &req.user_id)
        .await?;

    Ok(ApiResponse::ok(FollowResponse {
        status: if state_after.is_following {
            "following"
        } else {
            "pending"
        }
        .to_string(),
    }))
}

/// Deny a follow request from `user_id`.
async fn reject(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<FollowRequest>,
) -> AppResult<ApiResponse<()>> {
    state
        .follow_service
        .deny_follow(&user.id, &req.user_id)
        .await?;
    Ok(ApiResponse::ok(()))
}

/// Pending follow request item.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowRequestItemResponse {
    pub id: String,
    pub created_at: String,
    pub follower_id: String,
    pub followee_id: String,
}

impl From<koinonia_db::entities::follow_edge::Model> for FollowRequestItemResponse {
    fn from(f: koinonia_db::entities::follow_edge::Model) -> Self {
        Self {
            id: f.id,
            created_at: f.created_at.to_rfc3339(),
            follower_id: f.follower_id,
            followee_id: f.followee_id,
        }
    }
}

/// List pending request params.
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

/// List received follow requests (pending).
async fn list_pending(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<PendingListRequest>,
) -> AppResult<ApiResponse<Vec<FollowRequestItemResponse>>> {
    let limit = req.limit.min(100);
    let requests = state
        .follow_service
        .pending_received(&user.id, limit, req.until_id.as_deref())
        .await?;

    Ok(ApiResponse::ok(
        requests.into_iter().map(Into::into).collect(),
    ))
}

/// Create the following router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(follow))
        .route("/delete", post(unfollow))
        .route("/requests/accept", post(accept))
        .route("/requests/reject", post(reject))
        .route("/requests/list", post(list_pending))
}
