//! Blocking endpoints.

use axum::{Json, Router, extract::State, routing::post};
use koinonia_common::AppResult;
use serde::Deserialize;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Block request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockRequest {
    pub user_id: String,
}

/// Block a user.
async fn block(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<BlockRequest>,
) -> AppResult<ApiResponse<()>> {
    state.blocking_service.block(&user.id, &req.user_id).await?;
    Ok(ApiResponse::ok(()))
}

/// Unblock a user.
async fn unblock(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<BlockRequest>,
) -> AppResult<ApiResponse<()>> {
    state
        .blocking_service
        .unblock(&user.id, &req.user_id)
        .await?;
    Ok(ApiResponse::ok(()))
}

/// Create the blocking router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(block))
        .route("/delete", post(unblock))
}
