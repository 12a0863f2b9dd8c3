//! API middleware.

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use koinonia_core::{
    BlockingService, ChannelEventPublisher, EventService, FollowService, InvitationService,
    NotificationService, RsvpService,
};
use koinonia_db::repositories::UserRepository;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub event_service: EventService,
    pub rsvp_service: RsvpService,
    pub invitation_service: InvitationService,
    pub follow_service: FollowService,
    pub blocking_service: BlockingService,
    pub notification_service: NotificationService,
    pub user_repo: UserRepository,
    pub live: ChannelEventPublisher,
}

/// Authentication middleware.
///
/// Resolves a bearer token to a user and stashes the model in request
/// extensions. Missing or unknown tokens pass through unauthenticated;
/// handlers that require auth reject via the extractor.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(auth_header) = req.headers().get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
        && let Ok(Some(user)) = state.user_repo.find_by_token(token).await
    {
        req.extensions_mut().insert(user);
    }

    next.run(req).await
}
