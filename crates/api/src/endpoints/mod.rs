//! API endpoints.

mod blocking;
mod events;
mod following;
mod invitations;
mod notifications;

use axum::Router;

use crate::middleware::AppState;
use crate::sse;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/events", events::router())
        .nest("/invitations", invitations::router())
        .nest("/following", following::router())
        .nest("/blocking", blocking::router())
        .nest("/notifications", notifications::router())
        .nest("/streaming/sse", sse::router())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use koinonia_common::config::EngagementConfig;
    use koinonia_core::{
        AudienceResolver, BlockingService, EventService, FollowService, InMemoryPreferenceCache,
        InvitationService, NotificationService, RsvpService,
    };
    use koinonia_db::entities::user;
    use koinonia_db::repositories::{
        BlockingRepository, BookmarkRepository, CommunityRepository, DeviceTokenRepository,
        EventRepository, FollowEdgeRepository, InvitationRepository,
        NotificationPreferenceRepository, NotificationRepository, RsvpRepository, UserRepository,
    };
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    use crate::middleware::{AppState, auth_middleware};

    fn empty_db() -> Arc<DatabaseConnection> {
        Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection())
    }

    fn test_user(id: &str, token: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: id.to_string(),
            username_lower: id.to_string(),
            token: Some(token.to_string()),
            name: None,
            avatar_url: None,
            is_private: false,
            latitude: None,
            longitude: None,
            followers_count: 0,
            following_count: 0,
            created_at: chrono::Utc::now().into(),
            updated_at: None,
        }
    }

    fn state(user_db: Arc<DatabaseConnection>) -> AppState {
        let rsvp_repo = RsvpRepository::new(empty_db());
        let event_repo = EventRepository::new(empty_db());
        let user_repo = UserRepository::new(user_db);
        let community_repo = CommunityRepository::new(empty_db());

        let rsvp_service = RsvpService::new(
            rsvp_repo.clone(),
            event_repo.clone(),
            BookmarkRepository::new(empty_db()),
        );
        let audience = AudienceResolver::new(
            user_repo.clone(),
            rsvp_repo.clone(),
            community_repo.clone(),
            EngagementConfig::default(),
        );
        let invitation_service = InvitationService::new(
            InvitationRepository::new(empty_db()),
            rsvp_repo.clone(),
            event_repo.clone(),
            user_repo.clone(),
            rsvp_service.clone(),
            audience,
        );
        let follow_service = FollowService::new(
            FollowEdgeRepository::new(empty_db()),
            user_repo.clone(),
            BlockingRepository::new(empty_db()),
        );
        let blocking_service = BlockingService::new(
            BlockingRepository::new(empty_db()),
            FollowEdgeRepository::new(empty_db()),
            user_repo.clone(),
        );
        let notification_service = NotificationService::new(
            NotificationRepository::new(empty_db()),
            NotificationPreferenceRepository::new(empty_db()),
            DeviceTokenRepository::new(empty_db()),
            Arc::new(InMemoryPreferenceCache::new(Duration::from_secs(60))),
        );
        let event_service = EventService::new(
            event_repo,
            rsvp_repo,
            community_repo,
            FollowEdgeRepository::new(empty_db()),
        );

        AppState {
            event_service,
            rsvp_service,
            invitation_service,
            follow_service,
            blocking_service,
            notification_service,
            user_repo,
            live: koinonia_core::ChannelEventPublisher::new(16),
        }
    }

    fn app(state: AppState) -> axum::Router {
        super::router()
            .layer(axum::middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            ))
            .with_state(state)
    }

    #[tokio::test]
    async fn unauthenticated_request_is_rejected() {
        let app = app(state(empty_db()));

        let response = app
            .oneshot(
                Request::post("/notifications/mark-all-as-read")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let app = app(state(empty_db()));

        let response = app
            .oneshot(Request::post("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn bearer_token_resolves_the_caller() {
        // Token lookup, then the empty bookmark listing for that user.
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_user("u1", "tok-1")]])
                .into_connection(),
        );
        let mut state = state(user_db);
        state.rsvp_service = RsvpService::new(
            RsvpRepository::new(empty_db()),
            EventRepository::new(empty_db()),
            BookmarkRepository::new(Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([Vec::<koinonia_db::entities::bookmark::Model>::new()])
                    .into_connection(),
            )),
        );
        let app = app(state);

        let response = app
            .oneshot(
                Request::post("/events/bookmarks")
                    .header(header::AUTHORIZATION, "Bearer tok-1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
