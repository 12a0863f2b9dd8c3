//! Koinonia server entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{Router, middleware};
use koinonia_api::{middleware::AppState, router as api_router};
use koinonia_common::Config;
use koinonia_core::{
    AudienceResolver, BlockingService, ChannelEventPublisher, EventPublisherService, EventService,
    FollowService, HttpPushTransport, InMemoryPreferenceCache, InvitationService, JobService,
    JobWorkerContext, NotificationService, RsvpService, ThresholdMonitor,
};
use koinonia_db::repositories::{
    BlockingRepository, BookmarkRepository, CommunityRepository, DeviceTokenRepository,
    EventRepository, FollowEdgeRepository, InvitationRepository, NotificationPreferenceRepository,
    NotificationRepository, RsvpRepository, UserRepository,
};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "koinonia=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting koinonia server...");

    // Load configuration
    let config = Config::load()?;

    // Connect to database
    let db = koinonia_db::init(&config).await?;
    info!("Connected to database");

    // Run migrations
    info!("Running database migrations...");
    koinonia_db::migrate(&db).await?;
    info!("Migrations completed");

    // Initialize repositories
    let db = Arc::new(db);
    let user_repo = UserRepository::new(Arc::clone(&db));
    let event_repo = EventRepository::new(Arc::clone(&db));
    let rsvp_repo = RsvpRepository::new(Arc::clone(&db));
    let bookmark_repo = BookmarkRepository::new(Arc::clone(&db));
    let invitation_repo = InvitationRepository::new(Arc::clone(&db));
    let follow_repo = FollowEdgeRepository::new(Arc::clone(&db));
    let blocking_repo = BlockingRepository::new(Arc::clone(&db));
    let community_repo = CommunityRepository::new(Arc::clone(&db));
    let notification_repo = NotificationRepository::new(Arc::clone(&db));
    let preference_repo = NotificationPreferenceRepository::new(Arc::clone(&db));
    let device_token_repo = DeviceTokenRepository::new(Arc::clone(&db));

    // Live event broadcast channel, shared by services and the SSE edge
    let live = ChannelEventPublisher::new(1000);
    let publisher: EventPublisherService = Arc::new(live.clone());

    // Job queue for background push and proximity fan-out
    let job_service = JobService::new();
    let job_sender = job_service.sender();

    // Notification dispatcher with the read-through preference cache
    let preference_cache = Arc::new(InMemoryPreferenceCache::new(Duration::from_secs(
        config.notification.preference_ttl_secs,
    )));
    let mut notification_service = NotificationService::new(
        notification_repo,
        preference_repo,
        device_token_repo,
        preference_cache,
    );
    notification_service.set_event_publisher(Arc::clone(&publisher));
    notification_service.set_job_sender(job_sender.clone());
    if let Some(ref endpoint) = config.notification.push_endpoint {
        let transport =
            HttpPushTransport::new(endpoint.clone(), config.notification.push_timeout_secs)?;
        notification_service.set_push_transport(Arc::new(transport));
        info!("Push delivery enabled");
    } else {
        info!("No push endpoint configured, push delivery disabled");
    }

    // Audience resolution and the attendance threshold monitor
    let audience = AudienceResolver::new(
        user_repo.clone(),
        rsvp_repo.clone(),
        community_repo.clone(),
        config.engagement.clone(),
    );
    let mut threshold = ThresholdMonitor::new(
        event_repo.clone(),
        rsvp_repo.clone(),
        audience.clone(),
        notification_service.clone(),
        config.engagement.clone(),
    );
    threshold.set_job_sender(job_sender.clone());

    // RSVP ledger
    let mut rsvp_service = RsvpService::new(
        rsvp_repo.clone(),
        event_repo.clone(),
        bookmark_repo,
    );
    rsvp_service.set_threshold_monitor(threshold.clone());
    rsvp_service.set_event_publisher(Arc::clone(&publisher));

    // Invitations ride the RSVP ledger for their accept side effect
    let mut invitation_service = InvitationService::new(
        invitation_repo,
        rsvp_repo.clone(),
        event_repo.clone(),
        user_repo.clone(),
        rsvp_service.clone(),
        audience,
    );
    invitation_service.set_notifications(notification_service.clone());

    let mut follow_service = FollowService::new(
        follow_repo.clone(),
        user_repo.clone(),
        blocking_repo.clone(),
    );
    follow_service.set_notifications(notification_service.clone());
    follow_service.set_event_publisher(Arc::clone(&publisher));

    let blocking_service =
        BlockingService::new(blocking_repo, follow_repo.clone(), user_repo.clone());

    let mut event_service =
        EventService::new(event_repo, rsvp_repo, community_repo, follow_repo);
    event_service.set_notifications(notification_service.clone());
    event_service.set_event_publisher(Arc::clone(&publisher));

    // Start the background job workers
    job_service.start(JobWorkerContext {
        notifications: Some(notification_service.clone()),
        threshold: Some(threshold),
    });
    info!("Job workers started");

    // Create app state
    let state = AppState {
        event_service,
        rsvp_service,
        invitation_service,
        follow_service,
        blocking_service,
        notification_service,
        user_repo,
        live,
    };

    // Build router
    let app = Router::new()
        .nest("/api", api_router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            koinonia_api::middleware::auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Start server with graceful shutdown
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
