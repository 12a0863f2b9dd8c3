//! Business logic services.

pub mod audience;
pub mod blocking;
pub mod event;
pub mod event_publisher;
pub mod follow;
pub mod invitation;
pub mod jobs;
pub mod notification;
pub mod preference_cache;
pub mod push;
pub mod rsvp;
pub mod threshold;

pub use audience::{haversine_km, AudienceResolver, GeoMatch};
pub use blocking::BlockingService;
pub use event::{CreateEventInput, EventService};
pub use event_publisher::{
    ChannelEventPublisher, EventPublisher, EventPublisherService, LiveEvent, NoOpEventPublisher,
};
pub use follow::{FollowService, FollowState};
pub use invitation::{BulkInviteItem, InvitationService, InviteOutcome};
pub use jobs::{Job, JobSender, JobService, JobWorkerContext};
pub use notification::{NotificationInput, NotificationService};
pub use preference_cache::{
    CategoryPreferences, InMemoryPreferenceCache, PreferenceCache, PreferenceCacheService,
};
pub use push::{
    HttpPushTransport, NoOpPushTransport, PushMessage, PushTransport, PushTransportService,
};
pub use rsvp::RsvpService;
pub use threshold::ThresholdMonitor;
