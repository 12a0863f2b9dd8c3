//! Database repositories.

pub mod blocking;
pub mod bookmark;
pub mod community;
pub mod device_token;
pub mod event;
pub mod follow_edge;
pub mod invitation;
pub mod notification;
pub mod notification_preference;
pub mod rsvp;
pub mod user;

pub use blocking::BlockingRepository;
pub use bookmark::BookmarkRepository;
pub use community::CommunityRepository;
pub use device_token::DeviceTokenRepository;
pub use event::EventRepository;
pub use follow_edge::FollowEdgeRepository;
pub use invitation::InvitationRepository;
pub use notification::NotificationRepository;
pub use notification_preference::NotificationPreferenceRepository;
pub use rsvp::RsvpRepository;
pub use user::UserRepository;
