//! Database entities.

#![allow(missing_docs)]

pub mod blocking;
pub mod bookmark;
pub mod community_member;
pub mod device_token;
pub mod event;
pub mod follow_edge;
pub mod invitation;
pub mod notification;
pub mod notification_preference;
pub mod rsvp;
pub mod user;

pub use blocking::Entity as Blocking;
pub use bookmark::Entity as Bookmark;
pub use community_member::Entity as CommunityMember;
pub use device_token::Entity as DeviceToken;
pub use event::Entity as Event;
pub use follow_edge::Entity as FollowEdge;
pub use invitation::Entity as Invitation;
pub use notification::Entity as Notification;
pub use notification_preference::Entity as NotificationPreference;
pub use rsvp::Entity as Rsvp;
pub use user::Entity as User;
