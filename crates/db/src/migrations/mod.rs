//! Database schema migrations.

pub use sea_orm_migration::prelude::*;

mod m20250301_000001_create_user_table;
mod m20250301_000002_create_event_table;
mod m20250301_000003_create_rsvp_table;
mod m20250301_000004_create_bookmark_table;
mod m20250301_000005_create_invitation_table;
mod m20250301_000006_create_follow_edge_table;
mod m20250301_000007_create_blocking_table;
mod m20250301_000008_create_notification_table;
mod m20250301_000009_create_notification_preference_table;
mod m20250301_000010_create_device_token_table;
mod m20250301_000011_create_community_member_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_user_table::Migration),
            Box::new(m20250301_000002_create_event_table::Migration),
            Box::new(m20250301_000003_create_rsvp_table::Migration),
            Box::new(m20250301_000004_create_bookmark_table::Migration),
            Box::new(m20250301_000005_create_invitation_table::Migration),
            Box::new(m20250301_000006_create_follow_edge_table::Migration),
            Box::new(m20250301_000007_create_blocking_table::Migration),
            Box::new(m20250301_000008_create_notification_table::Migration),
            Box::new(m20250301_000009_create_notification_preference_table::Migration),
            Box::new(m20250301_000010_create_device_token_table::Migration),
            Box::new(m20250301_000011_create_community_member_table::Migration),
        ]
    }
}
