//! Create event table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Event::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Event::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Event::HostId).string_len(32).not_null())
                    .col(ColumnDef::new(Event::CommunityId).string_len(32))
                    .col(ColumnDef::new(Event::Title).string_len(256).not_null())
                    .col(ColumnDef::new(Event::Description).text())
                    .col(ColumnDef::new(Event::Location).string_len(512).not_null())
                    .col(ColumnDef::new(Event::Latitude).double())
                    .col(ColumnDef::new(Event::Longitude).double())
                    .col(ColumnDef::new(Event::EventDate).date().not_null())
                    .col(ColumnDef::new(Event::EndDate).date())
                    .col(ColumnDef::new(Event::StartTime).time())
                    .col(ColumnDef::new(Event::EndTime).time())
                    .col(
                        ColumnDef::new(Event::Visibility)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Event::Status).string_len(16).not_null())
                    .col(
                        ColumnDef::new(Event::ProximityAlerted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Event::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Event::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_event_host")
                            .from(Event::Table, Event::HostId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: community_id (for community-scoped listings)
        manager
            .create_index(
                Index::create()
                    .name("idx_event_community_id")
                    .table(Event::Table)
                    .col(Event::CommunityId)
                    .to_owned(),
            )
            .await?;

        // Index: event_date (for upcoming-event queries)
        manager
            .create_index(
                Index::create()
                    .name("idx_event_event_date")
                    .table(Event::Table)
                    .col(Event::EventDate)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Event::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Event {
    Table,
    Id,
    HostId,
    CommunityId,
    Title,
    Description,
    Location,
    Latitude,
    Longitude,
    EventDate,
    EndDate,
    StartTime,
    EndTime,
    Visibility,
    Status,
    ProximityAlerted,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
