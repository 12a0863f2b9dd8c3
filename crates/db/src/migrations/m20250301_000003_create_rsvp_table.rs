//! Create rsvp table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Rsvp::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Rsvp::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Rsvp::EventId).string_len(32).not_null())
                    .col(ColumnDef::new(Rsvp::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(Rsvp::Status).string_len(16).not_null())
                    .col(ColumnDef::new(Rsvp::ConfirmedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Rsvp::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Rsvp::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_rsvp_event")
                            .from(Rsvp::Table, Rsvp::EventId)
                            .to(Event::Table, Event::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_rsvp_user")
                            .from(Rsvp::Table, Rsvp::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique: one row per (event, user); upserts conflict on this pair
        manager
            .create_index(
                Index::create()
                    .name("idx_rsvp_event_user")
                    .table(Rsvp::Table)
                    .col(Rsvp::EventId)
                    .col(Rsvp::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: (event_id, status) (for attending counts)
        manager
            .create_index(
                Index::create()
                    .name("idx_rsvp_event_status")
                    .table(Rsvp::Table)
                    .col(Rsvp::EventId)
                    .col(Rsvp::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Rsvp::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Rsvp {
    Table,
    Id,
    EventId,
    UserId,
    Status,
    ConfirmedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Event {
    Table,
    Id,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
