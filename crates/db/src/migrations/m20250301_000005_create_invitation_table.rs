//! Create invitation table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Invitation::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Invitation::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Invitation::EventId).string_len(32).not_null())
                    .col(ColumnDef::new(Invitation::InviterId).string_len(32).not_null())
                    .col(ColumnDef::new(Invitation::InviteeId).string_len(32).not_null())
                    .col(ColumnDef::new(Invitation::Status).string_len(16).not_null())
                    .col(
                        ColumnDef::new(Invitation::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Invitation::RespondedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_invitation_event")
                            .from(Invitation::Table, Invitation::EventId)
                            .to(Event::Table, Event::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_invitation_inviter")
                            .from(Invitation::Table, Invitation::InviterId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_invitation_invitee")
                            .from(Invitation::Table, Invitation::InviteeId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique: one invitation per (event, invitee)
        manager
            .create_index(
                Index::create()
                    .name("idx_invitation_event_invitee")
                    .table(Invitation::Table)
                    .col(Invitation::EventId)
                    .col(Invitation::InviteeId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: (invitee_id, status) (for pending inbox)
        manager
            .create_index(
                Index::create()
                    .name("idx_invitation_invitee_status")
                    .table(Invitation::Table)
                    .col(Invitation::InviteeId)
                    .col(Invitation::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Invitation::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Invitation {
    Table,
    Id,
    EventId,
    InviterId,
    InviteeId,
    Status,
    CreatedAt,
    RespondedAt,
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
