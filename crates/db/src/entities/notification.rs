//! Notification record entity.
//!
//! The durable in-app record is the single source of truth for a delivered
//! notification; push attempts are best-effort on top of it.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Notification categories gated by per-user preferences.
///
/// Event notifications reuse the community category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "camelCase")]
pub enum NotificationCategory {
    #[sea_orm(string_value = "directMessage")]
    DirectMessage,
    #[sea_orm(string_value = "community")]
    Community,
    #[sea_orm(string_value = "forum")]
    Forum,
    #[sea_orm(string_value = "feed")]
    Feed,
}

impl std::fmt::Display for NotificationCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::DirectMessage => "directMessage",
            Self::Community => "community",
            Self::Forum => "forum",
            Self::Feed => "feed",
        };
        write!(f, "{s}")
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notification")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The user receiving the notification
    pub user_id: String,

    /// The user who triggered the notification (optional for some types)
    #[sea_orm(nullable)]
    pub actor_id: Option<String>,

    pub category: NotificationCategory,

    pub title: String,

    #[sea_orm(column_type = "Text")]
    pub body: String,

    /// Structured payload for client routing (event id, invitation id, ...)
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub payload: Option<Json>,

    #[sea_orm(default_value = false)]
    pub is_read: bool,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::ActorId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Actor,
}

impl ActiveModelBehavior for ActiveModel {}
