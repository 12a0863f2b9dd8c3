//! Device token entity (push delivery targets, zero or more per user).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "device_token")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub user_id: String,

    /// Provider-issued token. Unique across users; re-registering the same
    /// token moves it to the registering user.
    #[sea_orm(unique)]
    pub token: String,

    /// Client platform hint (ios, android, web).
    #[sea_orm(nullable)]
    pub platform: Option<String>,

    /// Consecutive delivery failures for this token.
    #[sea_orm(default_value = 0)]
    pub fail_count: i32,

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
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
