//! Notification preference entity.
//!
//! One row per user; absent rows (and absent fields at the API boundary)
//! mean every category is enabled.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notification_preference")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,

    #[sea_orm(default_value = true)]
    pub direct_message: bool,

    #[sea_orm(default_value = true)]
    pub community: bool,

    #[sea_orm(default_value = true)]
    pub forum: bool,

    #[sea_orm(default_value = true)]
    pub feed: bool,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
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

impl ActiveModelBehavior for ActiveModel {}
