//! Event entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Who can see and engage with an event.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "camelCase")]
pub enum EventVisibility {
    #[sea_orm(string_value = "public")]
    Public,
    #[sea_orm(string_value = "community")]
    Community,
    #[sea_orm(string_value = "hostChannel")]
    HostChannel,
}

/// Event lifecycle status. Canceling is terminal; events with RSVPs are
/// never hard-deleted.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "camelCase")]
pub enum EventStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "canceled")]
    Canceled,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "event")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The hosting user. Immutable once created.
    pub host_id: String,

    /// Community the event is scoped to, when visibility is community.
    #[sea_orm(nullable)]
    pub community_id: Option<String>,

    pub title: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    /// Free-text location.
    pub location: String,

    /// Optional geographic coordinate. Events without one are still
    /// threshold-checked but never trigger proximity alerts.
    #[sea_orm(nullable)]
    pub latitude: Option<f64>,

    #[sea_orm(nullable)]
    pub longitude: Option<f64>,

    pub event_date: Date,

    /// Optional end date for multi-day events.
    #[sea_orm(nullable)]
    pub end_date: Option<Date>,

    #[sea_orm(nullable)]
    pub start_time: Option<Time>,

    #[sea_orm(nullable)]
    pub end_time: Option<Time>,

    pub visibility: EventVisibility,

    pub status: EventStatus,

    /// One-shot marker for the popularity proximity alert. Claimed with a
    /// conditional update so concurrent threshold crossings produce at most
    /// one fan-out.
    #[sea_orm(default_value = false)]
    pub proximity_alerted: bool,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// The instant after which the event counts as having occurred.
    ///
    /// Multi-day events end on their end date; events without an end time
    /// run to the end of their final day.
    #[must_use]
    pub fn ends_at(&self) -> chrono::NaiveDateTime {
        let last_day = self.end_date.unwrap_or(self.event_date);
        let end_time = self
            .end_time
            .unwrap_or_else(|| chrono::NaiveTime::from_hms_opt(23, 59, 59).unwrap_or_default());
        last_day.and_time(end_time)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::HostId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Host,

    #[sea_orm(has_many = "super::rsvp::Entity")]
    Rsvps,

    #[sea_orm(has_many = "super::invitation::Entity")]
    Invitations,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Host.def()
    }
}

impl Related<super::rsvp::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Rsvps.def()
    }
}

impl Related<super::invitation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Invitations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    fn event(end_date: Option<Date>, end_time: Option<Time>) -> Model {
        Model {
            id: "e1".to_string(),
            host_id: "host".to_string(),
            community_id: None,
            title: "Potluck".to_string(),
            description: None,
            location: "Hall".to_string(),
            latitude: None,
            longitude: None,
            event_date: NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
            end_date,
            start_time: None,
            end_time,
            visibility: EventVisibility::Public,
            status: EventStatus::Active,
            proximity_alerted: false,
            created_at: chrono::Utc::now().into(),
            updated_at: None,
        }
    }

    #[test]
    fn relations_link_host_attendance_and_invitations() {
        let host = <Entity as Related<crate::entities::user::Entity>>::to();
        assert!(matches!(host.rel_type, sea_orm::RelationType::HasOne));

        let rsvps = <Entity as Related<crate::entities::rsvp::Entity>>::to();
        assert!(matches!(rsvps.rel_type, sea_orm::RelationType::HasMany));

        let invitations = <Entity as Related<crate::entities::invitation::Entity>>::to();
        assert!(matches!(invitations.rel_type, sea_orm::RelationType::HasMany));
    }

    #[test]
    fn ends_at_defaults_to_end_of_event_day() {
        let e = event(None, None);
        assert_eq!(
            e.ends_at(),
            NaiveDate::from_ymd_opt(2026, 6, 1)
                .unwrap()
                .and_hms_opt(23, 59, 59)
                .unwrap()
        );
    }

    #[test]
    fn ends_at_uses_end_date_and_end_time_when_present() {
        let e = event(
            NaiveDate::from_ymd_opt(2026, 6, 3),
            NaiveTime::from_hms_opt(17, 30, 0),
        );
        assert_eq!(
            e.ends_at(),
            NaiveDate::from_ymd_opt(2026, 6, 3)
                .unwrap()
                .and_hms_opt(17, 30, 0)
                .unwrap()
        );
    }
}
