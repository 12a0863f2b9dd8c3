//! Audience resolver.
//!
//! Computes the recipient set for a fan-out: community members, event
//! attendees, or users within a geographic radius of a coordinate. All modes
//! apply a caller-supplied exclusion set and return deduplicated ids.

use koinonia_common::config::EngagementConfig;
use koinonia_common::AppResult;
use koinonia_db::repositories::{CommunityRepository, RsvpRepository, UserRepository};
use serde::Serialize;
use std::collections::HashSet;

/// Mean Earth radius in kilometres.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// A geo-radius match: a user and their distance from the center, rounded to
/// one decimal place.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoMatch {
    pub user_id: String,
    pub distance_km: f64,
}

/// Great-circle distance between two coordinates in kilometres (haversine).
#[must_use]
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// Audience resolver for notification fan-out.
#[derive(Clone)]
pub struct AudienceResolver {
    user_repo: UserRepository,
    rsvp_repo: RsvpRepository,
    community_repo: CommunityRepository,
    config: EngagementConfig,
}

impl AudienceResolver {
    /// Create a new audience resolver.
    #[must_use]
    pub const fn new(
        user_repo: UserRepository,
        rsvp_repo: RsvpRepository,
        community_repo: CommunityRepository,
        config: EngagementConfig,
    ) -> Self {
        Self {
            user_repo,
            rsvp_repo,
            community_repo,
            config,
        }
    }

    /// Clamp a requested radius to the configured bounds.
    #[must_use]
    pub fn clamp_radius(&self, radius_km: f64) -> f64 {
        radius_km.clamp(self.config.min_radius_km, self.config.max_radius_km)
    }

    /// All members of a community minus the exclusion set.
    pub async fn community_members(
        &self,
        community_id: &str,
        exclude: &HashSet<String>,
    ) -> AppResult<Vec<String>> {
        let members = self.community_repo.member_ids(community_id).await?;
        Ok(dedup_excluding(members, exclude))
    }

    /// Users with a going or maybe RSVP for an event, minus the exclusion
    /// set.
    pub async fn event_attendees(
        &self,
        event_id: &str,
        exclude: &HashSet<String>,
    ) -> AppResult<Vec<String>> {
        let attendees = self.rsvp_repo.attendee_ids(event_id).await?;
        Ok(dedup_excluding(attendees, exclude))
    }

    /// Users within `radius_km` of a coordinate, sorted ascending by
    /// distance.
    ///
    /// Users without stored coordinates are never matched. A user at a
    /// distance exactly equal to the radius is included. The radius is
    /// clamped to the configured bounds before matching.
    pub async fn within_radius(
        &self,
        latitude: f64,
        longitude: f64,
        radius_km: f64,
        exclude: &HashSet<String>,
    ) -> AppResult<Vec<GeoMatch>> {
        let radius_km = self.clamp_radius(radius_km);
        let candidates = self.user_repo.find_with_coordinates().await?;

        let mut matches: Vec<GeoMatch> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for user in candidates {
            if exclude.contains(&user.id) || !seen.insert(user.id.clone()) {
                continue;
            }
            let (Some(lat), Some(lon)) = (user.latitude, user.longitude) else {
                continue;
            };

            let distance = haversine_km(latitude, longitude, lat, lon);
            if distance <= radius_km {
                matches.push(GeoMatch {
                    user_id: user.id,
                    distance_km: round_one_decimal(distance),
                });
            }
        }

        matches.sort_by(|a, b| {
            a.distance_km
                .partial_cmp(&b.distance_km)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(matches)
    }
}

fn dedup_excluding(ids: Vec<String>, exclude: &HashSet<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.into_iter()
        .filter(|id| !exclude.contains(id) && seen.insert(id.clone()))
        .collect()
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use koinonia_db::entities::user;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn test_config() -> EngagementConfig {
        EngagementConfig {
            attendance_threshold: 20,
            proximity_radius_km: 10.0,
            min_radius_km: 1.0,
            max_radius_km: 100.0,
        }
    }

    fn user_at(id: &str, latitude: Option<f64>, longitude: Option<f64>) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: id.to_string(),
            username_lower: id.to_lowercase(),
            token: None,
            name: None,
            avatar_url: None,
            is_private: false,
            latitude,
            longitude,
            followers_count: 0,
            following_count: 0,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn resolver_with_users(users: Vec<user::Model>) -> AudienceResolver {
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([users])
                .into_connection(),
        );
        let rsvp_db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let community_db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        AudienceResolver::new(
            UserRepository::new(user_db),
            RsvpRepository::new(rsvp_db),
            CommunityRepository::new(community_db),
            test_config(),
        )
    }

    #[test]
    fn haversine_zero_for_same_point() {
        assert!(haversine_km(51.5, -0.12, 51.5, -0.12) < 1e-9);
    }

    #[test]
    fn haversine_one_degree_of_longitude_at_equator() {
        let d = haversine_km(0.0, 0.0, 0.0, 1.0);
        assert!((d - 111.19).abs() < 0.5, "got {d}");
    }

    #[test]
    fn radius_clamped_to_configured_bounds() {
        let resolver = resolver_with_users(vec![]);
        assert_eq!(resolver.clamp_radius(0.2), 1.0);
        assert_eq!(resolver.clamp_radius(500.0), 100.0);
        assert_eq!(resolver.clamp_radius(25.0), 25.0);
    }

    #[tokio::test]
    async fn within_radius_sorts_ascending_and_excludes() {
        // Roughly 0, 11 and 22 km north of the center.
        let users = vec![
            user_at("far", Some(0.2), Some(0.0)),
            user_at("center", Some(0.0), Some(0.0)),
            user_at("near", Some(0.1), Some(0.0)),
            user_at("excluded", Some(0.0), Some(0.0)),
        ];
        let resolver = resolver_with_users(users);
        let exclude: HashSet<String> = ["excluded".to_string()].into();

        let matches = resolver
            .within_radius(0.0, 0.0, 50.0, &exclude)
            .await
            .unwrap();

        let ids: Vec<&str> = matches.iter().map(|m| m.user_id.as_str()).collect();
        assert_eq!(ids, vec!["center", "near", "far"]);
        for pair in matches.windows(2) {
            assert!(pair[0].distance_km <= pair[1].distance_km);
        }
    }

    #[tokio::test]
    async fn within_radius_reports_one_decimal_place() {
        let users = vec![user_at("u1", Some(0.1), Some(0.0))];
        let resolver = resolver_with_users(users);

        let matches = resolver
            .within_radius(0.0, 0.0, 50.0, &HashSet::new())
            .await
            .unwrap();

        assert_eq!(matches.len(), 1);
        let d = matches[0].distance_km;
        assert_eq!(d, (d * 10.0).round() / 10.0);
    }

    #[tokio::test]
    async fn user_without_coordinates_is_never_matched() {
        let users = vec![
            user_at("no_coords", None, None),
            user_at("u1", Some(0.0), Some(0.0)),
        ];
        let resolver = resolver_with_users(users);

        let matches = resolver
            .within_radius(0.0, 0.0, 50.0, &HashSet::new())
            .await
            .unwrap();

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].user_id, "u1");
    }

    #[tokio::test]
    async fn community_members_applies_exclusion_set() {
        let community_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[
                    maplit::btreemap! {
                        "user_id" => sea_orm::Value::from("u1")
                    },
                    maplit::btreemap! {
                        "user_id" => sea_orm::Value::from("u2")
                    },
                    maplit::btreemap! {
                        "user_id" => sea_orm::Value::from("u1")
                    },
                ]])
                .into_connection(),
        );
        let resolver = AudienceResolver::new(
            UserRepository::new(Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
            )),
            RsvpRepository::new(Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
            )),
            CommunityRepository::new(community_db),
            test_config(),
        );
        let exclude: HashSet<String> = ["u2".to_string()].into();

        let members = resolver.community_members("c1", &exclude).await.unwrap();

        assert_eq!(members, vec!["u1".to_string()]);
    }

    #[tokio::test]
    async fn event_attendees_deduplicates() {
        let rsvp_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[
                    maplit::btreemap! {
                        "user_id" => sea_orm::Value::from("u1")
                    },
                    maplit::btreemap! {
                        "user_id" => sea_orm::Value::from("u1")
                    },
                    maplit::btreemap! {
                        "user_id" => sea_orm::Value::from("u3")
                    },
                ]])
                .into_connection(),
        );
        let resolver = AudienceResolver::new(
            UserRepository::new(Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
            )),
            RsvpRepository::new(rsvp_db),
            CommunityRepository::new(Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
            )),
            test_config(),
        );

        let attendees = resolver
            .event_attendees("e1", &HashSet::new())
            .await
            .unwrap();

        assert_eq!(attendees, vec!["u1".to_string(), "u3".to_string()]);
    }

    #[tokio::test]
    async fn user_at_exact_radius_is_included() {
        // 0.1 degrees of latitude is ~11.12 km; pass that exact distance as
        // the radius.
        let users = vec![user_at("edge", Some(0.1), Some(0.0))];
        let resolver = resolver_with_users(users);
        let exact = haversine_km(0.0, 0.0, 0.1, 0.0);

        let matches = resolver
            .within_radius(0.0, 0.0, exact, &HashSet::new())
            .await
            .unwrap();

        assert_eq!(matches.len(), 1);
    }
}
