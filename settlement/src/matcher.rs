//! Room matching
//!
//! Filters open rooms by departure time window, seat availability, and
//! geographic proximity. The bounding box is a superset prefilter only;
//! the exact great-circle distance decides membership. Results are
//! ordered by departure time, soonest first.

use crate::store::RoomStore;
use crate::types::{GeoPoint, Room, RoomPriority};
use crate::Result;
use chrono::{DateTime, Utc};

/// Kilometres per degree of latitude
const KM_PER_DEGREE_LAT: f64 = 111.0;

/// Clamp for the longitude scale near the poles
const MIN_COS_LAT: f64 = 0.0001;

/// Mean Earth radius in kilometres
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Room search query
#[derive(Debug, Clone)]
pub struct MatchQuery {
    /// Search center; geographic filtering is skipped when absent
    pub center: Option<GeoPoint>,

    /// Search radius in kilometres
    pub radius_km: f64,

    /// Earliest acceptable departure
    pub earliest: Option<DateTime<Utc>>,

    /// Latest acceptable departure
    pub latest: Option<DateTime<Utc>>,

    /// Seats the searcher needs
    pub seats_needed: usize,

    /// Restrict to rooms with this priority tag
    pub priority: Option<RoomPriority>,
}

impl MatchQuery {
    /// Query around a center point with default radius and seat count
    pub fn near(center: GeoPoint) -> Self {
        Self {
            center: Some(center),
            radius_km: 3.0,
            earliest: None,
            latest: None,
            seats_needed: 1,
            priority: None,
        }
    }
}

/// Axis-aligned degree box covering a radius around a point
#[derive(Debug, Clone, Copy)]
struct BoundingBox {
    lat_min: f64,
    lat_max: f64,
    lng_min: f64,
    lng_max: f64,
}

impl BoundingBox {
    /// Box around `center` covering `radius_km` in every direction
    ///
    /// Longitude degree width shrinks with latitude; the cosine is
    /// clamped away from zero so the box stays finite at the poles.
    fn around(center: GeoPoint, radius_km: f64) -> Self {
        let lat_delta = radius_km / KM_PER_DEGREE_LAT;
        let lng_delta =
            radius_km / (KM_PER_DEGREE_LAT * center.lat.to_radians().cos().max(MIN_COS_LAT));

        Self {
            lat_min: center.lat - lat_delta,
            lat_max: center.lat + lat_delta,
            lng_min: center.lng - lng_delta,
            lng_max: center.lng + lng_delta,
        }
    }

    fn contains(&self, point: GeoPoint) -> bool {
        point.lat >= self.lat_min
            && point.lat <= self.lat_max
            && point.lng >= self.lng_min
            && point.lng <= self.lng_max
    }
}

/// Great-circle distance between two points in kilometres
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Find open rooms matching the query, soonest departure first
pub fn match_rooms(store: &dyn RoomStore, query: &MatchQuery) -> Result<Vec<Room>> {
    let bounding_box = query
        .center
        .map(|center| BoundingBox::around(center, query.radius_km));

    let mut matched: Vec<Room> = store
        .list_open()?
        .into_iter()
        .filter(|room| room_matches(room, query, bounding_box))
        .collect();

    matched.sort_by_key(|room| room.departure_time);

    tracing::debug!(count = matched.len(), "Room match complete");

    Ok(matched)
}

fn room_matches(room: &Room, query: &MatchQuery, bounding_box: Option<BoundingBox>) -> bool {
    if let Some(priority) = query.priority {
        if room.priority != priority {
            return false;
        }
    }

    if let Some(earliest) = query.earliest {
        if room.departure_time < earliest {
            return false;
        }
    }
    if let Some(latest) = query.latest {
        if room.departure_time > latest {
            return false;
        }
    }

    if room.seats_available() < query.seats_needed {
        return false;
    }

    // Cheap box first, exact distance second
    if let (Some(bounding_box), Some(center)) = (bounding_box, query.center) {
        if !bounding_box.contains(room.departure) {
            return false;
        }
        if haversine_km(center, room.departure) > query.radius_km {
            return false;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryRoomStore;
    use crate::types::{RoomStatus, SettlementStatus};
    use chrono::Duration;
    use wallet_core::{RoomId, UserId};

    const SEOUL_STATION: GeoPoint = GeoPoint {
        lat: 37.5547,
        lng: 126.9706,
    };

    fn room_at(id: &str, point: GeoPoint, minutes_out: i64) -> Room {
        Room {
            room_id: RoomId::new(id),
            title: id.to_string(),
            host: UserId::new("host"),
            participants: vec![],
            capacity: 4,
            status: RoomStatus::Open,
            priority: RoomPriority::Time,
            departure: point,
            departure_time: Utc::now() + Duration::minutes(minutes_out),
            estimated_fare: None,
            actual_fare: None,
            settlement_status: SettlementStatus::None,
            no_show_user_ids: vec![],
        }
    }

    #[test]
    fn test_haversine_known_distance() {
        // Seoul Station to Gangnam Station, roughly 9.5 km
        let gangnam = GeoPoint {
            lat: 37.4979,
            lng: 127.0276,
        };
        let d = haversine_km(SEOUL_STATION, gangnam);
        assert!(d > 8.0 && d < 11.0, "got {}", d);

        assert!(haversine_km(SEOUL_STATION, SEOUL_STATION) < 1e-9);
    }

    #[test]
    fn test_bounding_box_never_excludes_true_match() {
        // Any point within the radius must fall inside the box
        let center = SEOUL_STATION;
        let bounding_box = BoundingBox::around(center, 3.0);

        for (dlat, dlng) in [(0.01, 0.0), (0.0, 0.02), (-0.015, 0.01), (0.02, -0.02)] {
            let p = GeoPoint {
                lat: center.lat + dlat,
                lng: center.lng + dlng,
            };
            if haversine_km(center, p) <= 3.0 {
                assert!(bounding_box.contains(p));
            }
        }
    }

    #[test]
    fn test_match_filters_by_distance() {
        let store = MemoryRoomStore::new();
        let near = GeoPoint {
            lat: SEOUL_STATION.lat + 0.005,
            lng: SEOUL_STATION.lng,
        };
        let far = GeoPoint {
            lat: SEOUL_STATION.lat + 0.5,
            lng: SEOUL_STATION.lng,
        };
        store.put(room_at("near", near, 30)).unwrap();
        store.put(room_at("far", far, 30)).unwrap();

        let matched = match_rooms(&store, &MatchQuery::near(SEOUL_STATION)).unwrap();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].room_id, RoomId::new("near"));
    }

    #[test]
    fn test_match_filters_by_seats() {
        let store = MemoryRoomStore::new();
        let mut room = room_at("full-ish", SEOUL_STATION, 30);
        room.participants = vec![UserId::new("g1"), UserId::new("g2"), UserId::new("g3")];
        store.put(room).unwrap();

        let mut query = MatchQuery::near(SEOUL_STATION);
        query.seats_needed = 1;
        assert!(match_rooms(&store, &query).unwrap().is_empty());
    }

    #[test]
    fn test_match_filters_by_time_window() {
        let store = MemoryRoomStore::new();
        store.put(room_at("soon", SEOUL_STATION, 10)).unwrap();
        store.put(room_at("later", SEOUL_STATION, 300)).unwrap();

        let mut query = MatchQuery::near(SEOUL_STATION);
        query.latest = Some(Utc::now() + Duration::minutes(60));

        let matched = match_rooms(&store, &query).unwrap();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].room_id, RoomId::new("soon"));
    }

    #[test]
    fn test_match_orders_by_departure_time() {
        let store = MemoryRoomStore::new();
        store.put(room_at("later", SEOUL_STATION, 120)).unwrap();
        store.put(room_at("soon", SEOUL_STATION, 15)).unwrap();
        store.put(room_at("middle", SEOUL_STATION, 60)).unwrap();

        let matched = match_rooms(&store, &MatchQuery::near(SEOUL_STATION)).unwrap();
        let ids: Vec<_> = matched.iter().map(|r| r.room_id.as_str()).collect();
        assert_eq!(ids, vec!["soon", "middle", "later"]);
    }

    #[test]
    fn test_no_center_skips_geo_filter() {
        let store = MemoryRoomStore::new();
        store.put(room_at("anywhere", SEOUL_STATION, 30)).unwrap();

        let query = MatchQuery {
            center: None,
            radius_km: 3.0,
            earliest: None,
            latest: None,
            seats_needed: 1,
            priority: None,
        };
        assert_eq!(match_rooms(&store, &query).unwrap().len(), 1);
    }
}
