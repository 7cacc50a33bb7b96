//! OSRM API response types for the Table and Route services.
//!
//! See: <http://project-osrm.org/docs/v5.24.0/api/#table-service> and
//! <http://project-osrm.org/docs/v5.24.0/api/#route-service>.

use fleetroute_core::Coordinate;
use serde::Deserialize;

/// Status code OSRM reports on success.
pub(crate) const OK_CODE: &str = "Ok";

/// Status code OSRM reports when two points are not connected.
pub(crate) const NO_ROUTE_CODE: &str = "NoRoute";

/// OSRM Table API response.
///
/// `distances[i][j]` is in metres and `durations[i][j]` in seconds from the
/// i-th source to the j-th destination. Entries are `None` when no route
/// exists between a pair.
#[derive(Debug, Deserialize)]
pub(crate) struct TableResponse {
    /// Status code, e.g. `"Ok"`, `"InvalidQuery"` or `"NoTable"`.
    pub code: String,
    /// Error message when `code` is not `"Ok"`.
    pub message: Option<String>,
    pub distances: Option<Vec<Vec<Option<f64>>>>,
    pub durations: Option<Vec<Vec<Option<f64>>>>,
}

impl TableResponse {
    pub fn is_ok(&self) -> bool {
        self.code == OK_CODE
    }
}

/// OSRM Route API response requested with `geometries=geojson`.
#[derive(Debug, Deserialize)]
pub(crate) struct RouteResponse {
    pub code: String,
    pub message: Option<String>,
    #[serde(default)]
    pub routes: Vec<RouteEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RouteEntry {
    pub geometry: LineGeometry,
}

/// GeoJSON `LineString` with `[lon, lat]` positions.
#[derive(Debug, Deserialize)]
pub(crate) struct LineGeometry {
    pub coordinates: Vec<[f64; 2]>,
}

impl LineGeometry {
    pub fn points(&self) -> Vec<Coordinate> {
        self.coordinates
            .iter()
            .map(|[x, y]| Coordinate { x: *x, y: *y })
            .collect()
    }
}

/// Semicolon-separated `lon,lat` pairs as OSRM expects them in the path.
pub(crate) fn coordinate_list(coords: &[Coordinate]) -> String {
    coords
        .iter()
        .map(|coord| format!("{},{}", coord.x, coord.y))
        .collect::<Vec<_>>()
        .join(";")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn deserialise_table_with_nulls() {
        let json = r#"{
            "code": "Ok",
            "distances": [[0.0, null], [812.4, 0.0]],
            "durations": [[0.0, null], [90.1, 0.0]]
        }"#;
        let response: TableResponse = serde_json::from_str(json).expect("should deserialise");
        assert!(response.is_ok());
        let distances = response.distances.expect("distances present");
        assert_eq!(distances.first().and_then(|row| row.get(1)).copied(), Some(None));
        assert!(response.message.is_none());
    }

    #[rstest]
    fn deserialise_table_error() {
        let json = r#"{"code": "InvalidQuery", "message": "Coordinates are invalid"}"#;
        let response: TableResponse = serde_json::from_str(json).expect("should deserialise");
        assert!(!response.is_ok());
        assert_eq!(response.message.as_deref(), Some("Coordinates are invalid"));
        assert!(response.distances.is_none());
    }

    #[rstest]
    fn deserialise_route_geometry() {
        let json = r#"{
            "code": "Ok",
            "routes": [{"geometry": {"type": "LineString", "coordinates": [[-0.1, 51.5], [-0.15, 51.55]]}}]
        }"#;
        let response: RouteResponse = serde_json::from_str(json).expect("should deserialise");
        let points = response
            .routes
            .first()
            .map(|route| route.geometry.points())
            .expect("one route");
        assert_eq!(points, vec![
            Coordinate { x: -0.1, y: 51.5 },
            Coordinate { x: -0.15, y: 51.55 },
        ]);
    }

    #[rstest]
    fn coordinates_are_lon_lat_pairs() {
        let coords = [Coordinate { x: -0.1, y: 51.5 }, Coordinate { x: 2.0, y: 48.0 }];
        assert_eq!(coordinate_list(&coords), "-0.1,51.5;2,48");
    }
}
