//! Segment snapper over the OSRM Route API.

use fleetroute_core::{Coordinate, SegmentSnapper, SnapError, UpstreamCause};

use super::http::{BlockingClient, ProviderBuildError};
use super::osrm::{NO_ROUTE_CODE, OK_CODE, RouteResponse, coordinate_list};
use super::table::{DEFAULT_PROFILE, HttpMatrixAdapterConfig};

/// Snaps route legs to the road network with OSRM's Route service.
///
/// Each leg is requested as
/// `{base_url}/route/v1/{profile}/{from};{to}?overview=full&geometries=geojson`
/// and the first route's geometry is returned. A `NoRoute` answer becomes
/// [`SnapError::NoRoute`]; every other failure is an upstream error, so
/// [`fleetroute_core::reconstruct_path`] can degrade the leg to a straight
/// line.
#[derive(Debug)]
pub struct OsrmSnapper {
    client: BlockingClient,
    base_url: String,
    profile: String,
}

impl OsrmSnapper {
    /// Snapper for the service at `base_url` with default settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the HTTP client or Tokio
    /// runtime fails to build.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ProviderBuildError> {
        Self::with_config(&HttpMatrixAdapterConfig::new(base_url))
    }

    /// Snapper sharing the matrix adapter's configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the HTTP client or Tokio
    /// runtime fails to build.
    pub fn with_config(config: &HttpMatrixAdapterConfig) -> Result<Self, ProviderBuildError> {
        let (client, base_url) = config.client()?;
        Ok(Self {
            client,
            base_url,
            profile: DEFAULT_PROFILE.to_owned(),
        })
    }

    /// Use the OSRM `profile` (e.g. `"cycling"`) instead of `"driving"`.
    #[must_use]
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }

    fn route_url(&self, from: Coordinate, to: Coordinate) -> String {
        format!(
            "{}/route/v1/{}/{}?overview=full&geometries=geojson",
            self.base_url,
            self.profile,
            coordinate_list(&[from, to]),
        )
    }
}

fn snap_error(cause: UpstreamCause) -> SnapError {
    match cause {
        UpstreamCause::Service { code, message } if code == NO_ROUTE_CODE => {
            SnapError::NoRoute { message }
        }
        other => SnapError::Upstream(other),
    }
}

fn convert_response(response: RouteResponse) -> Result<Vec<Coordinate>, SnapError> {
    if response.code != OK_CODE {
        return Err(snap_error(UpstreamCause::Service {
            code: response.code,
            message: response.message.unwrap_or_default(),
        }));
    }
    response
        .routes
        .first()
        .map(|route| route.geometry.points())
        .filter(|points| !points.is_empty())
        .ok_or_else(|| SnapError::NoRoute {
            message: "OSRM returned no route geometry".to_owned(),
        })
}

impl SegmentSnapper for OsrmSnapper {
    fn snap(&self, from: Coordinate, to: Coordinate) -> Result<Vec<Coordinate>, SnapError> {
        let response: RouteResponse = self
            .client
            .get_json(&self.route_url(from, to))
            .map_err(snap_error)?;
        convert_response(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::osrm::{LineGeometry, RouteEntry};
    use rstest::rstest;

    #[rstest]
    fn route_url_uses_profile() {
        let snapper = OsrmSnapper::new("http://osrm.example.com")
            .expect("snapper should build")
            .with_profile("cycling");
        let url = snapper.route_url(Coordinate { x: 1.0, y: 2.0 }, Coordinate { x: 3.0, y: 4.0 });
        assert_eq!(
            url,
            "http://osrm.example.com/route/v1/cycling/1,2;3,4?overview=full&geometries=geojson"
        );
    }

    #[rstest]
    fn no_route_is_distinguished_from_upstream_failures() {
        let no_route = snap_error(UpstreamCause::Service {
            code: "NoRoute".to_owned(),
            message: "Impossible route between points".to_owned(),
        });
        assert!(matches!(no_route, SnapError::NoRoute { .. }));
        let parse = snap_error(UpstreamCause::Parse {
            message: "bad json".to_owned(),
        });
        assert!(matches!(parse, SnapError::Upstream(UpstreamCause::Parse { .. })));
    }

    #[rstest]
    fn empty_routes_are_no_route() {
        let response = RouteResponse {
            code: "Ok".to_owned(),
            message: None,
            routes: Vec::new(),
        };
        assert!(matches!(
            convert_response(response),
            Err(SnapError::NoRoute { .. })
        ));
    }

    #[rstest]
    fn geometry_is_returned_in_order() {
        let response = RouteResponse {
            code: "Ok".to_owned(),
            message: None,
            routes: vec![RouteEntry {
                geometry: LineGeometry {
                    coordinates: vec![[0.0, 0.0], [0.5, 0.1], [1.0, 0.0]],
                },
            }],
        };
        let points = convert_response(response).expect("geometry present");
        assert_eq!(points.len(), 3);
        assert_eq!(points.get(1), Some(&Coordinate { x: 0.5, y: 0.1 }));
    }
}
