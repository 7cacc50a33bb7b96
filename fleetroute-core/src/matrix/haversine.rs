//! Offline great-circle matrix adapter.

use geo::{Distance, Haversine, Point};
use log::debug;

use crate::Coordinate;

use super::{MatrixAdapter, MatrixError, MatrixResult, validate_coordinates};

/// Registry name of [`HaversineAdapter`].
pub const HAVERSINE_ADAPTER: &str = "haversine";

/// Great-circle distances with no network dependency.
///
/// Distances are populated from the haversine formula on the mean Earth
/// radius. Durations are only produced when a travel speed is configured, so
/// a bare adapter never fabricates travel times. The adapter ignores the
/// travel mode.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HaversineAdapter {
    speed_kmh: Option<f64>,
}

impl HaversineAdapter {
    /// An adapter that derives durations from a constant `speed_kmh`.
    ///
    /// Non-positive or non-finite speeds are ignored and no durations are
    /// produced.
    #[must_use]
    pub fn with_speed_kmh(speed_kmh: f64) -> Self {
        Self {
            speed_kmh: (speed_kmh.is_finite() && speed_kmh > 0.0).then_some(speed_kmh),
        }
    }

    /// Configured travel speed.
    #[must_use]
    pub const fn speed_kmh(&self) -> Option<f64> {
        self.speed_kmh
    }

    fn build(&self, origins: &[Coordinate], destinations: &[Coordinate]) -> MatrixResult {
        let distances: Vec<Vec<f64>> = origins
            .iter()
            .map(|from| {
                destinations
                    .iter()
                    .map(|to| great_circle(*from, *to))
                    .collect()
            })
            .collect();
        let durations = self.speed_kmh.map(|speed| {
            let metres_per_second = speed / 3.6;
            distances
                .iter()
                .map(|row| row.iter().map(|metres| metres / metres_per_second).collect())
                .collect()
        });
        MatrixResult {
            distances,
            durations,
            coordinates: None,
        }
    }
}

fn great_circle(from: Coordinate, to: Coordinate) -> f64 {
    if from == to {
        return 0.0;
    }
    Haversine.distance(Point::from(from), Point::from(to))
}

impl MatrixAdapter for HaversineAdapter {
    fn name(&self) -> &str {
        HAVERSINE_ADAPTER
    }

    fn matrix(
        &self,
        origins: &[Coordinate],
        destinations: &[Coordinate],
        _mode: &str,
    ) -> Result<MatrixResult, MatrixError> {
        validate_coordinates(origins)?;
        validate_coordinates(destinations)?;
        debug!(
            "computing {}x{} haversine matrix",
            origins.len(),
            destinations.len()
        );
        Ok(self.build(origins, destinations))
    }
}

/// Square haversine distance matrix over `coords`, echoing the coordinates.
///
/// Used when a solve request carries coordinates instead of a matrix.
///
/// # Errors
///
/// Returns a [`crate::ValidationError`] for empty or malformed coordinates.
pub fn haversine_matrix(coords: &[Coordinate]) -> Result<MatrixResult, crate::ValidationError> {
    validate_coordinates(coords)?;
    let mut matrix = HaversineAdapter::default().build(coords, coords);
    matrix.coordinates = Some(coords.to_vec());
    Ok(matrix)
}
