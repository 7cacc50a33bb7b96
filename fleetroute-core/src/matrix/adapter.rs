//! The matrix adapter trait.

use crate::{Coordinate, ValidationError};

use super::{MatrixError, MatrixResult};

/// Produce distance (and optionally duration) matrices for coordinate sets.
///
/// `distances[i][j]` is the distance in metres from `origins[i]` to
/// `destinations[j]`. Durations, in seconds, are populated only when the
/// provider supplies them and are never fabricated.
///
/// Implementations must reject malformed coordinates with
/// [`MatrixError::Validation`] before contacting any backend, and must bound
/// every network call with a timeout.
///
/// # Examples
///
/// ```
/// use geo::Coord;
/// use fleetroute_core::{HaversineAdapter, MatrixAdapter};
///
/// let points = [Coord { x: 0.0, y: 0.0 }, Coord { x: 0.0, y: 1.0 }];
/// let matrix = HaversineAdapter::default().matrix(&points, &points, "driving")?;
/// assert!(matrix.durations().is_none());
/// assert!((matrix.distance(0, 1).unwrap_or_default() - 111_195.0).abs() < 1.0);
/// # Ok::<(), fleetroute_core::MatrixError>(())
/// ```
pub trait MatrixAdapter: Send + Sync {
    /// Registry name of this adapter.
    fn name(&self) -> &str;

    /// Compute the matrix from `origins` to `destinations` for a travel `mode`.
    ///
    /// # Errors
    ///
    /// Returns [`MatrixError::Validation`] for empty or malformed input and
    /// [`MatrixError::Upstream`] when the provider fails.
    fn matrix(
        &self,
        origins: &[Coordinate],
        destinations: &[Coordinate],
        mode: &str,
    ) -> Result<MatrixResult, MatrixError>;
}

/// Check that `coords` is non-empty and every entry is a WGS84 position.
///
/// # Errors
///
/// Returns [`ValidationError::EmptyInput`] for an empty slice and
/// [`ValidationError::InvalidCoordinate`] for the first out-of-range entry.
pub fn validate_coordinates(coords: &[Coordinate]) -> Result<(), ValidationError> {
    if coords.is_empty() {
        return Err(ValidationError::EmptyInput);
    }
    for (index, coord) in coords.iter().enumerate() {
        let valid = coord.x.is_finite()
            && coord.y.is_finite()
            && (-180.0..=180.0).contains(&coord.x)
            && (-90.0..=90.0).contains(&coord.y);
        if !valid {
            return Err(ValidationError::InvalidCoordinate {
                index,
                lon: coord.x,
                lat: coord.y,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Coord;
    use rstest::rstest;

    #[rstest]
    #[case(Coord { x: 181.0, y: 0.0 })]
    #[case(Coord { x: 0.0, y: -90.5 })]
    #[case(Coord { x: f64::NAN, y: 0.0 })]
    #[case(Coord { x: 0.0, y: f64::INFINITY })]
    fn rejects_out_of_range(#[case] bad: Coordinate) {
        let coords = [Coord { x: 0.0, y: 0.0 }, bad];
        let err = validate_coordinates(&coords).expect_err("coordinate should be rejected");
        assert!(matches!(err, ValidationError::InvalidCoordinate { index: 1, .. }));
    }

    #[rstest]
    fn rejects_empty_input() {
        assert_eq!(validate_coordinates(&[]), Err(ValidationError::EmptyInput));
    }

    #[rstest]
    fn accepts_boundaries() {
        let coords = [Coord { x: -180.0, y: -90.0 }, Coord { x: 180.0, y: 90.0 }];
        assert!(validate_coordinates(&coords).is_ok());
    }
}
