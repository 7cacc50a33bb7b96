//! Validated distance and duration matrices.

use crate::{Coordinate, ValidationError};

/// Distances in metres with optional durations in seconds.
///
/// Every row has the same length, every entry is finite and non-negative,
/// and durations, when present, share the distances' shape. Matrices used in
/// a solve must additionally be square with a zero diagonal; see
/// [`MatrixResult::validate_square`].
///
/// # Examples
///
/// ```
/// use fleetroute_core::MatrixResult;
///
/// let matrix = MatrixResult::new(vec![vec![0.0, 5.0], vec![5.0, 0.0]], None)?;
/// assert_eq!(matrix.distance(0, 1), Some(5.0));
/// assert!(MatrixResult::new(vec![vec![0.0, -1.0], vec![1.0, 0.0]], None).is_err());
/// # Ok::<(), fleetroute_core::ValidationError>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawMatrix"))]
pub struct MatrixResult {
    pub(crate) distances: Vec<Vec<f64>>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub(crate) durations: Option<Vec<Vec<f64>>>,
    #[cfg_attr(
        feature = "serde",
        serde(
            skip_serializing_if = "Option::is_none",
            with = "crate::serde_support::lon_lat_seq_opt"
        )
    )]
    pub(crate) coordinates: Option<Vec<Coordinate>>,
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawMatrix {
    distances: Vec<Vec<f64>>,
    #[serde(default)]
    durations: Option<Vec<Vec<f64>>>,
    #[serde(default, with = "crate::serde_support::lon_lat_seq_opt")]
    coordinates: Option<Vec<Coordinate>>,
}

#[cfg(feature = "serde")]
impl TryFrom<RawMatrix> for MatrixResult {
    type Error = ValidationError;

    fn try_from(raw: RawMatrix) -> Result<Self, Self::Error> {
        let matrix = Self::new(raw.distances, raw.durations)?;
        match raw.coordinates {
            Some(coords) => matrix.with_coordinates(coords),
            None => Ok(matrix),
        }
    }
}

fn check_grid(grid: &[Vec<f64>]) -> Result<usize, ValidationError> {
    let columns = grid.first().map_or(0, Vec::len);
    for (row, values) in grid.iter().enumerate() {
        if values.len() != columns {
            return Err(ValidationError::RaggedMatrix {
                row,
                expected: columns,
                found: values.len(),
            });
        }
        if let Some((column, value)) = values
            .iter()
            .enumerate()
            .find(|(_, value)| !value.is_finite() || **value < 0.0)
        {
            return Err(ValidationError::InvalidMatrixEntry {
                row,
                column,
                value: *value,
            });
        }
    }
    Ok(columns)
}

impl MatrixResult {
    /// Validate and build a matrix.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for an empty, ragged or negative
    /// distances matrix, or durations of a different shape.
    pub fn new(
        distances: Vec<Vec<f64>>,
        durations: Option<Vec<Vec<f64>>>,
    ) -> Result<Self, ValidationError> {
        if distances.is_empty() {
            return Err(ValidationError::EmptyInput);
        }
        let columns = check_grid(&distances)?;
        if let Some(times) = &durations {
            let same_rows = times.len() == distances.len();
            let time_columns = check_grid(times)?;
            if !same_rows || time_columns != columns {
                return Err(ValidationError::DurationShapeMismatch);
            }
        }
        Ok(Self {
            distances,
            durations,
            coordinates: None,
        })
    }

    /// Attach the coordinates the matrix was computed for.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::LengthMismatch`] unless there is one
    /// coordinate per row.
    pub fn with_coordinates(
        mut self,
        coordinates: Vec<Coordinate>,
    ) -> Result<Self, ValidationError> {
        if coordinates.len() != self.rows() {
            return Err(ValidationError::LengthMismatch {
                field: "coordinates",
                expected: self.rows(),
                found: coordinates.len(),
            });
        }
        self.coordinates = Some(coordinates);
        Ok(self)
    }

    /// Distances in metres, row-major.
    #[must_use]
    pub fn distances(&self) -> &[Vec<f64>] {
        &self.distances
    }

    /// Durations in seconds, when the provider supplied them.
    #[must_use]
    pub fn durations(&self) -> Option<&[Vec<f64>]> {
        self.durations.as_deref()
    }

    /// Echo of the coordinates the matrix was computed for.
    #[must_use]
    pub fn coordinates(&self) -> Option<&[Coordinate]> {
        self.coordinates.as_deref()
    }

    /// Number of origins.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.distances.len()
    }

    /// Number of destinations.
    #[must_use]
    pub fn columns(&self) -> usize {
        self.distances.first().map_or(0, Vec::len)
    }

    /// Whether the matrix has as many rows as columns.
    #[must_use]
    pub fn is_square(&self) -> bool {
        self.rows() == self.columns()
    }

    /// Check the solve-time invariants: square with a zero diagonal.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MatrixNotSquare`] or
    /// [`ValidationError::NonZeroDiagonal`].
    pub fn validate_square(&self) -> Result<(), ValidationError> {
        if !self.is_square() {
            return Err(ValidationError::MatrixNotSquare {
                rows: self.rows(),
                columns: self.columns(),
            });
        }
        for (index, row) in self.distances.iter().enumerate() {
            let value = row.get(index).copied().unwrap_or_default();
            if value != 0.0 {
                return Err(ValidationError::NonZeroDiagonal { index, value });
            }
        }
        Ok(())
    }

    /// Distance from `from` to `to`, if both indices exist.
    #[must_use]
    pub fn distance(&self, from: usize, to: usize) -> Option<f64> {
        self.distances.get(from)?.get(to).copied()
    }

    /// Duration from `from` to `to`, if durations exist and both indices do.
    #[must_use]
    pub fn duration(&self, from: usize, to: usize) -> Option<f64> {
        self.durations.as_ref()?.get(from)?.get(to).copied()
    }
}
