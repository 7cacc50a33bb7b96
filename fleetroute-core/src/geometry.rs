//! Display-path reconstruction from ordered stops.
//!
//! A [`SegmentSnapper`] turns one leg between consecutive stops into a
//! road-following polyline. [`reconstruct_path`] snaps every leg in order and
//! falls back to a straight line for any leg whose snap fails, so the path
//! always runs end to end.

use geo::LineString;
use log::warn;
use thiserror::Error;

use crate::{Coordinate, Route, SolveRequest, UpstreamCause};

/// Why a segment could not be snapped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapError {
    /// The provider found no route between the two points.
    #[error("no route between stops: {message}")]
    NoRoute {
        /// Provider message.
        message: String,
    },
    /// The provider failed.
    #[error(transparent)]
    Upstream(#[from] UpstreamCause),
}

/// Snap one leg between two stops to the road network.
pub trait SegmentSnapper: Send + Sync {
    /// Polyline from `from` to `to`.
    ///
    /// # Errors
    ///
    /// Returns a [`SnapError`] when the leg cannot be snapped.
    fn snap(&self, from: Coordinate, to: Coordinate) -> Result<Vec<Coordinate>, SnapError>;
}

/// Metadata about one leg of a [`DisplayPath`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SegmentInfo {
    /// Index of the leg's first stop.
    pub from_stop: usize,
    /// Index of the leg's last stop.
    pub to_stop: usize,
    /// Whether the leg is a straight-line substitute.
    pub degraded: bool,
    /// Snap failure behind a degraded leg.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub error: Option<String>,
    /// Number of points the leg contributed to the path.
    pub points: usize,
}

/// A continuous path through ordered stops.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DisplayPath {
    /// The stops, unchanged and in order.
    #[cfg_attr(feature = "serde", serde(with = "crate::serde_support::lon_lat_seq"))]
    pub stops: Vec<Coordinate>,
    /// Concatenated polyline.
    #[cfg_attr(feature = "serde", serde(with = "crate::serde_support::lon_lat_seq"))]
    pub path: Vec<Coordinate>,
    /// One entry per leg.
    pub segments: Vec<SegmentInfo>,
}

impl DisplayPath {
    /// Whether any leg fell back to a straight line.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.segments.iter().any(|segment| segment.degraded)
    }

    /// The path as a `geo` line string.
    #[must_use]
    pub fn line_string(&self) -> LineString<f64> {
        LineString::new(self.path.clone())
    }
}

/// Snap every leg between consecutive `stops` and join them.
///
/// A leg whose snap fails, or yields no points, becomes a straight line and
/// is flagged degraded with the failure message. A point shared by the end
/// of one leg and the start of the next appears once.
///
/// # Examples
///
/// ```
/// use geo::Coord;
/// use fleetroute_core::{Coordinate, SegmentSnapper, SnapError, reconstruct_path};
///
/// struct Direct;
///
/// impl SegmentSnapper for Direct {
///     fn snap(&self, from: Coordinate, to: Coordinate) -> Result<Vec<Coordinate>, SnapError> {
///         Ok(vec![from, to])
///     }
/// }
///
/// let stops = [
///     Coord { x: 0.0, y: 0.0 },
///     Coord { x: 1.0, y: 0.0 },
///     Coord { x: 1.0, y: 1.0 },
/// ];
/// let path = reconstruct_path(&stops, &Direct);
/// assert_eq!(path.path.len(), 3);
/// assert_eq!(path.segments.len(), 2);
/// assert!(!path.is_degraded());
/// ```
#[must_use]
pub fn reconstruct_path(stops: &[Coordinate], snapper: &dyn SegmentSnapper) -> DisplayPath {
    let mut path: Vec<Coordinate> = Vec::new();
    let mut segments = Vec::with_capacity(stops.len().saturating_sub(1));
    for (from_stop, leg) in stops.windows(2).enumerate() {
        let [from, to] = *leg else { continue };
        let (points, error) = match snapper.snap(from, to) {
            Ok(points) if !points.is_empty() => (points, None),
            Ok(_) => (vec![from, to], Some("snapper returned no points".to_owned())),
            Err(err) => {
                warn!("segment {from_stop} degraded to a straight line: {err}");
                (vec![from, to], Some(err.to_string()))
            }
        };
        let skip = usize::from(path.last() == points.first());
        let added = points.len() - skip;
        path.extend(points.into_iter().skip(skip));
        segments.push(SegmentInfo {
            from_stop,
            to_stop: from_stop + 1,
            degraded: error.is_some(),
            error,
            points: added,
        });
    }
    if let ([only], true) = (stops, path.is_empty()) {
        path.push(*only);
    }
    DisplayPath {
        stops: stops.to_vec(),
        path,
        segments,
    }
}

/// Display path for a solved route, when the request carries coordinates.
///
/// Returns `None` for index-only requests or routes naming unknown nodes.
#[must_use]
pub fn route_path(
    route: &Route,
    request: &SolveRequest,
    snapper: &dyn SegmentSnapper,
) -> Option<DisplayPath> {
    let coords = request.coordinates_hint()?;
    let stops = route
        .nodes
        .iter()
        .map(|node| coords.get(*node).copied())
        .collect::<Option<Vec<_>>>()?;
    Some(reconstruct_path(&stops, snapper))
}
