//! Validation failures raised before any backend is invoked.
//!
//! A [`ValidationError`] always describes the caller's input. It is never
//! retried and never reaches a matrix provider or solver backend.

use thiserror::Error;

/// Malformed or inconsistent input detected during validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A fleet contained no vehicles.
    #[error("fleet must contain at least one vehicle")]
    EmptyFleet,
    /// Two vehicles shared an identifier.
    #[error("vehicle id `{id}` appears more than once in the fleet")]
    DuplicateVehicleId {
        /// The repeated identifier.
        id: String,
    },
    /// Vehicles declared capacity vectors of different lengths.
    #[error("vehicle `{vehicle}` has {found} capacity components, expected {expected}")]
    InconsistentCapacity {
        /// Offending vehicle identifier.
        vehicle: String,
        /// Component count of the first vehicle.
        expected: usize,
        /// Component count of the offending vehicle.
        found: usize,
    },
    /// A time window was reversed or not finite.
    #[error("time window [{start}, {end}] is invalid")]
    InvalidTimeWindow {
        /// Window start in seconds.
        start: f64,
        /// Window end in seconds.
        end: f64,
    },
    /// A service time was negative or not finite.
    #[error("service time {value} at node {index} must be a finite, non-negative number")]
    InvalidServiceTime {
        /// Node index.
        index: usize,
        /// Supplied value.
        value: f64,
    },
    /// No nodes were supplied.
    #[error("at least one node is required")]
    EmptyInput,
    /// A coordinate was not finite or outside the WGS84 range.
    #[error("coordinate {index} ({lon}, {lat}) is not a valid longitude/latitude pair")]
    InvalidCoordinate {
        /// Position of the coordinate in its slice.
        index: usize,
        /// Longitude.
        lon: f64,
        /// Latitude.
        lat: f64,
    },
    /// A matrix row had the wrong number of columns.
    #[error("matrix row {row} has {found} columns, expected {expected}")]
    RaggedMatrix {
        /// Row index.
        row: usize,
        /// Expected column count.
        expected: usize,
        /// Actual column count.
        found: usize,
    },
    /// A solve request carried a non-square matrix.
    #[error("matrix is {rows}x{columns} but must be square")]
    MatrixNotSquare {
        /// Row count.
        rows: usize,
        /// Column count.
        columns: usize,
    },
    /// A matrix entry was negative or not finite.
    #[error("matrix entry ({row}, {column}) = {value} must be finite and non-negative")]
    InvalidMatrixEntry {
        /// Row index.
        row: usize,
        /// Column index.
        column: usize,
        /// Offending value.
        value: f64,
    },
    /// A diagonal distance was not zero.
    #[error("matrix diagonal at {index} is {value}, expected zero")]
    NonZeroDiagonal {
        /// Diagonal index.
        index: usize,
        /// Offending value.
        value: f64,
    },
    /// Durations did not share the distance matrix shape.
    #[error("durations matrix shape does not match distances matrix shape")]
    DurationShapeMismatch,
    /// Neither a matrix nor coordinates were supplied.
    #[error("a solve request needs either a matrix or coordinates")]
    MissingDistanceSource,
    /// Both a matrix and coordinates were supplied.
    #[error("a solve request must not carry both a matrix and coordinates")]
    AmbiguousDistanceSource,
    /// The depot index fell outside the node range.
    #[error("depot index {depot} is out of bounds for {nodes} nodes")]
    DepotOutOfBounds {
        /// Requested depot index.
        depot: usize,
        /// Node count.
        nodes: usize,
    },
    /// A per-node array had the wrong length.
    #[error("`{field}` has {found} entries, expected {expected}")]
    LengthMismatch {
        /// Request field name.
        field: &'static str,
        /// Node count.
        expected: usize,
        /// Supplied length.
        found: usize,
    },
    /// The depot carried a non-zero demand.
    #[error("the depot must not carry a demand")]
    DepotDemand,
    /// A node reference fell outside the node range.
    #[error("`{field}` references node {index}, but only {nodes} nodes exist")]
    NodeOutOfBounds {
        /// Request field name.
        field: &'static str,
        /// Offending index.
        index: usize,
        /// Node count.
        nodes: usize,
    },
    /// A pickup-delivery pair was malformed.
    #[error("pickup-delivery pair ({pickup}, {delivery}) is invalid: {reason}")]
    InvalidPair {
        /// Pickup node.
        pickup: usize,
        /// Delivery node.
        delivery: usize,
        /// Why the pair was rejected.
        reason: &'static str,
    },
    /// A node took part in more than one pickup-delivery pair.
    #[error("node {index} appears in more than one pickup-delivery pair")]
    DuplicatePairNode {
        /// Repeated node index.
        index: usize,
    },
    /// A demand declared more components than the fleet capacity.
    #[error(
        "demand at node {index} has {dimensions} components but capacity has {capacity_dimensions}"
    )]
    DemandDimensions {
        /// Node index.
        index: usize,
        /// Demand component count.
        dimensions: usize,
        /// Fleet capacity component count.
        capacity_dimensions: usize,
    },
    /// Two nodes or waypoints shared an identifier.
    #[error("node id `{id}` appears more than once")]
    DuplicateNodeId {
        /// The repeated identifier.
        id: String,
    },
    /// Time windows were supplied without travel durations to check them.
    #[error("time windows require a durations matrix")]
    TimeWindowsWithoutDurations,
    /// A paired waypoint had no counterpart.
    #[error("waypoint `{id}` declares pair `{pair_id}` but has no matching counterpart")]
    UnpairedWaypoint {
        /// Waypoint identifier.
        id: String,
        /// Declared pair identifier.
        pair_id: String,
    },
    /// No waypoint was marked as the depot.
    #[error("exactly one waypoint must be marked as the depot, found none")]
    MissingDepot,
    /// More than one waypoint was marked as the depot.
    #[error("exactly one waypoint must be marked as the depot, found {count}")]
    MultipleDepots {
        /// Number of depot waypoints.
        count: usize,
    },
    /// Objective weights were negative, not finite, or all zero.
    #[error("objective weights must be finite, non-negative and not all zero")]
    InvalidObjective,
    /// The backend cannot represent the request.
    #[error("{backend} cannot model this request: {reason}")]
    Unsupported {
        /// Backend name.
        backend: &'static str,
        /// Limitation description.
        reason: String,
    },
}
