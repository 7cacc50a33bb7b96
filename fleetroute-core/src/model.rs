//! Waypoints, vehicles and fleets.
//!
//! These models validate on construction and, when the `serde` feature is
//! enabled, on deserialisation, so a [`Fleet`] or [`TimeWindow`] value in
//! hand is always well formed.

use std::collections::HashSet;

use geo::Coord;

use crate::ValidationError;

/// A WGS84 position with `x` as longitude and `y` as latitude.
pub type Coordinate = Coord<f64>;

/// A non-negative, multi-component quantity used for demands and capacities.
///
/// Components beyond the stored length compare as zero, so a scalar demand
/// can be checked against a multi-component capacity.
///
/// # Examples
///
/// ```
/// use fleetroute_core::Load;
///
/// let capacity = Load::new(vec![10, 4]);
/// let demand = Load::scalar(7);
/// assert!(demand.fits_within(&capacity));
/// assert!(!Load::new(vec![0, 5]).fits_within(&capacity));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "LoadRepr", into = "Vec<u32>"))]
pub struct Load(Vec<u32>);

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
#[serde(untagged)]
enum LoadRepr {
    Scalar(u32),
    Vector(Vec<u32>),
}

#[cfg(feature = "serde")]
impl From<LoadRepr> for Load {
    fn from(repr: LoadRepr) -> Self {
        match repr {
            LoadRepr::Scalar(value) => Self::scalar(value),
            LoadRepr::Vector(values) => Self(values),
        }
    }
}

impl From<Load> for Vec<u32> {
    fn from(load: Load) -> Self {
        load.0
    }
}

static EMPTY_LOAD: Load = Load(Vec::new());

impl Load {
    /// Build a load from explicit components.
    #[must_use]
    pub const fn new(components: Vec<u32>) -> Self {
        Self(components)
    }

    /// Build a single-component load.
    #[must_use]
    pub fn scalar(value: u32) -> Self {
        Self(vec![value])
    }

    /// A load with no components, equal to zero in every dimension.
    #[must_use]
    pub const fn zero() -> Self {
        Self(Vec::new())
    }

    pub(crate) const fn empty_ref() -> &'static Self {
        &EMPTY_LOAD
    }

    /// Stored components.
    #[must_use]
    pub fn components(&self) -> &[u32] {
        &self.0
    }

    /// Number of stored components.
    #[must_use]
    pub fn dimensions(&self) -> usize {
        self.0.len()
    }

    /// Component `index`, or zero when not stored.
    #[must_use]
    pub fn component(&self, index: usize) -> u32 {
        self.0.get(index).copied().unwrap_or(0)
    }

    /// Whether every component is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|value| *value == 0)
    }

    /// Whether every component is at most the matching `capacity` component.
    #[must_use]
    pub fn fits_within(&self, capacity: &Self) -> bool {
        let width = self.dimensions().max(capacity.dimensions());
        (0..width).all(|idx| self.component(idx) <= capacity.component(idx))
    }

    /// Component-wise saturating sum.
    #[must_use]
    pub fn plus(&self, other: &Self) -> Self {
        let width = self.dimensions().max(other.dimensions());
        Self(
            (0..width)
                .map(|idx| self.component(idx).saturating_add(other.component(idx)))
                .collect(),
        )
    }

    /// Component-wise saturating difference.
    #[must_use]
    pub fn minus(&self, other: &Self) -> Self {
        let width = self.dimensions().max(other.dimensions());
        Self(
            (0..width)
                .map(|idx| self.component(idx).saturating_sub(other.component(idx)))
                .collect(),
        )
    }

    /// Components widened to `width`, padding with zero.
    #[must_use]
    pub fn padded(&self, width: usize) -> Vec<u32> {
        (0..width.max(self.dimensions()))
            .map(|idx| self.component(idx))
            .collect()
    }
}

/// An inclusive `[start, end]` interval in seconds.
///
/// Serialised as a two-element array.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "[f64; 2]", into = "[f64; 2]"))]
pub struct TimeWindow {
    start: f64,
    end: f64,
}

impl TimeWindow {
    /// Validate and build a window.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidTimeWindow`] when either bound is not
    /// finite, `start` is negative, or `start > end`.
    pub fn new(start: f64, end: f64) -> Result<Self, ValidationError> {
        if !start.is_finite() || !end.is_finite() || start < 0.0 || start > end {
            return Err(ValidationError::InvalidTimeWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// Earliest service start.
    #[must_use]
    pub const fn start(&self) -> f64 {
        self.start
    }

    /// Latest service start.
    #[must_use]
    pub const fn end(&self) -> f64 {
        self.end
    }

    /// Whether `time` lies inside the window.
    #[must_use]
    pub fn contains(&self, time: f64) -> bool {
        (self.start..=self.end).contains(&time)
    }
}

impl TryFrom<[f64; 2]> for TimeWindow {
    type Error = ValidationError;

    fn try_from([start, end]: [f64; 2]) -> Result<Self, Self::Error> {
        Self::new(start, end)
    }
}

impl From<TimeWindow> for [f64; 2] {
    fn from(window: TimeWindow) -> Self {
        [window.start, window.end]
    }
}

/// What a waypoint represents in the plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum WaypointRole {
    /// Start and end of vehicle routes.
    Depot,
    /// Goods are collected here and carried to the paired delivery.
    Pickup,
    /// Goods collected at the paired pickup are dropped here.
    Delivery,
    /// An ordinary visit.
    #[default]
    Stop,
}

/// A location to visit, with its demand and service constraints.
///
/// # Examples
///
/// ```
/// use geo::Coord;
/// use fleetroute_core::{Load, Waypoint, WaypointRole};
///
/// let pickup = Waypoint::stop("p1", Coord { x: -0.1, y: 51.5 })
///     .with_demand(Load::scalar(3))
///     .into_pickup("order-7");
/// assert_eq!(pickup.role, WaypointRole::Pickup);
/// assert_eq!(pickup.pair_id.as_deref(), Some("order-7"));
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Waypoint {
    /// Identifier, unique within a request.
    pub id: String,
    /// Geographic position.
    #[cfg_attr(
        feature = "serde",
        serde(rename = "coordinates", with = "crate::serde_support::lon_lat")
    )]
    pub location: Coordinate,
    /// Quantity loaded for this visit.
    #[cfg_attr(feature = "serde", serde(default))]
    pub demand: Load,
    /// Seconds spent on site.
    #[cfg_attr(feature = "serde", serde(default))]
    pub service_time: f64,
    /// Window in which service must start.
    #[cfg_attr(feature = "serde", serde(default))]
    pub time_window: Option<TimeWindow>,
    /// Whether this waypoint is the depot.
    #[cfg_attr(feature = "serde", serde(default))]
    pub is_depot: bool,
    /// Links a pickup to its delivery.
    #[cfg_attr(feature = "serde", serde(default))]
    pub pair_id: Option<String>,
    /// Role in the plan.
    #[cfg_attr(feature = "serde", serde(default))]
    pub role: WaypointRole,
}

impl Waypoint {
    /// An ordinary stop with no demand or constraints.
    #[must_use]
    pub fn stop(id: impl Into<String>, location: Coordinate) -> Self {
        Self {
            id: id.into(),
            location,
            demand: Load::zero(),
            service_time: 0.0,
            time_window: None,
            is_depot: false,
            pair_id: None,
            role: WaypointRole::Stop,
        }
    }

    /// A depot waypoint.
    #[must_use]
    pub fn depot(id: impl Into<String>, location: Coordinate) -> Self {
        Self {
            is_depot: true,
            role: WaypointRole::Depot,
            ..Self::stop(id, location)
        }
    }

    /// Set the demand.
    #[must_use]
    pub fn with_demand(mut self, demand: Load) -> Self {
        self.demand = demand;
        self
    }

    /// Set the on-site service time in seconds.
    #[must_use]
    pub const fn with_service_time(mut self, seconds: f64) -> Self {
        self.service_time = seconds;
        self
    }

    /// Set the service time window.
    #[must_use]
    pub const fn with_time_window(mut self, window: TimeWindow) -> Self {
        self.time_window = Some(window);
        self
    }

    /// Mark as the pickup half of `pair_id`.
    #[must_use]
    pub fn into_pickup(mut self, pair_id: impl Into<String>) -> Self {
        self.role = WaypointRole::Pickup;
        self.pair_id = Some(pair_id.into());
        self
    }

    /// Mark as the delivery half of `pair_id`.
    #[must_use]
    pub fn into_delivery(mut self, pair_id: impl Into<String>) -> Self {
        self.role = WaypointRole::Delivery;
        self.pair_id = Some(pair_id.into());
        self
    }

    /// Whether this waypoint acts as the depot.
    #[must_use]
    pub fn is_depot(&self) -> bool {
        self.is_depot || self.role == WaypointRole::Depot
    }
}

/// A vehicle available for one solve.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vehicle {
    /// Identifier, unique within the fleet.
    pub id: String,
    /// Capacity per load component.
    pub capacity: Load,
    /// Node the route starts from; the depot when absent.
    #[cfg_attr(feature = "serde", serde(default))]
    pub start_index: Option<usize>,
    /// Node the route ends at; the depot when absent.
    #[cfg_attr(feature = "serde", serde(default))]
    pub end_index: Option<usize>,
    /// Working window of the vehicle.
    #[cfg_attr(feature = "serde", serde(default))]
    pub time_window: Option<TimeWindow>,
    /// Vehicle class used to pick an emission factor.
    #[cfg_attr(feature = "serde", serde(default))]
    pub class: Option<String>,
}

impl Vehicle {
    /// A vehicle anchored at the depot.
    #[must_use]
    pub fn new(id: impl Into<String>, capacity: Load) -> Self {
        Self {
            id: id.into(),
            capacity,
            start_index: None,
            end_index: None,
            time_window: None,
            class: None,
        }
    }

    /// Start the route at `node`.
    #[must_use]
    pub const fn with_start(mut self, node: usize) -> Self {
        self.start_index = Some(node);
        self
    }

    /// End the route at `node`.
    #[must_use]
    pub const fn with_end(mut self, node: usize) -> Self {
        self.end_index = Some(node);
        self
    }

    /// Restrict working hours.
    #[must_use]
    pub const fn with_time_window(mut self, window: TimeWindow) -> Self {
        self.time_window = Some(window);
        self
    }

    /// Set the vehicle class.
    #[must_use]
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    /// Start node, falling back to `depot`.
    #[must_use]
    pub fn start_node(&self, depot: usize) -> usize {
        self.start_index.unwrap_or(depot)
    }

    /// End node, falling back to `depot`.
    #[must_use]
    pub fn end_node(&self, depot: usize) -> usize {
        self.end_index.unwrap_or(depot)
    }

    /// Time the vehicle becomes available.
    #[must_use]
    pub fn shift_start(&self) -> f64 {
        self.time_window.map_or(0.0, |window| window.start())
    }

    /// Time the vehicle must be back, if bounded.
    #[must_use]
    pub fn shift_end(&self) -> f64 {
        self.time_window.map_or(f64::INFINITY, |window| window.end())
    }
}

/// An ordered, non-empty set of vehicles with consistent capacity width.
///
/// # Examples
///
/// ```
/// use fleetroute_core::{Fleet, Load, Vehicle};
///
/// let fleet = Fleet::new(vec![
///     Vehicle::new("van-1", Load::new(vec![10, 2])),
///     Vehicle::new("van-2", Load::new(vec![8, 2])),
/// ])?;
/// assert_eq!(fleet.capacity_dimensions(), 2);
/// assert!(Fleet::new(Vec::new()).is_err());
/// # Ok::<(), fleetroute_core::ValidationError>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(try_from = "Vec<Vehicle>", into = "Vec<Vehicle>")
)]
pub struct Fleet {
    pub(crate) vehicles: Vec<Vehicle>,
}

impl Fleet {
    /// Validate and build a fleet.
    ///
    /// # Errors
    ///
    /// Rejects an empty fleet, duplicate vehicle identifiers and capacity
    /// vectors of differing lengths.
    pub fn new(vehicles: Vec<Vehicle>) -> Result<Self, ValidationError> {
        let Some(first) = vehicles.first() else {
            return Err(ValidationError::EmptyFleet);
        };
        let expected = first.capacity.dimensions();
        let mut seen = HashSet::with_capacity(vehicles.len());
        for vehicle in &vehicles {
            if !seen.insert(vehicle.id.as_str()) {
                return Err(ValidationError::DuplicateVehicleId {
                    id: vehicle.id.clone(),
                });
            }
            if vehicle.capacity.dimensions() != expected {
                return Err(ValidationError::InconsistentCapacity {
                    vehicle: vehicle.id.clone(),
                    expected,
                    found: vehicle.capacity.dimensions(),
                });
            }
        }
        Ok(Self { vehicles })
    }

    /// Vehicles in fleet order.
    #[must_use]
    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    /// Number of vehicles; never zero.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    /// Always `false`; kept for API symmetry with collections.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    /// Width of every vehicle's capacity vector.
    #[must_use]
    pub fn capacity_dimensions(&self) -> usize {
        self.vehicles
            .first()
            .map_or(0, |vehicle| vehicle.capacity.dimensions())
    }

    /// Iterate over the vehicles.
    pub fn iter(&self) -> std::slice::Iter<'_, Vehicle> {
        self.vehicles.iter()
    }
}

impl TryFrom<Vec<Vehicle>> for Fleet {
    type Error = ValidationError;

    fn try_from(vehicles: Vec<Vehicle>) -> Result<Self, Self::Error> {
        Self::new(vehicles)
    }
}

impl From<Fleet> for Vec<Vehicle> {
    fn from(fleet: Fleet) -> Self {
        fleet.vehicles
    }
}

impl<'a> IntoIterator for &'a Fleet {
    type Item = &'a Vehicle;
    type IntoIter = std::slice::Iter<'a, Vehicle>;

    fn into_iter(self) -> Self::IntoIter {
        self.vehicles.iter()
    }
}
