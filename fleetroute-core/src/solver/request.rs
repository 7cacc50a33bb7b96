//! The canonical solve request.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::time::Duration;

use crate::matrix::{haversine_matrix, validate_coordinates};
use crate::{
    Coordinate, Fleet, Load, MatrixResult, TimeWindow, ValidationError, Waypoint, WaypointRole,
};

/// Weights blending distance, duration and route balance into one cost.
///
/// Arc cost is `distance * w_distance + duration * w_duration`. The balance
/// weight penalises the longest route where a backend supports it.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ObjectiveWeights {
    /// Weight per metre travelled.
    pub distance: f64,
    /// Weight per second travelled.
    pub duration: f64,
    /// Weight on the most expensive route.
    pub balance: f64,
}

impl Default for ObjectiveWeights {
    fn default() -> Self {
        Self {
            distance: 1.0,
            duration: 0.0,
            balance: 0.0,
        }
    }
}

impl ObjectiveWeights {
    /// Check weights are finite, non-negative and not all zero.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidObjective`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        let weights = [self.distance, self.duration, self.balance];
        let valid = weights.iter().all(|w| w.is_finite() && *w >= 0.0)
            && (self.distance > 0.0 || self.duration > 0.0);
        if valid {
            Ok(())
        } else {
            Err(ValidationError::InvalidObjective)
        }
    }

    /// Weighted cost of one arc; a missing duration counts as zero.
    #[must_use]
    pub fn arc_cost(&self, distance: f64, duration: Option<f64>) -> f64 {
        self.distance * distance + self.duration * duration.unwrap_or(0.0)
    }

    /// Whether travel time outweighs distance.
    #[must_use]
    pub fn prefers_duration(&self) -> bool {
        self.duration > self.distance
    }
}

/// Role of a node with respect to pickup-delivery pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairRole {
    /// The node is not part of any pair.
    Single,
    /// The node is a pickup whose goods go to `delivery`.
    Pickup {
        /// Paired delivery node.
        delivery: usize,
    },
    /// The node is a delivery whose goods come from `pickup`.
    Delivery {
        /// Paired pickup node.
        pickup: usize,
    },
}

/// Lookup of pickup-delivery roles and carried loads.
///
/// A pair carries the component-wise maximum of the pickup and delivery
/// demands from the pickup to the delivery. Single nodes are served from
/// the goods loaded at the route start.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PickupDeliveryIndex {
    roles: HashMap<usize, PairRole>,
    loads: BTreeMap<usize, Load>,
}

impl PickupDeliveryIndex {
    /// Role of `node`.
    #[must_use]
    pub fn role(&self, node: usize) -> PairRole {
        self.roles.get(&node).copied().unwrap_or(PairRole::Single)
    }

    /// Load carried from `pickup` to its delivery.
    #[must_use]
    pub fn load(&self, pickup: usize) -> &Load {
        self.loads.get(&pickup).unwrap_or(Load::empty_ref())
    }

    /// Whether there are no pairs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.loads.is_empty()
    }

    /// `(pickup, delivery)` pairs ordered by pickup node.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.loads.keys().filter_map(|pickup| match self.role(*pickup) {
            PairRole::Pickup { delivery } => Some((*pickup, delivery)),
            PairRole::Single | PairRole::Delivery { .. } => None,
        })
    }
}

/// Everything a solver needs to build routes.
///
/// Exactly one of `matrix` and `coordinates` must be set. The per-node
/// arrays are optional; an absent array means "no constraint", never
/// "zero".
///
/// # Examples
///
/// ```
/// use fleetroute_core::{Fleet, Load, MatrixResult, SolveRequest, Vehicle};
///
/// let matrix = MatrixResult::new(
///     vec![vec![0.0, 5.0, 4.0], vec![5.0, 0.0, 3.0], vec![4.0, 3.0, 0.0]],
///     None,
/// )?;
/// let fleet = Fleet::new(vec![Vehicle::new("van", Load::scalar(999))])?;
/// let request = SolveRequest::with_matrix("vrp", matrix, fleet)
///     .with_demands(vec![Load::zero(), Load::scalar(3), Load::scalar(4)]);
/// request.validate()?;
/// assert_eq!(request.customer_nodes(), vec![1, 2]);
/// # Ok::<(), fleetroute_core::ValidationError>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SolveRequest {
    /// Registry name of the solver to run.
    pub solver: String,
    /// Precomputed matrix over the request's nodes.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub matrix: Option<MatrixResult>,
    /// Raw node coordinates; distances are derived with the haversine formula.
    #[cfg_attr(
        feature = "serde",
        serde(
            default,
            skip_serializing_if = "Option::is_none",
            with = "crate::serde_support::lon_lat_seq_opt"
        )
    )]
    pub coordinates: Option<Vec<Coordinate>>,
    /// Vehicles available to this solve.
    pub fleet: Fleet,
    /// Node routes start and end at unless a vehicle overrides it.
    #[cfg_attr(feature = "serde", serde(default))]
    pub depot_index: usize,
    /// Demand per node.
    #[cfg_attr(feature = "serde", serde(default))]
    pub demands: Option<Vec<Load>>,
    /// Service window per node.
    #[cfg_attr(feature = "serde", serde(default))]
    pub node_time_windows: Option<Vec<Option<TimeWindow>>>,
    /// Service time per node in seconds.
    #[cfg_attr(feature = "serde", serde(default))]
    pub node_service_times: Option<Vec<f64>>,
    /// `(pickup, delivery)` node pairs served by the same vehicle in order.
    #[cfg_attr(feature = "serde", serde(default))]
    pub pickup_delivery_pairs: Vec<(usize, usize)>,
    /// Objective weights; distance only when absent.
    #[cfg_attr(feature = "serde", serde(default))]
    pub objective: Option<ObjectiveWeights>,
    /// External identifier per node; the decimal index when absent.
    #[cfg_attr(feature = "serde", serde(default))]
    pub node_ids: Option<Vec<String>>,
    /// Search budget override in seconds.
    #[cfg_attr(feature = "serde", serde(default))]
    pub time_limit_secs: Option<u64>,
}

impl SolveRequest {
    fn empty(solver: impl Into<String>, fleet: Fleet) -> Self {
        Self {
            solver: solver.into(),
            matrix: None,
            coordinates: None,
            fleet,
            depot_index: 0,
            demands: None,
            node_time_windows: None,
            node_service_times: None,
            pickup_delivery_pairs: Vec::new(),
            objective: None,
            node_ids: None,
            time_limit_secs: None,
        }
    }

    /// A request over a precomputed matrix.
    #[must_use]
    pub fn with_matrix(solver: impl Into<String>, matrix: MatrixResult, fleet: Fleet) -> Self {
        Self {
            matrix: Some(matrix),
            ..Self::empty(solver, fleet)
        }
    }

    /// A request over raw coordinates.
    #[must_use]
    pub fn with_coordinates(
        solver: impl Into<String>,
        coordinates: Vec<Coordinate>,
        fleet: Fleet,
    ) -> Self {
        Self {
            coordinates: Some(coordinates),
            ..Self::empty(solver, fleet)
        }
    }

    /// Assemble a request from waypoints and a matrix over them.
    ///
    /// The depot is the single waypoint flagged as such. Demand, time-window
    /// and service-time arrays are only populated when some waypoint sets
    /// them, and pairs are derived from matching `pair_id`s on a pickup and a
    /// delivery. The matrix must have one row per waypoint; the waypoint
    /// locations are attached to it when it carries no coordinates.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for duplicate ids, a missing or repeated
    /// depot, unmatched pairs, or any failure of [`SolveRequest::validate`].
    pub fn from_waypoints(
        solver: impl Into<String>,
        waypoints: &[Waypoint],
        fleet: Fleet,
        matrix: MatrixResult,
    ) -> Result<Self, ValidationError> {
        if waypoints.is_empty() {
            return Err(ValidationError::EmptyInput);
        }
        let mut ids = HashSet::with_capacity(waypoints.len());
        if let Some(dup) = waypoints.iter().find(|w| !ids.insert(w.id.as_str())) {
            return Err(ValidationError::DuplicateNodeId { id: dup.id.clone() });
        }
        if matrix.rows() != waypoints.len() {
            return Err(ValidationError::LengthMismatch {
                field: "matrix",
                expected: waypoints.len(),
                found: matrix.rows(),
            });
        }
        let depots: Vec<usize> = waypoints
            .iter()
            .enumerate()
            .filter(|(_, w)| w.is_depot())
            .map(|(idx, _)| idx)
            .collect();
        let depot_index = match depots.as_slice() {
            [] => return Err(ValidationError::MissingDepot),
            [depot] => *depot,
            many => return Err(ValidationError::MultipleDepots { count: many.len() }),
        };

        let matrix = if matrix.coordinates().is_some() {
            matrix
        } else {
            matrix.with_coordinates(waypoints.iter().map(|w| w.location).collect())?
        };

        let mut request = Self::with_matrix(solver, matrix, fleet);
        request.depot_index = depot_index;
        if waypoints.iter().any(|w| !w.demand.is_zero()) {
            request.demands = Some(waypoints.iter().map(|w| w.demand.clone()).collect());
        }
        if waypoints.iter().any(|w| w.time_window.is_some()) {
            request.node_time_windows = Some(waypoints.iter().map(|w| w.time_window).collect());
        }
        if waypoints.iter().any(|w| w.service_time != 0.0) {
            request.node_service_times = Some(waypoints.iter().map(|w| w.service_time).collect());
        }
        request.pickup_delivery_pairs = pairs_from_waypoints(waypoints)?;
        request.node_ids = Some(waypoints.iter().map(|w| w.id.clone()).collect());
        request.validate()?;
        Ok(request)
    }

    /// Set the depot node.
    #[must_use]
    pub const fn with_depot(mut self, depot_index: usize) -> Self {
        self.depot_index = depot_index;
        self
    }

    /// Set per-node demands.
    #[must_use]
    pub fn with_demands(mut self, demands: Vec<Load>) -> Self {
        self.demands = Some(demands);
        self
    }

    /// Set per-node time windows.
    #[must_use]
    pub fn with_time_windows(mut self, windows: Vec<Option<TimeWindow>>) -> Self {
        self.node_time_windows = Some(windows);
        self
    }

    /// Set per-node service times.
    #[must_use]
    pub fn with_service_times(mut self, seconds: Vec<f64>) -> Self {
        self.node_service_times = Some(seconds);
        self
    }

    /// Set pickup-delivery pairs.
    #[must_use]
    pub fn with_pairs(mut self, pairs: Vec<(usize, usize)>) -> Self {
        self.pickup_delivery_pairs = pairs;
        self
    }

    /// Set objective weights.
    #[must_use]
    pub const fn with_objective(mut self, objective: ObjectiveWeights) -> Self {
        self.objective = Some(objective);
        self
    }

    /// Set external node identifiers.
    #[must_use]
    pub fn with_node_ids(mut self, ids: Vec<String>) -> Self {
        self.node_ids = Some(ids);
        self
    }

    /// Override the solver's search budget.
    #[must_use]
    pub const fn with_time_limit_secs(mut self, seconds: u64) -> Self {
        self.time_limit_secs = Some(seconds);
        self
    }

    /// Number of nodes described by the distance source.
    #[must_use]
    pub fn node_count(&self) -> usize {
        match (&self.matrix, &self.coordinates) {
            (Some(matrix), _) => matrix.rows(),
            (None, Some(coords)) => coords.len(),
            (None, None) => 0,
        }
    }

    /// Check the request before any backend is invoked.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found: distance source, matrix
    /// shape, depot bounds, array lengths, demand widths, time windows
    /// without durations, vehicle anchors, pairs, node ids or objective.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.validate_source()?;
        let nodes = self.node_count();
        if self.depot_index >= nodes {
            return Err(ValidationError::DepotOutOfBounds {
                depot: self.depot_index,
                nodes,
            });
        }
        self.validate_demands(nodes)?;
        self.validate_schedule(nodes)?;
        for vehicle in &self.fleet {
            let anchors = [
                ("start_index", vehicle.start_index),
                ("end_index", vehicle.end_index),
            ];
            for (field, anchor) in anchors {
                if let Some(index) = anchor.filter(|idx| *idx >= nodes) {
                    return Err(ValidationError::NodeOutOfBounds { field, index, nodes });
                }
            }
        }
        self.validate_pairs(nodes)?;
        if let Some(ids) = &self.node_ids {
            check_length("node_ids", ids.len(), nodes)?;
            let mut seen = HashSet::with_capacity(ids.len());
            if let Some(dup) = ids.iter().find(|id| !seen.insert(id.as_str())) {
                return Err(ValidationError::DuplicateNodeId { id: dup.clone() });
            }
        }
        self.objective().validate()
    }

    fn validate_source(&self) -> Result<(), ValidationError> {
        match (&self.matrix, &self.coordinates) {
            (Some(_), Some(_)) => Err(ValidationError::AmbiguousDistanceSource),
            (None, None) => Err(ValidationError::MissingDistanceSource),
            (Some(matrix), None) => matrix.validate_square(),
            (None, Some(coords)) => validate_coordinates(coords),
        }
    }

    fn validate_demands(&self, nodes: usize) -> Result<(), ValidationError> {
        let Some(demands) = &self.demands else {
            return Ok(());
        };
        check_length("demands", demands.len(), nodes)?;
        if !self.demand(self.depot_index).is_zero() {
            return Err(ValidationError::DepotDemand);
        }
        let capacity_dimensions = self.fleet.capacity_dimensions();
        for (index, demand) in demands.iter().enumerate() {
            if demand.dimensions() > capacity_dimensions {
                return Err(ValidationError::DemandDimensions {
                    index,
                    dimensions: demand.dimensions(),
                    capacity_dimensions,
                });
            }
        }
        Ok(())
    }

    fn validate_schedule(&self, nodes: usize) -> Result<(), ValidationError> {
        if let Some(windows) = &self.node_time_windows {
            check_length("node_time_windows", windows.len(), nodes)?;
            let has_windows = windows.iter().any(Option::is_some);
            let has_durations = self.matrix.as_ref().is_some_and(|m| m.durations().is_some());
            if has_windows && !has_durations {
                return Err(ValidationError::TimeWindowsWithoutDurations);
            }
        }
        if let Some(times) = &self.node_service_times {
            check_length("node_service_times", times.len(), nodes)?;
            if let Some((index, value)) = times
                .iter()
                .enumerate()
                .find(|(_, value)| !value.is_finite() || **value < 0.0)
            {
                return Err(ValidationError::InvalidServiceTime {
                    index,
                    value: *value,
                });
            }
        }
        Ok(())
    }

    fn validate_pairs(&self, nodes: usize) -> Result<(), ValidationError> {
        let anchors = self.anchors();
        let mut used = HashSet::with_capacity(self.pickup_delivery_pairs.len() * 2);
        for &(pickup, delivery) in &self.pickup_delivery_pairs {
            for index in [pickup, delivery] {
                if index >= nodes {
                    return Err(ValidationError::NodeOutOfBounds {
                        field: "pickup_delivery_pairs",
                        index,
                        nodes,
                    });
                }
            }
            let reason = if pickup == delivery {
                Some("pickup and delivery are the same node")
            } else if pickup == self.depot_index || delivery == self.depot_index {
                Some("pair references the depot")
            } else if anchors.contains(&pickup) || anchors.contains(&delivery) {
                Some("pair references a vehicle start or end node")
            } else {
                None
            };
            if let Some(reason) = reason {
                return Err(ValidationError::InvalidPair {
                    pickup,
                    delivery,
                    reason,
                });
            }
            for index in [pickup, delivery] {
                if !used.insert(index) {
                    return Err(ValidationError::DuplicatePairNode { index });
                }
            }
        }
        Ok(())
    }

    /// Distance matrix for the solve: the supplied matrix, or a haversine
    /// matrix derived from the coordinates.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] when no source is set or coordinates are
    /// malformed.
    pub fn distance_matrix(&self) -> Result<Cow<'_, MatrixResult>, ValidationError> {
        match (&self.matrix, &self.coordinates) {
            (Some(matrix), _) => Ok(Cow::Borrowed(matrix)),
            (None, Some(coords)) => haversine_matrix(coords).map(Cow::Owned),
            (None, None) => Err(ValidationError::MissingDistanceSource),
        }
    }

    /// Coordinates of the nodes, from the request or the matrix echo.
    #[must_use]
    pub fn coordinates_hint(&self) -> Option<&[Coordinate]> {
        self.coordinates
            .as_deref()
            .or_else(|| self.matrix.as_ref().and_then(MatrixResult::coordinates))
    }

    /// External identifier of `node`.
    #[must_use]
    pub fn node_id(&self, node: usize) -> Cow<'_, str> {
        self.node_ids
            .as_ref()
            .and_then(|ids| ids.get(node))
            .map_or_else(|| Cow::Owned(node.to_string()), |id| Cow::Borrowed(id.as_str()))
    }

    /// Demand at `node`; zero when unconstrained.
    #[must_use]
    pub fn demand(&self, node: usize) -> &Load {
        self.demands
            .as_ref()
            .and_then(|demands| demands.get(node))
            .unwrap_or(Load::empty_ref())
    }

    /// Service window at `node`.
    #[must_use]
    pub fn time_window(&self, node: usize) -> Option<TimeWindow> {
        self.node_time_windows
            .as_ref()
            .and_then(|windows| windows.get(node).copied().flatten())
    }

    /// Service time at `node` in seconds.
    #[must_use]
    pub fn service_time(&self, node: usize) -> f64 {
        self.node_service_times
            .as_ref()
            .and_then(|times| times.get(node).copied())
            .unwrap_or(0.0)
    }

    /// Effective objective weights.
    #[must_use]
    pub fn objective(&self) -> ObjectiveWeights {
        self.objective.unwrap_or_default()
    }

    /// Requested search budget.
    #[must_use]
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_secs.map(Duration::from_secs)
    }

    /// The depot and every vehicle start and end node.
    #[must_use]
    pub fn anchors(&self) -> BTreeSet<usize> {
        let depot = self.depot_index;
        let mut anchors = BTreeSet::from([depot]);
        for vehicle in &self.fleet {
            anchors.insert(vehicle.start_node(depot));
            anchors.insert(vehicle.end_node(depot));
        }
        anchors
    }

    /// Nodes that must be visited, in index order.
    #[must_use]
    pub fn customer_nodes(&self) -> Vec<usize> {
        let anchors = self.anchors();
        (0..self.node_count())
            .filter(|node| !anchors.contains(node))
            .collect()
    }

    /// Pickup-delivery roles and carried loads.
    #[must_use]
    pub fn pairs(&self) -> PickupDeliveryIndex {
        let mut index = PickupDeliveryIndex::default();
        for &(pickup, delivery) in &self.pickup_delivery_pairs {
            index.roles.insert(pickup, PairRole::Pickup { delivery });
            index.roles.insert(delivery, PairRole::Delivery { pickup });
            let pickup_demand = self.demand(pickup);
            let delivery_demand = self.demand(delivery);
            let width = pickup_demand.dimensions().max(delivery_demand.dimensions());
            let carried = (0..width)
                .map(|idx| pickup_demand.component(idx).max(delivery_demand.component(idx)))
                .collect();
            index.loads.insert(pickup, Load::new(carried));
        }
        index
    }
}

const fn check_length(
    field: &'static str,
    found: usize,
    expected: usize,
) -> Result<(), ValidationError> {
    if found == expected {
        Ok(())
    } else {
        Err(ValidationError::LengthMismatch {
            field,
            expected,
            found,
        })
    }
}

fn pairs_from_waypoints(waypoints: &[Waypoint]) -> Result<Vec<(usize, usize)>, ValidationError> {
    let mut halves: BTreeMap<&str, (Option<usize>, Option<usize>)> = BTreeMap::new();
    for (index, waypoint) in waypoints.iter().enumerate() {
        let Some(pair_id) = waypoint.pair_id.as_deref() else {
            continue;
        };
        let entry = halves.entry(pair_id).or_default();
        let slot = match waypoint.role {
            WaypointRole::Pickup => &mut entry.0,
            WaypointRole::Delivery => &mut entry.1,
            WaypointRole::Depot | WaypointRole::Stop => continue,
        };
        if let Some(previous) = slot.replace(index) {
            return Err(ValidationError::InvalidPair {
                pickup: previous,
                delivery: index,
                reason: "pair id is used by more than one pickup or delivery",
            });
        }
    }
    let mut pairs = Vec::with_capacity(halves.len());
    for (pair_id, halves) in halves {
        match halves {
            (Some(pickup), Some(delivery)) => pairs.push((pickup, delivery)),
            (Some(index), None) | (None, Some(index)) => {
                let id = waypoints.get(index).map(|w| w.id.clone()).unwrap_or_default();
                return Err(ValidationError::UnpairedWaypoint {
                    id,
                    pair_id: pair_id.to_owned(),
                });
            }
            (None, None) => {}
        }
    }
    pairs.sort_unstable();
    Ok(pairs)
}
