//! VROOM wire format.
//!
//! A request becomes one VROOM problem: a vehicle per fleet member, a job
//! per single stop and a shipment per pickup-delivery pair. Ids are node
//! indices for jobs and fleet indices for vehicles so the answer maps back
//! without a lookup table.
//!
//! In coordinate mode every place carries `[lon, lat]` and the engine routes
//! over its own road graph. In index mode places carry `location_index` and
//! the request matrix is sent under the `car` profile, rounded to whole
//! metres and seconds.

use std::collections::BTreeMap;

use fleetroute_core::{Load, MatrixResult, PairRole, SolveError, SolveRequest, TimeWindow};
use serde::{Deserialize, Serialize};

use crate::solver::ENGINE_SOLVER;

const PROFILE: &str = "car";

#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "values are clamped to non-negative and rounded"
)]
fn whole(value: f64) -> u64 {
    value.max(0.0).round() as u64
}

fn window(window: TimeWindow) -> [u64; 2] {
    [whole(window.start()), whole(window.end())]
}

fn amount(load: &Load, width: usize) -> Vec<u32> {
    load.padded(width)
}

/// Where a job or vehicle anchor sits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
enum Place {
    Coordinates([f64; 2]),
    Index(usize),
}

/// Which location format a problem uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    /// Places are `[lon, lat]`; the engine computes travel costs.
    Coordinates,
    /// Places are matrix indices; the request matrix is sent along.
    Index,
}

impl Mode {
    /// Coordinate mode whenever every node has a coordinate.
    pub(crate) fn for_request(request: &SolveRequest) -> Self {
        match request.coordinates_hint() {
            Some(coords) if coords.len() == request.node_count() => Self::Coordinates,
            _ => Self::Index,
        }
    }
}

#[derive(Debug, Serialize)]
struct VroomVehicle {
    id: usize,
    profile: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    start: Option<Place>,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_index: Option<Place>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end: Option<Place>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end_index: Option<Place>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    capacity: Vec<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    time_window: Option<[u64; 2]>,
}

#[derive(Debug, Serialize)]
struct Visit {
    id: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<Place>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location_index: Option<Place>,
    #[serde(skip_serializing_if = "Option::is_none")]
    service: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    time_windows: Vec<[u64; 2]>,
}

#[derive(Debug, Serialize)]
struct VroomJob {
    #[serde(flatten)]
    visit: Visit,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    delivery: Vec<u32>,
}

#[derive(Debug, Serialize)]
struct Shipment {
    pickup: Visit,
    delivery: Visit,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    amount: Vec<u32>,
}

#[derive(Debug, Serialize)]
struct ProfileMatrices {
    distances: Vec<Vec<u64>>,
    durations: Vec<Vec<u64>>,
}

/// A VROOM problem document.
#[derive(Debug, Serialize)]
pub(crate) struct Problem {
    vehicles: Vec<VroomVehicle>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    jobs: Vec<VroomJob>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    shipments: Vec<Shipment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    matrices: Option<BTreeMap<&'static str, ProfileMatrices>>,
}

struct Locator<'r> {
    mode: Mode,
    coordinates: &'r [fleetroute_core::Coordinate],
}

impl Locator<'_> {
    /// `(coordinates, index)` fields for `node`; exactly one is set.
    fn place(&self, node: usize) -> (Option<Place>, Option<Place>) {
        match self.mode {
            Mode::Coordinates => (
                self.coordinates
                    .get(node)
                    .map(|coord| Place::Coordinates([coord.x, coord.y])),
                None,
            ),
            Mode::Index => (None, Some(Place::Index(node))),
        }
    }

    fn visit(&self, request: &SolveRequest, node: usize) -> Visit {
        let (location, location_index) = self.place(node);
        let service = request.service_time(node);
        Visit {
            id: node,
            location,
            location_index,
            service: (service > 0.0).then(|| whole(service)),
            time_windows: request.time_window(node).map(window).into_iter().collect(),
        }
    }
}

fn rounded(rows: &[Vec<f64>]) -> Vec<Vec<u64>> {
    rows.iter()
        .map(|row| row.iter().copied().map(whole).collect())
        .collect()
}

impl Problem {
    /// Translate `request` for the engine.
    pub(crate) fn build(request: &SolveRequest, matrix: &MatrixResult, mode: Mode) -> Self {
        let locator = Locator {
            mode,
            coordinates: request.coordinates_hint().unwrap_or_default(),
        };
        let width = request.fleet.capacity_dimensions();
        let depot = request.depot_index;

        let vehicles = request
            .fleet
            .iter()
            .enumerate()
            .map(|(id, vehicle)| {
                let (start, start_index) = locator.place(vehicle.start_node(depot));
                let (end, end_index) = locator.place(vehicle.end_node(depot));
                VroomVehicle {
                    id,
                    profile: PROFILE,
                    start,
                    start_index,
                    end,
                    end_index,
                    capacity: amount(&vehicle.capacity, width),
                    time_window: vehicle.time_window.map(window),
                }
            })
            .collect();

        let pairs = request.pairs();
        let mut jobs = Vec::new();
        let mut shipments = Vec::new();
        for node in request.customer_nodes() {
            match pairs.role(node) {
                PairRole::Single => jobs.push(VroomJob {
                    visit: locator.visit(request, node),
                    delivery: amount(request.demand(node), width),
                }),
                PairRole::Pickup { delivery } => shipments.push(Shipment {
                    pickup: locator.visit(request, node),
                    delivery: locator.visit(request, delivery),
                    amount: amount(pairs.load(node), width),
                }),
                PairRole::Delivery { .. } => {}
            }
        }

        let matrices = (mode == Mode::Index).then(|| {
            let distances = rounded(matrix.distances());
            let durations = matrix.durations().map_or_else(|| distances.clone(), rounded);
            BTreeMap::from([(
                PROFILE,
                ProfileMatrices {
                    distances,
                    durations,
                },
            )])
        });

        Self {
            vehicles,
            jobs,
            shipments,
            matrices,
        }
    }
}

/// The engine's answer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct Solution {
    pub code: i64,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub routes: Vec<VroomRoute>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct VroomRoute {
    pub vehicle: usize,
    #[serde(default)]
    pub steps: Vec<VroomStep>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct VroomStep {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub id: Option<usize>,
}

impl VroomStep {
    fn visited_node(&self) -> Option<usize> {
        match self.kind.as_str() {
            "job" | "pickup" | "delivery" => self.id,
            _ => None,
        }
    }
}

impl Solution {
    /// Map routes back onto `(vehicle_id, nodes)` with anchors attached.
    ///
    /// # Errors
    ///
    /// Returns [`SolveError::Upstream`] for a route naming a vehicle index
    /// outside the fleet.
    pub(crate) fn into_assignment(
        self,
        request: &SolveRequest,
    ) -> Result<Vec<(String, Vec<usize>)>, SolveError> {
        let depot = request.depot_index;
        self.routes
            .into_iter()
            .map(|route| {
                let vehicle = request.fleet.vehicles().get(route.vehicle).ok_or_else(|| {
                    SolveError::upstream(
                        ENGINE_SOLVER,
                        format!("route for unknown vehicle index {}", route.vehicle),
                    )
                })?;
                let mut nodes = vec![vehicle.start_node(depot)];
                nodes.extend(route.steps.iter().filter_map(VroomStep::visited_node));
                nodes.push(vehicle.end_node(depot));
                Ok((vehicle.id.clone(), nodes))
            })
            .collect()
    }
}
