//! Deterministic doubles and fixtures shared by unit and behaviour tests.

use std::collections::BTreeSet;

use crate::solver::schedule::check_route;
use crate::{
    Coordinate, Diagnostics, Fleet, Load, MatrixAdapter, MatrixError, MatrixResult, RoutesResult,
    SegmentSnapper, SnapError, SolveError, SolveRequest, Solver, UpstreamCause, Vehicle,
};

/// The three-node matrix `[[0,5,4],[5,0,3],[4,3,0]]` without durations.
#[must_use]
pub fn scenario_matrix() -> MatrixResult {
    MatrixResult {
        distances: vec![
            vec![0.0, 5.0, 4.0],
            vec![5.0, 0.0, 3.0],
            vec![4.0, 3.0, 0.0],
        ],
        durations: None,
        coordinates: None,
    }
}

/// [`scenario_matrix`] with durations of two seconds per metre.
#[must_use]
pub fn timed_matrix() -> MatrixResult {
    let mut matrix = scenario_matrix();
    matrix.durations = Some(
        matrix
            .distances
            .iter()
            .map(|row| row.iter().map(|metres| metres * 2.0).collect())
            .collect(),
    );
    matrix
}

/// An `n x n` matrix with `value` off the diagonal.
#[must_use]
pub fn uniform_matrix(n: usize, value: f64) -> MatrixResult {
    MatrixResult {
        distances: (0..n)
            .map(|i| (0..n).map(|j| if i == j { 0.0 } else { value }).collect())
            .collect(),
        durations: None,
        coordinates: None,
    }
}

/// A fleet with one vehicle `van` of scalar `capacity`.
#[must_use]
pub fn single_vehicle(capacity: u32) -> Fleet {
    Fleet {
        vehicles: vec![Vehicle::new("van", Load::scalar(capacity))],
    }
}

/// Check that `result` honours the request's constraints.
///
/// Every route must belong to a fleet vehicle, start and end at its
/// anchors, respect capacity, time windows and pickup-delivery precedence,
/// and every customer must be visited exactly once or listed as unassigned.
///
/// # Errors
///
/// Returns a description of the first broken invariant.
pub fn audit_result(request: &SolveRequest, result: &RoutesResult) -> Result<(), String> {
    let matrix = request.distance_matrix().map_err(|err| err.to_string())?;
    let mut seen = BTreeSet::new();
    for route in &result.routes {
        let vehicle = request
            .fleet
            .iter()
            .find(|vehicle| vehicle.id == route.vehicle_id)
            .ok_or_else(|| format!("unknown vehicle `{}`", route.vehicle_id))?;
        check_route(request, &matrix, vehicle, &route.nodes)
            .map_err(|err| format!("route of `{}`: {err}", route.vehicle_id))?;
        for node in route.visits() {
            if !seen.insert(*node) {
                return Err(format!("node {node} is served twice"));
            }
        }
    }
    for id in &result.unassigned {
        let node = (0..request.node_count())
            .find(|node| request.node_id(*node) == id.as_str())
            .ok_or_else(|| format!("unassigned id `{id}` is not a node"))?;
        if !seen.insert(node) {
            return Err(format!("node {node} is both served and unassigned"));
        }
    }
    let customers: BTreeSet<usize> = request.customer_nodes().into_iter().collect();
    if seen != customers {
        return Err(format!("covered nodes {seen:?} differ from customers {customers:?}"));
    }
    Ok(())
}

/// Adapter returning a fixed matrix for any input.
#[derive(Debug, Clone)]
pub struct FixedMatrixAdapter {
    matrix: MatrixResult,
}

impl FixedMatrixAdapter {
    /// Always answer with `matrix`.
    #[must_use]
    pub const fn new(matrix: MatrixResult) -> Self {
        Self { matrix }
    }
}

impl MatrixAdapter for FixedMatrixAdapter {
    fn name(&self) -> &str {
        "fixed"
    }

    fn matrix(
        &self,
        _origins: &[Coordinate],
        _destinations: &[Coordinate],
        _mode: &str,
    ) -> Result<MatrixResult, MatrixError> {
        Ok(self.matrix.clone())
    }
}

/// Adapter that always reports an unreachable provider.
#[derive(Debug, Clone)]
pub struct FailingAdapter {
    name: String,
}

impl FailingAdapter {
    /// A failing adapter registered as `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl MatrixAdapter for FailingAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn matrix(
        &self,
        _origins: &[Coordinate],
        _destinations: &[Coordinate],
        _mode: &str,
    ) -> Result<MatrixResult, MatrixError> {
        Err(MatrixError::upstream(
            self.name.as_str(),
            UpstreamCause::Network {
                url: "http://unreachable.invalid".to_owned(),
                message: "connection refused".to_owned(),
            },
        ))
    }
}

/// Solver sending the first vehicle to every customer in index order.
///
/// Ignores capacity and time windows.
#[derive(Debug, Clone)]
pub struct StubSolver {
    name: String,
}

impl StubSolver {
    /// A stub registered as `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Solver for StubSolver {
    fn name(&self) -> &str {
        &self.name
    }

    fn solve(&self, request: &SolveRequest) -> Result<RoutesResult, SolveError> {
        request.validate()?;
        let matrix = request.distance_matrix()?;
        let depot = request.depot_index;
        let vehicle = request
            .fleet
            .vehicles()
            .first()
            .ok_or_else(|| SolveError::upstream(self.name.as_str(), "empty fleet"))?;
        let mut nodes = vec![vehicle.start_node(depot)];
        nodes.extend(request.customer_nodes());
        nodes.push(vehicle.end_node(depot));
        Ok(RoutesResult::from_assignment(
            request,
            &matrix,
            vec![(vehicle.id.clone(), nodes)],
            &[],
            Diagnostics::new(self.name.as_str()),
        ))
    }
}

/// Solver that panics on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct PanickingSolver;

impl Solver for PanickingSolver {
    fn name(&self) -> &str {
        "panicking"
    }

    #[expect(clippy::panic, reason = "exercises panic containment at the dispatch boundary")]
    fn solve(&self, _request: &SolveRequest) -> Result<RoutesResult, SolveError> {
        panic!("backend exploded");
    }
}

/// Snapper returning the straight segment between the two stops.
#[derive(Debug, Clone, Copy, Default)]
pub struct StraightLineSnapper;

impl SegmentSnapper for StraightLineSnapper {
    fn snap(&self, from: Coordinate, to: Coordinate) -> Result<Vec<Coordinate>, SnapError> {
        if from == to {
            return Ok(vec![from]);
        }
        Ok(vec![from, to])
    }
}

/// Snapper failing every leg that starts at a given coordinate.
#[derive(Debug, Clone, Copy)]
pub struct FailingSegmentSnapper {
    fail_from: Coordinate,
}

impl FailingSegmentSnapper {
    /// Fail legs starting at `fail_from`.
    #[must_use]
    pub const fn new(fail_from: Coordinate) -> Self {
        Self { fail_from }
    }
}

impl SegmentSnapper for FailingSegmentSnapper {
    fn snap(&self, from: Coordinate, to: Coordinate) -> Result<Vec<Coordinate>, SnapError> {
        if from == self.fail_from {
            return Err(SnapError::NoRoute {
                message: "no road between stops".to_owned(),
            });
        }
        Ok(vec![from, to])
    }
}
