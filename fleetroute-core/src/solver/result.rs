//! Canonical solve results.

use std::time::Duration;

use crate::metrics::route_totals;
use crate::{MatrixResult, SolveRequest};

/// Outcome class of a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SolveStatus {
    /// Every customer node is on a route.
    Success,
    /// Routes were produced but some customers are unassigned.
    Partial,
    /// No route could be produced for the customers.
    Infeasible,
    /// The input was rejected or the backend failed.
    Error,
}

impl SolveStatus {
    /// Whether at least one route set was produced.
    #[must_use]
    pub const fn has_routes(self) -> bool {
        matches!(self, Self::Success | Self::Partial)
    }
}

/// One vehicle's tour.
///
/// `stops` and `nodes` begin at the vehicle's start node and end at its end
/// node. Totals are recomputed from the matrix, never taken from a backend.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Route {
    /// Identifier of the vehicle driving this route.
    pub vehicle_id: String,
    /// Waypoint identifiers in visiting order.
    pub stops: Vec<String>,
    /// Node indices in visiting order.
    pub nodes: Vec<usize>,
    /// Sum of matrix distances along the route, in metres.
    pub total_distance: f64,
    /// Sum of matrix durations along the route; absent without durations.
    #[cfg_attr(feature = "serde", serde(default))]
    pub total_duration: Option<f64>,
    /// Estimated emissions in kilograms of CO2.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub emissions_kg: Option<f64>,
}

impl Route {
    /// Build a route over `nodes`, naming stops and summing totals.
    #[must_use]
    pub fn from_nodes(
        vehicle_id: impl Into<String>,
        nodes: Vec<usize>,
        request: &SolveRequest,
        matrix: &MatrixResult,
    ) -> Self {
        let (total_distance, total_duration) = route_totals(&nodes, matrix);
        Self {
            vehicle_id: vehicle_id.into(),
            stops: nodes
                .iter()
                .map(|node| request.node_id(*node).into_owned())
                .collect(),
            nodes,
            total_distance,
            total_duration,
            emissions_kg: None,
        }
    }

    /// Customer nodes, excluding the first and last anchor.
    #[must_use]
    pub fn visits(&self) -> &[usize] {
        match self.nodes.as_slice() {
            [_, inner @ .., _] => inner,
            _ => &[],
        }
    }
}

/// Backend bookkeeping attached to every result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Diagnostics {
    /// Name of the solver that produced the result.
    pub solver: String,
    /// Wall-clock time spent in the solver.
    pub solve_time: Duration,
    /// Whether the backend proved the result optimal.
    pub proven_optimal: bool,
}

impl Diagnostics {
    /// Diagnostics for `solver` with no timing recorded.
    #[must_use]
    pub fn new(solver: impl Into<String>) -> Self {
        Self {
            solver: solver.into(),
            ..Self::default()
        }
    }

    /// Record the elapsed solve time.
    #[must_use]
    pub const fn with_solve_time(mut self, elapsed: Duration) -> Self {
        self.solve_time = elapsed;
        self
    }

    /// Record whether optimality was proven.
    #[must_use]
    pub const fn with_proven_optimal(mut self, proven: bool) -> Self {
        self.proven_optimal = proven;
        self
    }
}

/// What every solve returns.
///
/// # Examples
///
/// ```
/// use fleetroute_core::{RoutesResult, SolveStatus};
///
/// let result = RoutesResult::error("vrp", "backend exploded");
/// assert_eq!(result.status, SolveStatus::Error);
/// assert!(result.routes.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RoutesResult {
    /// Outcome class.
    pub status: SolveStatus,
    /// Human-readable summary.
    pub message: String,
    /// Routes, one per vehicle that serves at least one customer.
    pub routes: Vec<Route>,
    /// Identifiers of customers left off every route.
    #[cfg_attr(feature = "serde", serde(default))]
    pub unassigned: Vec<String>,
    /// Backend bookkeeping.
    #[cfg_attr(feature = "serde", serde(default))]
    pub diagnostics: Diagnostics,
}

impl RoutesResult {
    /// A result with status [`SolveStatus::Error`].
    #[must_use]
    pub fn error(solver: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: SolveStatus::Error,
            message: message.into(),
            routes: Vec::new(),
            unassigned: Vec::new(),
            diagnostics: Diagnostics::new(solver),
        }
    }

    /// Classify a solver's assignment.
    ///
    /// `assignment` holds `(vehicle_id, nodes)` per vehicle, anchors
    /// included; vehicles that serve no customer are dropped. The status is
    /// success when nothing is unassigned, partial when routes exist but
    /// some customers are unassigned, and infeasible when no route serves
    /// anyone.
    #[must_use]
    pub fn from_assignment(
        request: &SolveRequest,
        matrix: &MatrixResult,
        assignment: Vec<(String, Vec<usize>)>,
        unassigned: &[usize],
        diagnostics: Diagnostics,
    ) -> Self {
        let routes: Vec<Route> = assignment
            .into_iter()
            .map(|(vehicle, nodes)| Route::from_nodes(vehicle, nodes, request, matrix))
            .filter(|route| !route.visits().is_empty())
            .collect();
        let unassigned: Vec<String> = unassigned
            .iter()
            .map(|node| request.node_id(*node).into_owned())
            .collect();
        let (status, message) = match (routes.is_empty(), unassigned.is_empty()) {
            (false, true) => (
                SolveStatus::Success,
                format!("solved with {} route(s)", routes.len()),
            ),
            (false, false) => (
                SolveStatus::Partial,
                format!("unassigned waypoints: {}", unassigned.join(", ")),
            ),
            (true, false) => (
                SolveStatus::Infeasible,
                format!("no feasible route for waypoints: {}", unassigned.join(", ")),
            ),
            (true, true) => (SolveStatus::Success, "nothing to route".to_owned()),
        };
        Self {
            status,
            message,
            routes,
            unassigned,
            diagnostics,
        }
    }

    /// Replace the message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Replace the diagnostics.
    #[must_use]
    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Sum of route distances.
    #[must_use]
    pub fn total_distance(&self) -> f64 {
        self.routes.iter().map(|route| route.total_distance).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Load;
    use crate::test_support::{scenario_matrix, single_vehicle};
    use rstest::{fixture, rstest};

    #[fixture]
    fn request() -> SolveRequest {
        SolveRequest::with_matrix("test", scenario_matrix(), single_vehicle(10))
            .with_demands(vec![Load::zero(), Load::scalar(3), Load::scalar(4)])
            .with_node_ids(vec!["hub".into(), "a".into(), "b".into()])
    }

    #[rstest]
    fn complete_assignment_is_success(request: SolveRequest) {
        let matrix = scenario_matrix();
        let result = RoutesResult::from_assignment(
            &request,
            &matrix,
            vec![("van".into(), vec![0, 1, 2, 0])],
            &[],
            Diagnostics::new("test"),
        );
        assert_eq!(result.status, SolveStatus::Success);
        let route = result.routes.first().expect("one route");
        assert_eq!(route.stops, vec!["hub", "a", "b", "hub"]);
        assert_eq!(route.total_distance, 12.0);
        assert_eq!(route.total_duration, None);
    }

    #[rstest]
    fn unassigned_customers_make_partial(request: SolveRequest) {
        let matrix = scenario_matrix();
        let result = RoutesResult::from_assignment(
            &request,
            &matrix,
            vec![("van".into(), vec![0, 1, 0])],
            &[2],
            Diagnostics::new("test"),
        );
        assert_eq!(result.status, SolveStatus::Partial);
        assert_eq!(result.unassigned, vec!["b"]);
        assert!(result.message.contains('b'));
    }

    #[rstest]
    fn empty_routes_are_dropped_and_infeasible(request: SolveRequest) {
        let matrix = scenario_matrix();
        let result = RoutesResult::from_assignment(
            &request,
            &matrix,
            vec![("van".into(), vec![0, 0])],
            &[1, 2],
            Diagnostics::new("test"),
        );
        assert_eq!(result.status, SolveStatus::Infeasible);
        assert!(result.routes.is_empty());
    }

    #[rstest]
    fn visits_strip_anchors() {
        let route = Route {
            vehicle_id: "v".into(),
            stops: Vec::new(),
            nodes: vec![0, 3, 1, 0],
            total_distance: 0.0,
            total_duration: None,
            emissions_kg: None,
        };
        assert_eq!(route.visits(), &[3, 1]);
    }

    #[cfg(feature = "serde")]
    #[rstest]
    fn status_serialises_lowercase() {
        let json = serde_json::to_string(&SolveStatus::Infeasible).expect("serialise status");
        assert_eq!(json, "\"infeasible\"");
    }
}
