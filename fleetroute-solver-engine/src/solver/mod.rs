//! `EngineSolver` implementation.

use std::time::Instant;

use fleetroute_core::{
    Diagnostics, MatrixResult, RoutesResult, SolveError, SolveRequest, Solver, accept_routes,
};
use log::{debug, info, warn};

use crate::client::{EngineCapability, EngineConfig};
use crate::fallback::nearest_neighbour;

type Assignment = Vec<(String, Vec<usize>)>;

/// Registry name of [`EngineSolver`].
pub const ENGINE_SOLVER: &str = "engine";

/// Solver delegating to a VROOM-compatible engine.
///
/// Requests with coordinates for every node are sent in coordinate mode;
/// the rest are sent in index mode with the request matrix. Whether the
/// engine is used is decided once, when the solver is built. While it is
/// unavailable, and whenever a call to it fails, routes come from a
/// deterministic nearest-neighbour construction instead, so a missing engine
/// never fails a solve.
///
/// # Examples
///
/// ```
/// use fleetroute_core::{Coordinate, Fleet, Load, SolveRequest, SolveStatus, Solver, Vehicle};
/// use fleetroute_solver_engine::{ENGINE_SOLVER, EngineSolver};
///
/// let stops = vec![
///     Coordinate { x: -122.4194, y: 37.7749 },
///     Coordinate { x: -118.2437, y: 34.0522 },
///     Coordinate { x: -115.1398, y: 36.1699 },
/// ];
/// let fleet = Fleet::new(vec![Vehicle::new("van", Load::scalar(10))])?;
/// let request = SolveRequest::with_coordinates(ENGINE_SOLVER, stops, fleet);
/// let result = EngineSolver::unavailable().solve(&request)?;
/// assert_eq!(result.status, SolveStatus::Success);
/// let route = result.routes.first().map(|route| route.nodes.clone());
/// assert_eq!(route, Some(vec![0, 1, 2, 0]));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct EngineSolver {
    capability: EngineCapability,
}

impl EngineSolver {
    /// Probe the engine described by `config` and keep the outcome.
    #[must_use]
    pub fn new(config: &EngineConfig) -> Self {
        Self::with_capability(EngineCapability::probe(config))
    }

    /// A solver that always uses the fallback.
    #[must_use]
    pub const fn unavailable() -> Self {
        Self::with_capability(EngineCapability::Unavailable)
    }

    /// A solver with an already probed capability.
    #[must_use]
    pub const fn with_capability(capability: EngineCapability) -> Self {
        Self { capability }
    }

    /// The capability recorded at construction.
    #[must_use]
    pub const fn capability(&self) -> &EngineCapability {
        &self.capability
    }

    /// Routes, unassigned customers and whether the fallback produced them.
    fn route(
        &self,
        request: &SolveRequest,
        matrix: &MatrixResult,
    ) -> (Assignment, Vec<usize>, bool) {
        match &self.capability {
            EngineCapability::Available(client) => match client.solve(request, matrix) {
                Ok(tours) => {
                    let (accepted, unassigned) =
                        accept_routes(request, matrix, tours, ENGINE_SOLVER);
                    (accepted, unassigned, false)
                }
                Err(err) => {
                    warn!("engine call failed, using the nearest-neighbour fallback: {err}");
                    let construction = nearest_neighbour(request, matrix);
                    (construction.routes, construction.unassigned, true)
                }
            },
            EngineCapability::Unavailable => {
                debug!("engine unavailable, using the nearest-neighbour fallback");
                let construction = nearest_neighbour(request, matrix);
                (construction.routes, construction.unassigned, true)
            }
        }
    }
}

impl Solver for EngineSolver {
    fn name(&self) -> &str {
        ENGINE_SOLVER
    }

    fn solve(&self, request: &SolveRequest) -> Result<RoutesResult, SolveError> {
        request.validate()?;
        let started_at = Instant::now();
        let matrix = request.distance_matrix()?;

        let (assignment, unassigned, fell_back) = if request.customer_nodes().is_empty() {
            (Vec::new(), Vec::new(), false)
        } else {
            self.route(request, &matrix)
        };

        let result = RoutesResult::from_assignment(
            request,
            &matrix,
            assignment,
            &unassigned,
            Diagnostics::new(ENGINE_SOLVER).with_solve_time(started_at.elapsed()),
        );
        info!(
            "engine solve: {:?} with {} route(s){}",
            result.status,
            result.routes.len(),
            if fell_back { " via fallback" } else { "" }
        );
        if fell_back {
            let message = format!("{} (nearest-neighbour fallback)", result.message);
            return Ok(result.with_message(message));
        }
        Ok(result)
    }
}
