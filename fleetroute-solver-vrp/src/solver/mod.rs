//! `VrpSolver` implementation backed by `vrp-core`.

use std::time::{Duration, Instant};

use fleetroute_core::{Diagnostics, RoutesResult, SolveError, SolveRequest, Solver, accept_routes};
use log::debug;

use crate::vrp::VrpSolveContext;

/// Registry name of [`VrpSolver`].
pub const VRP_SOLVER: &str = "vrp";

/// Configuration for [`VrpSolver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VrpSolverConfig {
    /// Wall-clock budget for the search, rounded up to whole seconds.
    pub max_time: Duration,
    /// Upper bound on `vrp-core` generations.
    pub max_generations: usize,
}

impl Default for VrpSolverConfig {
    fn default() -> Self {
        Self {
            max_time: Duration::from_secs(30),
            max_generations: 200,
        }
    }
}

impl VrpSolverConfig {
    /// Set the wall-clock budget.
    #[must_use]
    pub const fn with_max_time(mut self, max_time: Duration) -> Self {
        self.max_time = max_time;
        self
    }

    /// Set the generation limit.
    #[must_use]
    pub const fn with_max_generations(mut self, max_generations: usize) -> Self {
        self.max_generations = max_generations;
        self
    }
}

/// Constraint-search solver using `vrp-core`.
///
/// A request's `time_limit_secs` overrides the configured budget. The
/// result is the best solution found within the budget, reported as a
/// success with `proven_optimal = false` when every customer is served.
#[derive(Debug, Clone, Default)]
pub struct VrpSolver {
    config: VrpSolverConfig,
}

impl VrpSolver {
    /// Construct a solver using default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct a solver with explicit configuration.
    #[must_use]
    pub const fn with_config(config: VrpSolverConfig) -> Self {
        Self { config }
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &VrpSolverConfig {
        &self.config
    }
}

impl Solver for VrpSolver {
    fn name(&self) -> &str {
        VRP_SOLVER
    }

    fn solve(&self, request: &SolveRequest) -> Result<RoutesResult, SolveError> {
        request.validate()?;
        let started_at = Instant::now();
        let matrix = request.distance_matrix()?;

        let assignment = if request.customer_nodes().is_empty() {
            Vec::new()
        } else {
            let max_time = request.time_limit().unwrap_or(self.config.max_time);
            VrpSolveContext::new(&self.config, max_time).solve(request, &matrix)?
        };
        let (assignment, unassigned) = accept_routes(request, &matrix, assignment, VRP_SOLVER);
        debug!(
            "vrp solved {} route(s) with {} unassigned in {:?}",
            assignment.len(),
            unassigned.len(),
            started_at.elapsed()
        );

        Ok(RoutesResult::from_assignment(
            request,
            &matrix,
            assignment,
            &unassigned,
            Diagnostics::new(VRP_SOLVER).with_solve_time(started_at.elapsed()),
        ))
    }
}
