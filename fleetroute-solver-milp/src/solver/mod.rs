//! `MilpSolver` implementation.

use std::time::{Duration, Instant};

use fleetroute_core::{Diagnostics, RoutesResult, SolveError, SolveRequest, Solver};
use log::{debug, warn};

use crate::AbortSignal;
use crate::search::{Budget, Outcome, Search};

/// Registry name of [`MilpSolver`].
pub const MILP_SOLVER: &str = "milp";

/// Configuration for [`MilpSolver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MilpSolverConfig {
    /// Wall-clock budget used when the request sets none.
    pub time_limit: Duration,
    /// Maximum number of search nodes to expand, if any.
    pub node_limit: Option<u64>,
}

impl Default for MilpSolverConfig {
    fn default() -> Self {
        Self {
            time_limit: Duration::from_secs(10),
            node_limit: None,
        }
    }
}

impl MilpSolverConfig {
    /// Set the default wall-clock budget.
    #[must_use]
    pub const fn with_time_limit(mut self, time_limit: Duration) -> Self {
        self.time_limit = time_limit;
        self
    }

    /// Cap the number of expanded search nodes.
    #[must_use]
    pub const fn with_node_limit(mut self, node_limit: u64) -> Self {
        self.node_limit = Some(node_limit);
        self
    }
}

/// Exact solver over binary arc decisions.
///
/// Every customer must be served: an instance where some customer fits no
/// vehicle is reported as infeasible rather than partially routed. A search
/// that runs to completion is proven optimal; one cut short by the time
/// limit, node budget or an [`AbortSignal`] reports its best incumbent as a
/// success without the proof, or an error when it has none.
///
/// [`Solver::solve`] runs with a fresh signal that nobody raises. Callers
/// that need to cancel a single request use [`MilpSolver::solve_with_abort`]
/// with a signal of their own; other requests on the same solver are not
/// affected.
///
/// # Examples
///
/// ```
/// use fleetroute_core::{Fleet, Load, MatrixResult, SolveRequest, SolveStatus, Solver, Vehicle};
/// use fleetroute_solver_milp::{MILP_SOLVER, MilpSolver};
///
/// let matrix = MatrixResult::new(
///     vec![
///         vec![0.0, 5.0, 3.0],
///         vec![5.0, 0.0, 4.0],
///         vec![3.0, 4.0, 0.0],
///     ],
///     None,
/// )?;
/// let fleet = Fleet::new(vec![Vehicle::new("van", Load::scalar(10))])?;
/// let request = SolveRequest::with_matrix(MILP_SOLVER, matrix, fleet);
/// let result = MilpSolver::new().solve(&request)?;
/// assert_eq!(result.status, SolveStatus::Success);
/// assert!(result.diagnostics.proven_optimal);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct MilpSolver {
    config: MilpSolverConfig,
}

impl MilpSolver {
    /// Construct a solver using default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct a solver with explicit configuration.
    #[must_use]
    pub const fn with_config(config: MilpSolverConfig) -> Self {
        Self { config }
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &MilpSolverConfig {
        &self.config
    }

    /// Solve `request`, stopping early once `abort` is raised.
    ///
    /// The signal only governs this call.
    ///
    /// # Errors
    ///
    /// Returns [`SolveError::Validation`] for a malformed request or one
    /// whose distances cannot be read.
    pub fn solve_with_abort(
        &self,
        request: &SolveRequest,
        abort: &AbortSignal,
    ) -> Result<RoutesResult, SolveError> {
        request.validate()?;
        let started_at = Instant::now();
        let matrix = request.distance_matrix()?;
        let customers = request.customer_nodes();
        if customers.is_empty() {
            return Ok(RoutesResult::from_assignment(
                request,
                &matrix,
                Vec::new(),
                &[],
                Diagnostics::new(MILP_SOLVER)
                    .with_solve_time(started_at.elapsed())
                    .with_proven_optimal(true),
            ));
        }

        let time_limit = request.time_limit().unwrap_or(self.config.time_limit);
        let pairs = request.pairs();
        let deadline = started_at.checked_add(time_limit);
        if deadline.is_none() {
            debug!("milp time limit {time_limit:?} is unbounded; searching without a deadline");
        }
        let budget = Budget {
            deadline,
            node_limit: self.config.node_limit,
            abort,
        };
        let (outcome, incumbent, explored) = Search::new(request, &matrix, &pairs, budget).run();
        debug!(
            "milp explored {explored} node(s) in {:?}, outcome {outcome:?}",
            started_at.elapsed()
        );

        let proven = outcome == Outcome::Exhausted;
        let diagnostics = Diagnostics::new(MILP_SOLVER)
            .with_solve_time(started_at.elapsed())
            .with_proven_optimal(proven && incumbent.is_some());
        let result = match (incumbent, outcome) {
            (Some(best), Outcome::Exhausted) => RoutesResult::from_assignment(
                request,
                &matrix,
                best.routes,
                &[],
                diagnostics,
            ),
            (Some(best), Outcome::Stopped) => {
                let routes = best.routes.len();
                RoutesResult::from_assignment(request, &matrix, best.routes, &[], diagnostics)
                    .with_message(format!(
                        "search stopped early; best of {routes} route(s) is not proven optimal"
                    ))
            }
            (None, Outcome::Exhausted) => RoutesResult::from_assignment(
                request,
                &matrix,
                Vec::new(),
                &customers,
                diagnostics,
            ),
            (None, Outcome::Stopped) => {
                warn!("milp search stopped after {explored} node(s) without a feasible solution");
                RoutesResult::error(
                    MILP_SOLVER,
                    "search stopped before finding a feasible solution",
                )
                .with_diagnostics(diagnostics)
            }
        };
        Ok(result)
    }
}

impl Solver for MilpSolver {
    fn name(&self) -> &str {
        MILP_SOLVER
    }

    fn solve(&self, request: &SolveRequest) -> Result<RoutesResult, SolveError> {
        self.solve_with_abort(request, &AbortSignal::new())
    }
}

#[cfg(test)]
mod tests;
