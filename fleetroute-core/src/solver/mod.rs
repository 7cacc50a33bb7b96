//! Solve requests, results and the solver trait.

mod request;
mod result;
pub mod schedule;

use thiserror::Error;

use crate::ValidationError;

pub use request::{ObjectiveWeights, PairRole, PickupDeliveryIndex, SolveRequest};
pub use result::{Diagnostics, Route, RoutesResult, SolveStatus};

/// Errors returned by [`Solver::solve`].
///
/// Infeasibility and unassigned customers are not errors; they are reported
/// through [`RoutesResult::status`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolveError {
    /// The request was rejected before the backend ran.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The backend could not be invoked or failed while running.
    #[error("{component} failed: {message}")]
    Upstream {
        /// Name of the failing backend.
        component: String,
        /// Failure description.
        message: String,
    },
}

impl SolveError {
    /// An upstream failure of `component`.
    #[must_use]
    pub fn upstream(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Upstream {
            component: component.into(),
            message: message.into(),
        }
    }
}

/// Build routes for a [`SolveRequest`].
///
/// Implementations validate the request before invoking their backend and
/// translate backend output into canonical [`crate::Route`]s. Solvers must
/// be `Send + Sync` so a registry can share them across threads.
///
/// # Examples
///
/// ```
/// use fleetroute_core::{Diagnostics, RoutesResult, SolveError, SolveRequest, Solver};
///
/// struct OutAndBack;
///
/// impl Solver for OutAndBack {
///     fn name(&self) -> &str {
///         "out-and-back"
///     }
///
///     fn solve(&self, request: &SolveRequest) -> Result<RoutesResult, SolveError> {
///         request.validate()?;
///         let matrix = request.distance_matrix()?;
///         let depot = request.depot_index;
///         let vehicles = request.fleet.vehicles();
///         let assignment = request
///             .customer_nodes()
///             .into_iter()
///             .zip(vehicles)
///             .map(|(node, vehicle)| (vehicle.id.clone(), vec![depot, node, depot]))
///             .collect::<Vec<_>>();
///         let served: Vec<usize> = assignment.iter().map(|(_, nodes)| nodes[1]).collect();
///         let unassigned: Vec<usize> = request
///             .customer_nodes()
///             .into_iter()
///             .filter(|node| !served.contains(node))
///             .collect();
///         Ok(RoutesResult::from_assignment(
///             request,
///             &matrix,
///             assignment,
///             &unassigned,
///             Diagnostics::new(self.name()),
///         ))
///     }
/// }
/// ```
pub trait Solver: Send + Sync {
    /// Registry name of this solver.
    fn name(&self) -> &str;

    /// Solve a request.
    ///
    /// # Errors
    ///
    /// Returns [`SolveError::Validation`] for malformed requests and
    /// [`SolveError::Upstream`] when the backend cannot be invoked.
    fn solve(&self, request: &SolveRequest) -> Result<RoutesResult, SolveError>;
}
