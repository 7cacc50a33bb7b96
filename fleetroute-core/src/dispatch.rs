//! Orchestration of adapters, solvers and enrichment.
//!
//! The [`Dispatcher`] is the boundary callers talk to. It validates input,
//! resolves backends from the registries, runs them, and converts backend
//! failures (including panics) into a [`RoutesResult`] with status
//! [`crate::SolveStatus::Error`]. Only validation and not-found failures
//! abort a call.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Instant;

use log::{debug, info, warn};
use thiserror::Error;

use crate::metrics::enrich;
use crate::{
    AdapterRegistry, Coordinate, EmissionFactors, Fleet, MatrixError, MatrixResult,
    ObjectiveWeights, RegistryError, RoutesResult, SolveError, SolveRequest, SolverRegistry,
    ValidationError, Waypoint,
};

/// Failures that abort a dispatcher call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    /// The input was malformed.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// An adapter or solver name is not registered.
    #[error("{kind} `{name}` is not registered")]
    NotFound {
        /// Registry kind.
        kind: &'static str,
        /// Requested name.
        name: String,
    },
    /// A registry was populated with the same name twice.
    #[error("{kind} `{name}` is already registered")]
    Duplicate {
        /// Registry kind.
        kind: &'static str,
        /// Repeated name.
        name: String,
    },
    /// A matrix adapter failed; solves report this as a result instead.
    #[error("{component} failed: {message}")]
    Upstream {
        /// Failing component.
        component: String,
        /// Failure description.
        message: String,
    },
}

impl From<RegistryError> for DispatchError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound { kind, name } => Self::NotFound { kind, name },
            RegistryError::Duplicate { kind, name } => Self::Duplicate { kind, name },
            RegistryError::Construction { name, message, .. } => Self::Upstream {
                component: name,
                message,
            },
        }
    }
}

/// Dispatcher settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatcherConfig {
    /// Emission factors; emissions are omitted when absent.
    pub emissions: Option<EmissionFactors>,
}

impl DispatcherConfig {
    /// Enable emissions estimates.
    #[must_use]
    pub fn with_emissions(mut self, factors: EmissionFactors) -> Self {
        self.emissions = Some(factors);
        self
    }
}

/// A waypoint-level planning request: matrix, solve and enrichment.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlanRequest {
    /// Matrix adapter name.
    pub adapter: String,
    /// Solver name.
    pub solver: String,
    /// Travel mode passed to the adapter.
    #[cfg_attr(feature = "serde", serde(default = "default_mode"))]
    pub mode: String,
    /// Waypoints, exactly one of which is the depot.
    pub waypoints: Vec<Waypoint>,
    /// Vehicles.
    pub fleet: Fleet,
    /// Objective weights.
    #[cfg_attr(feature = "serde", serde(default))]
    pub objective: Option<ObjectiveWeights>,
    /// Search budget override in seconds.
    #[cfg_attr(feature = "serde", serde(default))]
    pub time_limit_secs: Option<u64>,
}

/// Travel mode used when none is given.
pub const DEFAULT_MODE: &str = "driving";

#[cfg(feature = "serde")]
fn default_mode() -> String {
    DEFAULT_MODE.to_owned()
}

impl PlanRequest {
    /// A plan in the default travel mode.
    #[must_use]
    pub fn new(
        adapter: impl Into<String>,
        solver: impl Into<String>,
        waypoints: Vec<Waypoint>,
        fleet: Fleet,
    ) -> Self {
        Self {
            adapter: adapter.into(),
            solver: solver.into(),
            mode: DEFAULT_MODE.to_owned(),
            waypoints,
            fleet,
            objective: None,
            time_limit_secs: None,
        }
    }

    /// Set the travel mode.
    #[must_use]
    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = mode.into();
        self
    }

    /// Set objective weights.
    #[must_use]
    pub const fn with_objective(mut self, objective: ObjectiveWeights) -> Self {
        self.objective = Some(objective);
        self
    }
}

/// Drives requests through registered adapters and solvers.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    adapters: Arc<AdapterRegistry>,
    solvers: Arc<SolverRegistry>,
    config: DispatcherConfig,
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|msg| (*msg).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_owned())
}

impl Dispatcher {
    /// A dispatcher over populated registries.
    #[must_use]
    pub fn new(adapters: Arc<AdapterRegistry>, solvers: Arc<SolverRegistry>) -> Self {
        Self {
            adapters,
            solvers,
            config: DispatcherConfig::default(),
        }
    }

    /// Replace the configuration.
    #[must_use]
    pub fn with_config(mut self, config: DispatcherConfig) -> Self {
        self.config = config;
        self
    }

    /// Registered adapters.
    #[must_use]
    pub fn adapters(&self) -> &AdapterRegistry {
        &self.adapters
    }

    /// Registered solvers.
    #[must_use]
    pub fn solvers(&self) -> &SolverRegistry {
        &self.solvers
    }

    /// Compute a matrix with the named adapter.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Validation`] for malformed coordinates,
    /// [`DispatchError::NotFound`] for an unknown adapter and
    /// [`DispatchError::Upstream`] when the adapter fails or panics.
    pub fn matrix(
        &self,
        adapter: &str,
        origins: &[Coordinate],
        destinations: &[Coordinate],
        mode: &str,
    ) -> Result<MatrixResult, DispatchError> {
        let backend = self.adapters.get(adapter)?;
        debug!("requesting matrix from adapter `{adapter}`");
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            backend.matrix(origins, destinations, mode)
        }));
        match outcome {
            Ok(Ok(matrix)) => Ok(matrix),
            Ok(Err(MatrixError::Validation(err))) => Err(err.into()),
            Ok(Err(MatrixError::Upstream { adapter: failed, cause })) => {
                warn!("matrix adapter `{failed}` failed: {cause}");
                Err(DispatchError::Upstream {
                    component: adapter.to_owned(),
                    message: cause.to_string(),
                })
            }
            Err(payload) => Err(DispatchError::Upstream {
                component: adapter.to_owned(),
                message: format!("panicked: {}", panic_message(payload.as_ref())),
            }),
        }
    }

    /// Validate, solve and enrich a request.
    ///
    /// Backend failures are reported as a result with status `error`
    /// naming the component.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Validation`] for malformed requests and
    /// [`DispatchError::NotFound`] when the solver is not registered.
    pub fn solve(&self, request: &SolveRequest) -> Result<RoutesResult, DispatchError> {
        request.validate()?;
        let name = request.solver.as_str();
        let solver = match self.solvers.get(name) {
            Ok(solver) => solver,
            Err(err @ RegistryError::Construction { .. }) => {
                warn!("{err}");
                return Ok(RoutesResult::error(name, err.to_string()));
            }
            Err(err) => return Err(err.into()),
        };

        let started = Instant::now();
        let outcome = catch_unwind(AssertUnwindSafe(|| solver.solve(request)));
        let elapsed = started.elapsed();
        let result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(SolveError::Validation(err))) => return Err(err.into()),
            Ok(Err(err @ SolveError::Upstream { .. })) => {
                warn!("solver `{name}` failed: {err}");
                RoutesResult::error(name, err.to_string())
            }
            Err(payload) => {
                let message = format!(
                    "solver `{name}` panicked: {}",
                    panic_message(payload.as_ref())
                );
                warn!("{message}");
                RoutesResult::error(name, message)
            }
        };

        let matrix = request.distance_matrix()?;
        let mut enriched = enrich(&result, request, &matrix, self.config.emissions.as_ref());
        if enriched.diagnostics.solver.is_empty() {
            name.clone_into(&mut enriched.diagnostics.solver);
        }
        enriched.diagnostics.solve_time = elapsed;
        info!(
            "solver `{name}` finished with status {:?}: {} route(s), {} unassigned in {:?}",
            enriched.status,
            enriched.routes.len(),
            enriched.unassigned.len(),
            elapsed
        );
        Ok(enriched)
    }

    /// Run the full flow from waypoints to an enriched result.
    ///
    /// An adapter failure is reported as a result with status `error`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Validation`] for malformed waypoints or
    /// fleet and [`DispatchError::NotFound`] for unknown backends.
    pub fn plan(&self, plan: &PlanRequest) -> Result<RoutesResult, DispatchError> {
        let coords: Vec<Coordinate> = plan.waypoints.iter().map(|w| w.location).collect();
        let matrix = match self.matrix(&plan.adapter, &coords, &coords, &plan.mode) {
            Ok(matrix) => matrix,
            Err(DispatchError::Upstream { component, message }) => {
                return Ok(RoutesResult::error(
                    plan.solver.as_str(),
                    format!("matrix adapter `{component}` failed: {message}"),
                ));
            }
            Err(err) => return Err(err),
        };
        let mut request = SolveRequest::from_waypoints(
            plan.solver.as_str(),
            &plan.waypoints,
            plan.fleet.clone(),
            matrix,
        )?;
        request.objective = plan.objective;
        request.time_limit_secs = plan.time_limit_secs;
        self.solve(&request)
    }
}
