//! `vrp-core` modelling helpers for `VrpSolver`.
//!
//! This module converts a [`SolveRequest`] and its matrix into a `vrp-core`
//! problem, runs the search, and translates the resulting tours back into
//! `(vehicle_id, nodes)` assignments. Locations are matrix indices, so tour
//! locations map straight back onto request nodes.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use fleetroute_core::{
    Load, MatrixResult, ObjectiveWeights, PairRole, SolveError, SolveRequest, ValidationError,
};
use log::debug;
use vrp_core::models::common::{MultiDimLoad, TimeWindow as VrpTimeWindow};
use vrp_core::models::problem::{Job, Vehicle as VrpVehicle, VehicleIdDimension};
use vrp_core::prelude::*;

use crate::solver::{VRP_SOLVER, VrpSolverConfig};

/// Components a `MultiDimLoad` can hold.
const MAX_LOAD_DIMENSIONS: usize = 8;

fn model_error(err: &impl Display) -> SolveError {
    SolveError::upstream(VRP_SOLVER, err.to_string())
}

fn to_vrp_load(load: &Load, width: usize) -> Result<MultiDimLoad, SolveError> {
    let components = load
        .padded(width)
        .into_iter()
        .map(|value| {
            i32::try_from(value).map_err(|_| {
                SolveError::Validation(ValidationError::Unsupported {
                    backend: VRP_SOLVER,
                    reason: format!("load component {value} exceeds the backend range"),
                })
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(MultiDimLoad::new(components))
}

/// Goods loaded at the depot and dropped at the job.
fn static_delivery(load: MultiDimLoad) -> Demand<MultiDimLoad> {
    Demand {
        pickup: (MultiDimLoad::default(), MultiDimLoad::default()),
        delivery: (load, MultiDimLoad::default()),
    }
}

fn pudo_pickup(load: MultiDimLoad) -> Demand<MultiDimLoad> {
    Demand {
        pickup: (MultiDimLoad::default(), load),
        delivery: (MultiDimLoad::default(), MultiDimLoad::default()),
    }
}

fn pudo_delivery(load: MultiDimLoad) -> Demand<MultiDimLoad> {
    Demand {
        pickup: (MultiDimLoad::default(), MultiDimLoad::default()),
        delivery: (MultiDimLoad::default(), load),
    }
}

struct TransportMatrices {
    distances: Vec<f64>,
    durations: Vec<f64>,
}

impl TransportMatrices {
    /// Flatten the request matrix; distances stand in for absent durations.
    fn new(matrix: &MatrixResult) -> Self {
        let distances: Vec<f64> = matrix.distances().iter().flatten().copied().collect();
        let durations = matrix.durations().map_or_else(
            || distances.clone(),
            |rows| rows.iter().flatten().copied().collect(),
        );
        Self {
            distances,
            durations,
        }
    }

    fn into_transport(self) -> GenericResult<SimpleTransportCost> {
        SimpleTransportCost::new(self.durations, self.distances)
    }
}

fn define_goal(
    transport: Arc<dyn TransportCost>,
    objective: ObjectiveWeights,
    time_constrained: bool,
) -> GenericResult<GoalContext> {
    let minimize_unassigned = MinimizeUnassignedBuilder::new("min-unassigned").build()?;
    let capacity_feature = CapacityFeatureBuilder::<MultiDimLoad>::new("capacity").build()?;
    let builder = TransportFeatureBuilder::new("min-transport")
        .set_transport_cost(transport)
        .set_time_constrained(time_constrained);
    let transport_feature = if objective.prefers_duration() {
        builder.build_minimize_duration()?
    } else {
        builder.build_minimize_distance()?
    };

    GoalContextBuilder::with_features(&[minimize_unassigned, transport_feature, capacity_feature])?
        .build()
}

fn job_builder(
    request: &SolveRequest,
    node: usize,
    demand: Demand<MultiDimLoad>,
) -> GenericResult<SingleBuilder> {
    let mut builder = SingleBuilder::default()
        .id(&request.node_id(node))
        .demand(demand)
        .location(node)?;
    if let Some(window) = request.time_window(node) {
        builder = builder.times(vec![VrpTimeWindow::new(window.start(), window.end())])?;
    }
    let service = request.service_time(node);
    if service > 0.0 {
        builder = builder.duration(service)?;
    }
    Ok(builder)
}

/// Build one job per single stop and one multi-job per pickup-delivery pair.
fn define_jobs(request: &SolveRequest, width: usize) -> Result<Vec<Job>, SolveError> {
    let pairs = request.pairs();
    let mut jobs = Vec::new();
    for node in request.customer_nodes() {
        let job = match pairs.role(node) {
            PairRole::Single => {
                let demand = static_delivery(to_vrp_load(request.demand(node), width)?);
                job_builder(request, node, demand).and_then(SingleBuilder::build_as_job)
            }
            PairRole::Pickup { delivery } => {
                let carried = to_vrp_load(pairs.load(node), width)?;
                let pair_id = format!("{}->{}", request.node_id(node), request.node_id(delivery));
                job_builder(request, node, pudo_pickup(carried.clone()))
                    .and_then(SingleBuilder::build)
                    .and_then(|pickup| {
                        let drop_off =
                            job_builder(request, delivery, pudo_delivery(carried))?.build()?;
                        MultiBuilder::default()
                            .id(pair_id.as_str())
                            .add_job(pickup)
                            .add_job(drop_off)
                            .build_as_job()
                    })
            }
            PairRole::Delivery { .. } => continue,
        };
        jobs.push(job.map_err(|err| model_error(&err))?);
    }
    Ok(jobs)
}

fn define_vehicles(request: &SolveRequest, width: usize) -> Result<Vec<VrpVehicle>, SolveError> {
    let depot = request.depot_index;
    request
        .fleet
        .iter()
        .map(|vehicle| {
            let capacity = to_vrp_load(&vehicle.capacity, width)?;
            let mut detail = VehicleDetailBuilder::default()
                .set_start_location(vehicle.start_node(depot))
                .set_end_location(vehicle.end_node(depot));
            if let Some(window) = vehicle.time_window {
                detail = detail
                    .set_start_time(window.start())
                    .set_end_time(window.end());
            }
            detail
                .build()
                .and_then(|detail| {
                    VehicleBuilder::default()
                        .id(vehicle.id.as_str())
                        .add_detail(detail)
                        .capacity(capacity)
                        .build()
                })
                .map_err(|err| model_error(&err))
        })
        .collect()
}

/// Context for running a `vrp-core` solve with shared settings.
pub(super) struct VrpSolveContext<'a> {
    config: &'a VrpSolverConfig,
    max_time: Duration,
}

impl<'a> VrpSolveContext<'a> {
    /// Create a solve context bounded by `max_time`.
    pub(super) const fn new(config: &'a VrpSolverConfig, max_time: Duration) -> Self {
        Self { config, max_time }
    }

    /// Model and solve `request`, returning `(vehicle_id, nodes)` per tour.
    ///
    /// Tours include the start and end anchors.
    pub(super) fn solve(
        &self,
        request: &SolveRequest,
        matrix: &MatrixResult,
    ) -> Result<Vec<(String, Vec<usize>)>, SolveError> {
        let width = request.fleet.capacity_dimensions();
        if width > MAX_LOAD_DIMENSIONS {
            return Err(SolveError::Validation(ValidationError::Unsupported {
                backend: VRP_SOLVER,
                reason: format!(
                    "{width} capacity dimensions exceed the supported {MAX_LOAD_DIMENSIONS}"
                ),
            }));
        }
        let jobs = define_jobs(request, width)?;
        let vehicles = define_vehicles(request, width)?;
        debug!(
            "vrp model: {} jobs, {} vehicles, {width} load dimension(s)",
            jobs.len(),
            vehicles.len()
        );

        let transport: Arc<dyn TransportCost> = Arc::new(
            TransportMatrices::new(matrix)
                .into_transport()
                .map_err(|err| model_error(&err))?,
        );
        let time_constrained = matrix.durations().is_some();
        let goal = define_goal(transport.clone(), request.objective(), time_constrained)
            .map_err(|err| model_error(&err))?;
        let problem = Arc::new(
            ProblemBuilder::default()
                .add_jobs(jobs.into_iter())
                .add_vehicles(vehicles.into_iter())
                .with_goal(goal)
                .with_transport_cost(transport)
                .build()
                .map_err(|err| model_error(&err))?,
        );

        let max_secs = usize::try_from(self.max_time.as_secs().max(1)).unwrap_or(usize::MAX);
        let vrp_config = VrpConfigBuilder::new(problem.clone())
            .prebuild()
            .map_err(|err| model_error(&err))?
            .with_max_time(Some(max_secs))
            .with_max_generations(Some(self.config.max_generations))
            .build()
            .map_err(|err| model_error(&err))?;

        let solution = vrp_core::solver::Solver::new(problem, vrp_config)
            .solve()
            .map_err(|err| model_error(&err))?;
        debug!(
            "vrp search finished: {} tour(s), {} unassigned job(s), cost {}",
            solution.routes.len(),
            solution.unassigned.len(),
            solution.cost
        );

        solution
            .routes
            .iter()
            .map(|route| {
                let vehicle_id = route
                    .actor
                    .vehicle
                    .dimens
                    .get_vehicle_id()
                    .cloned()
                    .ok_or_else(|| SolveError::upstream(VRP_SOLVER, "tour without vehicle id"))?;
                let nodes = route
                    .tour
                    .all_activities()
                    .map(|activity| activity.place.location)
                    .collect();
                Ok((vehicle_id, nodes))
            })
            .collect()
    }
}
