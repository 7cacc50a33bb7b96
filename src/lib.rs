//! Facade crate for the fleetroute solve orchestration layer.
//!
//! This crate re-exports the core request, result and registry types and
//! exposes the optional adapters and solvers behind feature flags. The
//! [`backends`] module assembles registries and a [`Dispatcher`] holding
//! every enabled backend.

#![forbid(unsafe_code)]

pub mod backends;

pub use fleetroute_core::{
    AdapterRegistry, Coordinate, Diagnostics, DispatchError, Dispatcher, DispatcherConfig,
    DisplayPath, EmissionFactors, Fleet, HAVERSINE_ADAPTER, HaversineAdapter, Load, MatrixAdapter,
    MatrixError, MatrixResult, ObjectiveWeights, PlanRequest, Registry, RegistryError, Route,
    RoutesResult, SegmentInfo, SegmentSnapper, SnapError, SolveError, SolveRequest, SolveStatus,
    Solver, SolverRegistry, TimeWindow, UpstreamCause, ValidationError, Vehicle, Waypoint,
    WaypointRole, reconstruct_path, route_path,
};

pub use fleetroute_core::dispatch::DEFAULT_MODE;

pub use backends::{BackendConfig, adapter_registry, dispatcher, solver_registry};

#[cfg(feature = "online")]
pub use fleetroute_data::{HttpMatrixAdapter, HttpMatrixAdapterConfig, OSRM_ADAPTER, OsrmSnapper};

#[cfg(feature = "solver-vrp")]
pub use fleetroute_solver_vrp::{VRP_SOLVER, VrpSolver, VrpSolverConfig};

#[cfg(feature = "solver-milp")]
pub use fleetroute_solver_milp::{AbortSignal, MILP_SOLVER, MilpSolver, MilpSolverConfig};

#[cfg(feature = "solver-engine")]
pub use fleetroute_solver_engine::{
    ENGINE_SOLVER, EngineCapability, EngineConfig, EngineSolver,
};
