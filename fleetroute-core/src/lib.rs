//! Core domain types and contracts for the fleetroute engine.
//!
//! The crate defines the canonical vehicle-routing schema shared by every
//! backend: waypoints, vehicles and fleets, distance matrices, solve
//! requests and route results. It also owns the seams the backends plug
//! into:
//!
//! - [`MatrixAdapter`] turns coordinates into a [`MatrixResult`]. The offline
//!   [`HaversineAdapter`] lives here because it has no network dependency.
//! - [`Solver`] turns a [`SolveRequest`] into a [`RoutesResult`].
//! - [`Registry`] maps names to lazily constructed adapters and solvers.
//! - [`Dispatcher`] drives a request through adapter, solver and
//!   [`metrics`] enrichment, converting backend failures into structured
//!   results.
//! - [`geometry`] rebuilds a display path from ordered stops.
//! - [`RouteSchedule`] checks capacity, time windows and pickup-delivery
//!   precedence incrementally for solvers that build routes node by node.
//!
//! Constructors return `Result` so that invalid input is rejected before any
//! backend is invoked.

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod dispatch;
pub mod error;
pub mod geometry;
pub mod matrix;
pub mod metrics;
mod model;
pub mod registry;
#[cfg(feature = "serde")]
mod serde_support;
pub mod solver;

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-support")))]
pub mod test_support;

pub use dispatch::{DispatchError, Dispatcher, DispatcherConfig, PlanRequest};
pub use error::ValidationError;
pub use geometry::{
    DisplayPath, SegmentInfo, SegmentSnapper, SnapError, reconstruct_path, route_path,
};
pub use matrix::{
    HAVERSINE_ADAPTER, HaversineAdapter, MatrixAdapter, MatrixError, MatrixResult, UpstreamCause,
};
pub use metrics::EmissionFactors;
pub use model::{Coordinate, Fleet, Load, TimeWindow, Vehicle, Waypoint, WaypointRole};
pub use registry::{AdapterRegistry, Registry, RegistryError, SolverRegistry};
pub use solver::schedule::{RouteSchedule, RouteViolation, Step, accept_routes, check_route};
pub use solver::{
    Diagnostics, ObjectiveWeights, PairRole, PickupDeliveryIndex, Route, RoutesResult, SolveError,
    SolveRequest, SolveStatus, Solver,
};
