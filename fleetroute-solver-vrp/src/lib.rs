//! Constraint-search solver for fleetroute backed by `vrp-core`.
//!
//! This crate provides [`VrpSolver`], an implementation of the
//! [`Solver`](fleetroute_core::Solver) trait. Every customer becomes a
//! `vrp-core` job located at its matrix index: single stops as static
//! deliveries, pickup-delivery pairs as multi-jobs that must share a vehicle
//! with the pickup first. Vehicles carry a multi-dimensional capacity and,
//! when the matrix has durations, time windows are enforced by the
//! transport feature's time constraint.
//!
//! The search is a metaheuristic bounded by wall-clock time and generations,
//! so results are the best found rather than proven optimal. Routes coming
//! back from the backend are replayed against the request before they are
//! accepted.

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod solver;
mod vrp;

pub use solver::{VRP_SOLVER, VrpSolver, VrpSolverConfig};
