//! External-engine solver for fleetroute.
//!
//! [`EngineSolver`] sends requests to a VROOM-compatible HTTP engine. The
//! engine is probed once at construction and the outcome is stored as an
//! [`EngineCapability`]. Without an engine, or when a call to it fails,
//! a deterministic nearest-neighbour heuristic builds the routes, so the
//! solver always answers.

#![forbid(unsafe_code)]

mod client;
mod fallback;
mod solver;
mod vroom;

pub use client::{EngineCapability, EngineClient, EngineConfig};
pub use solver::{ENGINE_SOLVER, EngineSolver};
