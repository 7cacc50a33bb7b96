//! Exact arc-selection solver for fleetroute.
//!
//! [`MilpSolver`] treats routing as a choice of binary arc decisions
//! `x[v][i][j]`: vehicle `v` drives from node `i` to node `j`. Arcs are
//! fixed depth-first, always extending a path from the vehicle's start, so
//! subtours cannot form. Every partial assignment is checked for capacity,
//! time windows and pickup-delivery precedence, and pruned against a lower
//! bound of its cost so far plus the cheapest incoming arc of every node
//! still to be served.
//!
//! The search is exact but exponential. It is bounded by a deadline, an
//! optional node budget and a cooperative [`AbortSignal`]; when stopped
//! early it reports the best incumbent as a success that is not proven
//! optimal.

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod abort;
mod search;
mod solver;

pub use abort::AbortSignal;
pub use solver::{MILP_SOLVER, MilpSolver, MilpSolverConfig};
