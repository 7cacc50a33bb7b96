#![expect(
    clippy::expect_used,
    reason = "property tests use expect for readable failures"
)]

//! Property-based tests for `MilpSolver`.
//!
//! # Invariants tested
//!
//! - **Feasibility:** every result on random capacitated instances passes
//!   the route audit.
//! - **Optimality:** for one uncapacitated vehicle the proven optimum is
//!   never longer than visiting customers in index order.

use fleetroute_core::test_support::audit_result;
use fleetroute_core::{Fleet, Load, MatrixResult, SolveRequest, SolveStatus, Solver, Vehicle};
use fleetroute_solver_milp::{MILP_SOLVER, MilpSolver};
use proptest::prelude::*;

fn instance() -> impl Strategy<Value = (MatrixResult, Vec<u32>)> {
    (3_usize..6).prop_flat_map(|n| {
        let grid = proptest::collection::vec(proptest::collection::vec(1_u32..100, n), n);
        let demands = proptest::collection::vec(0_u32..6, n);
        (grid, demands).prop_map(|(grid, demands)| {
            let distances = grid
                .into_iter()
                .enumerate()
                .map(|(i, row)| {
                    row.into_iter()
                        .enumerate()
                        .map(|(j, value)| if i == j { 0.0 } else { f64::from(value) })
                        .collect()
                })
                .collect();
            let matrix = MatrixResult::new(distances, None).expect("generated matrix is valid");
            (matrix, demands)
        })
    })
}

fn identity_tour(matrix: &MatrixResult) -> f64 {
    let mut nodes: Vec<usize> = (0..matrix.rows()).collect();
    nodes.push(0);
    nodes
        .windows(2)
        .filter_map(|leg| match leg {
            [from, to] => matrix.distance(*from, *to),
            _ => None,
        })
        .sum()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Property: results respect capacity and cover every customer once.
    #[test]
    fn results_pass_the_audit((matrix, demands) in instance()) {
        let fleet = Fleet::new(vec![
            Vehicle::new("a", Load::scalar(6)),
            Vehicle::new("b", Load::scalar(6)),
        ])
        .expect("valid fleet");
        let mut demands: Vec<Load> = demands.into_iter().map(Load::scalar).collect();
        if let Some(depot) = demands.first_mut() {
            *depot = Load::zero();
        }
        let request = SolveRequest::with_matrix(MILP_SOLVER, matrix, fleet).with_demands(demands);
        let result = MilpSolver::new().solve(&request).expect("solve should run");
        prop_assert!(matches!(result.status, SolveStatus::Success | SolveStatus::Infeasible));
        prop_assert_eq!(audit_result(&request, &result), Ok(()));
    }

    /// Property: the optimum is no longer than the index-order tour.
    #[test]
    fn optimum_beats_index_order((matrix, _demands) in instance()) {
        let bound = identity_tour(&matrix);
        let fleet = Fleet::new(vec![Vehicle::new("van", Load::scalar(1))]).expect("valid fleet");
        let request = SolveRequest::with_matrix(MILP_SOLVER, matrix, fleet);
        let result = MilpSolver::new().solve(&request).expect("solve should run");
        prop_assert_eq!(result.status, SolveStatus::Success);
        prop_assert!(result.diagnostics.proven_optimal);
        prop_assert!(result.total_distance() <= bound);
    }
}
