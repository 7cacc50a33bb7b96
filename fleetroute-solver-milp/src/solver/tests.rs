//! Unit tests for `MilpSolver`.

use std::sync::Arc;

use super::*;
use fleetroute_core::test_support::{
    audit_result, scenario_matrix, single_vehicle, timed_matrix, uniform_matrix,
};
use fleetroute_core::{
    Fleet, Load, ObjectiveWeights, SolveStatus, TimeWindow, ValidationError, Vehicle,
};
use rstest::{fixture, rstest};

#[fixture]
fn solver() -> MilpSolver {
    MilpSolver::with_config(MilpSolverConfig::default().with_time_limit(Duration::from_secs(5)))
}

fn scenario(capacity: u32) -> SolveRequest {
    SolveRequest::with_matrix(MILP_SOLVER, scenario_matrix(), single_vehicle(capacity))
        .with_demands(vec![Load::zero(), Load::scalar(3), Load::scalar(4)])
}

fn two_vans() -> Fleet {
    Fleet::new(vec![
        Vehicle::new("north", Load::scalar(999)),
        Vehicle::new("south", Load::scalar(999)),
    ])
    .expect("valid fleet")
}

#[rstest]
fn roomy_vehicle_is_solved_to_optimality(solver: MilpSolver) {
    let request = scenario(999);
    let result = solver.solve(&request).expect("solve should run");
    assert_eq!(result.status, SolveStatus::Success);
    assert_eq!(result.routes.len(), 1);
    assert_eq!(result.total_distance(), 12.0);
    assert!(result.diagnostics.proven_optimal);
    assert_eq!(result.diagnostics.solver, MILP_SOLVER);
    audit_result(&request, &result).expect("result honours constraints");
}

#[rstest]
fn undersized_vehicle_is_infeasible(solver: MilpSolver) {
    let request = scenario(2);
    let result = solver.solve(&request).expect("solve should run");
    assert_eq!(result.status, SolveStatus::Infeasible);
    assert!(result.routes.is_empty());
    assert_eq!(result.unassigned, vec!["1".to_owned(), "2".to_owned()]);
    assert!(!result.diagnostics.proven_optimal);
}

#[rstest]
fn one_unservable_customer_makes_the_instance_infeasible(solver: MilpSolver) {
    let request = scenario(3);
    let result = solver.solve(&request).expect("solve should run");
    assert_eq!(result.status, SolveStatus::Infeasible);
    assert!(result.routes.is_empty());
}

#[rstest]
fn balance_weight_splits_the_work(solver: MilpSolver) {
    let weights = ObjectiveWeights {
        balance: 10.0,
        ..ObjectiveWeights::default()
    };
    let request = SolveRequest::with_matrix(MILP_SOLVER, scenario_matrix(), two_vans())
        .with_objective(weights);
    let result = solver.solve(&request).expect("solve should run");
    assert_eq!(result.status, SolveStatus::Success);
    assert_eq!(result.routes.len(), 2, "two short routes beat one long one");
    assert_eq!(result.total_distance(), 18.0);
    audit_result(&request, &result).expect("result honours constraints");
}

#[rstest]
fn without_balance_one_vehicle_suffices(solver: MilpSolver) {
    let request = SolveRequest::with_matrix(MILP_SOLVER, scenario_matrix(), two_vans());
    let result = solver.solve(&request).expect("solve should run");
    assert_eq!(result.routes.len(), 1);
    assert_eq!(result.total_distance(), 12.0);
}

#[rstest]
fn pickup_precedes_delivery(solver: MilpSolver) {
    let request = scenario(999).with_pairs(vec![(2, 1)]);
    let result = solver.solve(&request).expect("solve should run");
    let route = result.routes.first().expect("pair is routed");
    assert_eq!(route.nodes, vec![0, 2, 1, 0]);
    audit_result(&request, &result).expect("result honours constraints");
}

#[rstest]
fn time_windows_are_enforced(solver: MilpSolver) {
    let tight = TimeWindow::new(0.0, 9.0).expect("valid window");
    let request = SolveRequest::with_matrix(MILP_SOLVER, timed_matrix(), single_vehicle(10))
        .with_time_windows(vec![None, None, Some(tight)]);
    let result = solver.solve(&request).expect("solve should run");
    assert_eq!(result.status, SolveStatus::Success);
    let route = result.routes.first().expect("one route");
    assert_eq!(route.nodes, vec![0, 2, 1, 0]);
    audit_result(&request, &result).expect("result honours constraints");
}

#[rstest]
fn node_budget_keeps_the_incumbent_without_proof() {
    let solver = MilpSolver::with_config(MilpSolverConfig::default().with_node_limit(3));
    let request = scenario(999);
    let result = solver.solve(&request).expect("solve should run");
    assert_eq!(result.status, SolveStatus::Success);
    assert!(!result.diagnostics.proven_optimal);
    assert!(result.message.contains("not proven optimal"));
    audit_result(&request, &result).expect("result honours constraints");
}

#[rstest]
fn abort_before_any_incumbent_is_an_error(solver: MilpSolver) {
    let signal = AbortSignal::new();
    signal.abort();
    let result = solver
        .solve_with_abort(&scenario(999), &signal)
        .expect("solve should run");
    assert_eq!(result.status, SolveStatus::Error);
    assert!(result.routes.is_empty());
    assert_eq!(result.diagnostics.solver, MILP_SOLVER);
}

#[rstest]
fn aborting_one_call_leaves_the_next_untouched() {
    let solver = Arc::new(MilpSolver::new());
    let signal = AbortSignal::new();
    signal.abort();
    let aborted = solver
        .solve_with_abort(&scenario(999), &signal)
        .expect("solve should run");
    assert_eq!(aborted.status, SolveStatus::Error);

    let shared = Arc::clone(&solver);
    let next = std::thread::spawn(move || shared.solve(&scenario(999)))
        .join()
        .expect("thread should finish")
        .expect("solve should run");
    assert_eq!(next.status, SolveStatus::Success);
    assert!(next.diagnostics.proven_optimal);

    let again = solver.solve(&scenario(999)).expect("solve should run");
    assert_eq!(again.status, SolveStatus::Success);
}

#[rstest]
fn unbounded_time_limit_searches_without_a_deadline() {
    let request = scenario(999).with_time_limit_secs(u64::MAX);
    request.validate().expect("request is valid");
    let result = MilpSolver::new().solve(&request).expect("solve should run");
    assert_eq!(result.status, SolveStatus::Success);
    assert!(result.diagnostics.proven_optimal);
    assert_eq!(result.total_distance(), 12.0);
}

#[rstest]
fn nothing_to_route_is_a_success(solver: MilpSolver) {
    let request = SolveRequest::with_matrix(MILP_SOLVER, uniform_matrix(1, 0.0), single_vehicle(1));
    let result = solver.solve(&request).expect("solve should run");
    assert_eq!(result.status, SolveStatus::Success);
    assert!(result.routes.is_empty());
}

#[rstest]
fn invalid_request_is_rejected(solver: MilpSolver) {
    let request = scenario(5).with_depot(7);
    let err = solver.solve(&request).expect_err("depot out of bounds");
    assert!(matches!(
        err,
        SolveError::Validation(ValidationError::DepotOutOfBounds { .. })
    ));
}

#[rstest]
fn uniform_instances_use_every_customer_once(solver: MilpSolver) {
    let request = SolveRequest::with_matrix(MILP_SOLVER, uniform_matrix(6, 7.0), two_vans());
    let result = solver.solve(&request).expect("solve should run");
    assert_eq!(result.status, SolveStatus::Success);
    assert_eq!(result.total_distance(), 42.0);
    audit_result(&request, &result).expect("result honours constraints");
}
