#![expect(
    clippy::expect_used,
    reason = "behaviour tests use expect for readable failures"
)]

//! Behavioural tests for `MilpSolver` using rstest-bdd.

use std::cell::RefCell;

use fleetroute_core::test_support::{audit_result, scenario_matrix, single_vehicle};
use fleetroute_core::{Load, RoutesResult, SolveRequest, SolveStatus, Solver};
use fleetroute_solver_milp::{AbortSignal, MILP_SOLVER, MilpSolver};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

#[derive(Default)]
struct MilpWorld {
    capacity: RefCell<u32>,
    demands: RefCell<Vec<Load>>,
    solver: MilpSolver,
    abort: AbortSignal,
    result: RefCell<Option<RoutesResult>>,
}

impl MilpWorld {
    fn result(&self) -> RoutesResult {
        self.result.borrow().clone().expect("a solve has run")
    }

    fn request(&self) -> SolveRequest {
        SolveRequest::with_matrix(
            MILP_SOLVER,
            scenario_matrix(),
            single_vehicle(*self.capacity.borrow()),
        )
        .with_demands(self.demands.borrow().clone())
    }
}

#[fixture]
fn world() -> MilpWorld {
    MilpWorld::default()
}

fn status_name(status: SolveStatus) -> &'static str {
    match status {
        SolveStatus::Success => "success",
        SolveStatus::Partial => "partial",
        SolveStatus::Infeasible => "infeasible",
        SolveStatus::Error => "error",
    }
}

#[given("the three-node scenario matrix")]
fn scenario_matrix_given(world: &MilpWorld) {
    world.demands.borrow_mut().clear();
}

#[given("one vehicle with capacity {capacity}")]
fn vehicle_given(world: &MilpWorld, capacity: u32) {
    *world.capacity.borrow_mut() = capacity;
}

#[given("customer demands of {first} and {second}")]
fn demands_given(world: &MilpWorld, first: u32, second: u32) {
    *world.demands.borrow_mut() = vec![Load::zero(), Load::scalar(first), Load::scalar(second)];
}

#[given("the search has been aborted")]
fn aborted(world: &MilpWorld) {
    world.abort.abort();
}

#[when("I solve with the milp solver")]
fn solve(world: &MilpWorld) {
    let request = world.request();
    let result = world
        .solver
        .solve_with_abort(&request, &world.abort)
        .expect("solve should run");
    audit_or_error(&request, &result);
    *world.result.borrow_mut() = Some(result);
}

#[when("the same solver runs the request again without an abort")]
fn solve_again(world: &MilpWorld) {
    let request = world.request();
    let result = world.solver.solve(&request).expect("solve should run");
    audit_or_error(&request, &result);
    *world.result.borrow_mut() = Some(result);
}

fn audit_or_error(request: &SolveRequest, result: &RoutesResult) {
    if result.status != SolveStatus::Error {
        audit_result(request, result).expect("result honours constraints");
    }
}

#[then("the solver reports {status}")]
fn status_is(world: &MilpWorld, status: String) {
    assert_eq!(status_name(world.result().status), status.trim_matches('"'));
}

#[then("the total distance is {distance}")]
fn total_distance(world: &MilpWorld, distance: f64) {
    assert_eq!(world.result().total_distance(), distance);
}

#[then("the result is proven optimal")]
fn proven_optimal(world: &MilpWorld) {
    assert!(world.result().diagnostics.proven_optimal);
}

#[then("no routes are returned")]
fn no_routes(world: &MilpWorld) {
    assert!(world.result().routes.is_empty());
}

#[scenario(path = "tests/features/milp_solver.feature", index = 0)]
fn roomy_vehicle(world: MilpWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/milp_solver.feature", index = 1)]
fn undersized_vehicle(world: MilpWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/milp_solver.feature", index = 2)]
fn aborted_search(world: MilpWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/milp_solver.feature", index = 3)]
fn abort_is_scoped_to_one_request(world: MilpWorld) {
    let _ = world;
}
