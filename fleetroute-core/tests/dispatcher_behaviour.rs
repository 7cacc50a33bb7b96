#![expect(
    clippy::expect_used,
    reason = "behaviour tests use expect for readable failures"
)]

//! Behavioural tests for the dispatcher and geometry reconstruction.

use std::cell::RefCell;
use std::sync::Arc;

use fleetroute_core::test_support::{
    FailingSegmentSnapper, PanickingSolver, StubSolver, scenario_matrix, single_vehicle,
};
use fleetroute_core::{
    AdapterRegistry, Coordinate, DispatchError, Dispatcher, DisplayPath, Load, RoutesResult,
    SolveRequest, SolveStatus, Solver, SolverRegistry, reconstruct_path,
};
use geo::Coord;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

#[derive(Default)]
struct DispatchWorld {
    dispatcher: RefCell<Option<Dispatcher>>,
    outcome: RefCell<Option<Result<RoutesResult, DispatchError>>>,
    stops: RefCell<Vec<Coordinate>>,
    path: RefCell<Option<DisplayPath>>,
}

#[fixture]
fn world() -> DispatchWorld {
    DispatchWorld::default()
}

fn result(world: &DispatchWorld) -> RoutesResult {
    world
        .outcome
        .borrow()
        .clone()
        .expect("a solve should have run")
        .expect("the solve should return a result")
}

#[given("a dispatcher with the stub solver registered")]
fn given_dispatcher(world: &DispatchWorld) {
    let mut solvers = SolverRegistry::new("solver");
    solvers
        .register("stub", || Ok(Arc::new(StubSolver::new("stub")) as Arc<dyn Solver>))
        .expect("register stub");
    solvers
        .register("boom", || Ok(Arc::new(PanickingSolver) as Arc<dyn Solver>))
        .expect("register panicking solver");
    let dispatcher = Dispatcher::new(Arc::new(AdapterRegistry::new("adapter")), Arc::new(solvers));
    world.dispatcher.replace(Some(dispatcher));
}

#[when("I solve the three-node scenario with solver {name}")]
fn when_solve(world: &DispatchWorld, name: String) {
    let request =
        SolveRequest::with_matrix(name.trim_matches('"'), scenario_matrix(), single_vehicle(999))
            .with_demands(vec![Load::zero(), Load::scalar(3), Load::scalar(4)]);
    let outcome = world
        .dispatcher
        .borrow()
        .as_ref()
        .expect("dispatcher should be configured")
        .solve(&request);
    world.outcome.replace(Some(outcome));
}

#[then("the call fails because the solver is not registered")]
fn then_not_found(world: &DispatchWorld) {
    let outcome = world.outcome.borrow();
    let err = outcome
        .as_ref()
        .expect("a solve should have run")
        .as_ref()
        .expect_err("an unregistered solver should abort");
    assert!(matches!(err, DispatchError::NotFound { kind: "solver", .. }));
}

#[then("the result status is error")]
fn then_error(world: &DispatchWorld) {
    assert_eq!(result(world).status, SolveStatus::Error);
}

#[then("the result status is success")]
fn then_success(world: &DispatchWorld) {
    assert_eq!(result(world).status, SolveStatus::Success);
}

#[then("the message names the solver {name}")]
fn then_message_names(world: &DispatchWorld, name: String) {
    let message = result(world).message;
    assert!(message.contains(name.trim_matches('"')), "message was {message}");
}

#[then("the route distance is {distance}")]
fn then_distance(world: &DispatchWorld, distance: f64) {
    let routes = result(world).routes;
    let route = routes.first().expect("one route");
    assert!((route.total_distance - distance).abs() < f64::EPSILON);
}

#[given("four stops around a square")]
fn given_stops(world: &DispatchWorld) {
    world.stops.replace(vec![
        Coord { x: 0.0, y: 0.0 },
        Coord { x: 0.01, y: 0.0 },
        Coord { x: 0.01, y: 0.01 },
        Coord { x: 0.0, y: 0.01 },
    ]);
}

#[when("I reconstruct the path with the second segment failing")]
fn when_reconstruct(world: &DispatchWorld) {
    let stops = world.stops.borrow();
    let failing_from = *stops.get(1).expect("four stops");
    let path = reconstruct_path(&stops, &FailingSegmentSnapper::new(failing_from));
    world.path.replace(Some(path));
}

#[then("the path runs from the first stop to the last stop")]
fn then_end_to_end(world: &DispatchWorld) {
    let stops = world.stops.borrow();
    let path = world.path.borrow();
    let path = path.as_ref().expect("path reconstructed");
    assert_eq!(path.stops, *stops);
    assert_eq!(path.path.first(), stops.first());
    assert_eq!(path.path.last(), stops.last());
}

#[then("only segment {index} is degraded")]
fn then_degraded(world: &DispatchWorld, index: usize) {
    let path = world.path.borrow();
    let path = path.as_ref().expect("path reconstructed");
    let degraded: Vec<usize> = path
        .segments
        .iter()
        .filter(|segment| segment.degraded)
        .map(|segment| segment.from_stop)
        .collect();
    assert_eq!(degraded, vec![index]);
}

#[scenario(path = "tests/features/dispatcher.feature", index = 0)]
fn unregistered_solver(world: DispatchWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/dispatcher.feature", index = 1)]
fn panicking_solver(world: DispatchWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/dispatcher.feature", index = 2)]
fn enriched_stub_solve(world: DispatchWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/dispatcher.feature", index = 3)]
fn degraded_segment(world: DispatchWorld) {
    let _ = world;
}
