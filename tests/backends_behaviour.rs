#![expect(
    clippy::expect_used,
    reason = "behaviour tests use expect for readable failures"
)]

//! Behavioural tests running the reference scenarios through the default
//! backends.

use std::cell::RefCell;
use std::time::Duration;

use fleetroute::{
    BackendConfig, Coordinate, DispatchError, Dispatcher, ENGINE_SOLVER, Fleet, HAVERSINE_ADAPTER,
    Load, PlanRequest, RoutesResult, SolveRequest, SolveStatus, Vehicle, VrpSolverConfig, Waypoint,
    dispatcher,
};
use fleetroute_core::test_support::{scenario_matrix, single_vehicle};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

#[derive(Default)]
struct BackendWorld {
    dispatcher: RefCell<Option<Dispatcher>>,
    results: RefCell<Vec<(String, RoutesResult)>>,
}

#[fixture]
fn world() -> BackendWorld {
    BackendWorld::default()
}

impl BackendWorld {
    fn solve_with_every_solver(&self, request: &SolveRequest) {
        let borrowed = self.dispatcher.borrow();
        let dispatcher = borrowed.as_ref().expect("backends should be configured");
        let outcomes: Vec<(String, RoutesResult)> = dispatcher
            .solvers()
            .list()
            .into_iter()
            .map(|name| {
                let mut named = request.clone();
                name.clone_into(&mut named.solver);
                let result = dispatcher.solve(&named).expect("solve should run");
                (name.to_owned(), result)
            })
            .collect();
        self.results.replace(outcomes);
    }

    fn plan(&self, plan: &PlanRequest) -> Result<RoutesResult, DispatchError> {
        self.dispatcher
            .borrow()
            .as_ref()
            .expect("backends should be configured")
            .plan(plan)
    }
}

fn three_node(capacity: u32) -> SolveRequest {
    SolveRequest::with_matrix("any", scenario_matrix(), single_vehicle(capacity))
        .with_demands(vec![Load::zero(), Load::scalar(3), Load::scalar(4)])
}

#[given("the default backends")]
fn given_backends(world: &BackendWorld) {
    let config = BackendConfig {
        vrp: VrpSolverConfig::default()
            .with_max_time(Duration::from_secs(2))
            .with_max_generations(50),
        ..BackendConfig::default()
    };
    world
        .dispatcher
        .replace(Some(dispatcher(&config).expect("backends register")));
}

#[when("the three-node scenario with capacity {capacity} is solved by every solver")]
fn when_three_node(world: &BackendWorld, capacity: u32) {
    world.solve_with_every_solver(&three_node(capacity));
}

#[when("a pickup at node 1 for node 2 is solved by every solver")]
fn when_pickup(world: &BackendWorld) {
    let request = SolveRequest::with_matrix("any", scenario_matrix(), single_vehicle(10))
        .with_demands(vec![Load::zero(), Load::scalar(2), Load::scalar(5)])
        .with_pairs(vec![(1, 2)]);
    world.solve_with_every_solver(&request);
}

#[when("the west coast cities are planned twice with the engine solver")]
fn when_west_coast(world: &BackendWorld) {
    let waypoints = vec![
        Waypoint::depot("sf", Coordinate { x: -122.4194, y: 37.7749 }),
        Waypoint::stop("la", Coordinate { x: -118.2437, y: 34.0522 }),
        Waypoint::stop("lv", Coordinate { x: -115.1398, y: 36.1699 }),
    ];
    let fleet = Fleet::new(vec![Vehicle::new("van", Load::scalar(10))]).expect("valid fleet");
    let plan = PlanRequest::new(HAVERSINE_ADAPTER, ENGINE_SOLVER, waypoints, fleet);
    let first = world.plan(&plan).expect("first plan runs");
    let second = world.plan(&plan).expect("second plan runs");
    world.results.replace(vec![
        ("first".to_owned(), first),
        ("second".to_owned(), second),
    ]);
}

#[then("every solver succeeds with a total distance of {distance}")]
fn then_distance(world: &BackendWorld, distance: f64) {
    let results = world.results.borrow();
    assert!(!results.is_empty(), "at least one solver should be registered");
    for (name, result) in results.iter() {
        assert_eq!(result.status, SolveStatus::Success, "{name}: {}", result.message);
        let total: f64 = result.routes.iter().map(|route| route.total_distance).sum();
        assert!((total - distance).abs() < 1e-9, "{name} travelled {total}");
    }
}

#[then("no solver reports success")]
fn then_no_success(world: &BackendWorld) {
    for (name, result) in world.results.borrow().iter() {
        assert_ne!(result.status, SolveStatus::Success, "{name} overloaded the van");
        assert!(result.routes.is_empty(), "{name} returned an over-capacity route");
    }
}

#[then("both plans visit every city in the same order")]
fn then_same_order(world: &BackendWorld) {
    let results = world.results.borrow();
    let routes: Vec<Vec<usize>> = results
        .iter()
        .map(|(_, result)| {
            assert_eq!(result.status, SolveStatus::Success, "{}", result.message);
            let route = result.routes.first().expect("one route");
            route.nodes.clone()
        })
        .collect();
    assert_eq!(routes.first(), Some(&vec![0, 1, 2, 0]));
    assert_eq!(routes.first(), routes.get(1));
}

#[then("every route visits node 1 before node 2")]
fn then_pickup_first(world: &BackendWorld) {
    for (name, result) in world.results.borrow().iter() {
        let route = result.routes.first().expect("the pair is routed");
        let pickup = route.nodes.iter().position(|&node| node == 1);
        let delivery = route.nodes.iter().position(|&node| node == 2);
        assert!(pickup < delivery, "{name} delivered before picking up: {:?}", route.nodes);
    }
}

#[scenario(path = "tests/features/backends.feature", index = 0)]
fn every_solver_finds_the_tour(world: BackendWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/backends.feature", index = 1)]
fn no_solver_overloads(world: BackendWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/backends.feature", index = 2)]
fn fallback_plans_repeatably(world: BackendWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/backends.feature", index = 3)]
fn pickups_precede_deliveries(world: BackendWorld) {
    let _ = world;
}
