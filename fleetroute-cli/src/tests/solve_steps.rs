//! Behaviour-driven step definitions driving the solve CLI scenarios.

use super::helpers::{scenario_request, workspace, write_request, write_utf8};
use super::*;
use crate::backend::DefaultDispatcherBuilder;
use crate::solve::run_solve_with;
use camino::Utf8PathBuf;
use fleetroute::{RoutesResult, SolveStatus};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::RefCell;
use tempfile::TempDir;

#[derive(Debug)]
struct SolveWorld {
    _tmp: TempDir,
    request_path: Utf8PathBuf,
    include_request: RefCell<bool>,
    cli_args: RefCell<Vec<String>>,
    stdout: RefCell<Vec<u8>>,
    result: RefCell<Option<Result<(), CliError>>>,
}

impl SolveWorld {
    fn new() -> Self {
        let (tmp, root) = workspace();
        Self {
            _tmp: tmp,
            request_path: root.join("request.json"),
            include_request: RefCell::new(true),
            cli_args: RefCell::new(Vec::new()),
            stdout: RefCell::new(Vec::new()),
            result: RefCell::new(None),
        }
    }

    fn build_command_line(&self) -> Vec<String> {
        let mut argv = vec!["fleetroute".to_owned(), "solve".to_owned()];
        if *self.include_request.borrow() {
            argv.push(self.request_path.as_str().to_owned());
        }
        argv.extend(self.cli_args.borrow().iter().cloned());
        argv
    }

    fn error(&self) -> std::cell::Ref<'_, CliError> {
        std::cell::Ref::map(self.result.borrow(), |result| {
            result
                .as_ref()
                .expect("result recorded")
                .as_ref()
                .expect_err("expected error")
        })
    }
}

#[fixture]
fn world() -> SolveWorld {
    SolveWorld::new()
}

#[given("a request for solver {solver} exists on disk")]
fn request_exists(#[from(world)] world: &SolveWorld, solver: String) {
    write_request(&world.request_path, &scenario_request(solver.trim_matches('"')));
}

#[given("I choose solver {solver} on the command line")]
fn choose_solver(#[from(world)] world: &SolveWorld, solver: String) {
    world.cli_args.borrow_mut().extend([
        format!("--{ARG_SOLVE_SOLVER}"),
        solver.trim_matches('"').to_owned(),
    ]);
}

#[given("the solve request contains invalid JSON")]
fn request_contains_invalid_json(#[from(world)] world: &SolveWorld) {
    write_utf8(&world.request_path, b"{ not valid json");
}

#[given("I omit the solve request path")]
fn omit_request_path(#[from(world)] world: &SolveWorld) {
    *world.include_request.borrow_mut() = false;
}

#[when("I run the solve command")]
fn run_solve_command(#[from(world)] world: &SolveWorld) {
    let parsed = Cli::try_parse_from(world.build_command_line()).map_err(CliError::from);
    let outcome = parsed.and_then(|cli| match cli.command {
        Command::Solve(args) => {
            let mut buffer = world.stdout.borrow_mut();
            run_solve_with(args, &DefaultDispatcherBuilder, &mut *buffer)
        }
        Command::Matrix(_) => panic!("expected solve command"),
    });
    world.result.replace(Some(outcome));
}

#[then("the command succeeds with a total distance of {distance}")]
fn command_succeeds(#[from(world)] world: &SolveWorld, distance: f64) {
    if let Some(Err(err)) = world.result.borrow().as_ref() {
        panic!("expected success, found {err}");
    }
    let result: RoutesResult =
        serde_json::from_slice(&world.stdout.borrow()).expect("stdout should hold a result");
    assert_eq!(result.status, SolveStatus::Success, "{}", result.message);
    let total: f64 = result.routes.iter().map(|route| route.total_distance).sum();
    assert!((total - distance).abs() < 1e-9, "travelled {total}");
}

#[then("the result message mentions {text}")]
fn message_mentions(#[from(world)] world: &SolveWorld, text: String) {
    let result: RoutesResult =
        serde_json::from_slice(&world.stdout.borrow()).expect("stdout should hold a result");
    assert!(result.message.contains(text.trim_matches('"')), "{}", result.message);
}

#[then("the command fails because the request JSON is invalid")]
fn command_fails_invalid_json(#[from(world)] world: &SolveWorld) {
    match &*world.error() {
        CliError::ParseInput { path, .. } => assert_eq!(*path, world.request_path),
        other => panic!("expected ParseInput, found {other:?}"),
    }
}

#[then("the command fails because the request path is missing")]
fn command_fails_missing_request_path(#[from(world)] world: &SolveWorld) {
    match &*world.error() {
        CliError::MissingArgument { field, .. } => assert_eq!(*field, ARG_SOLVE_REQUEST),
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

macro_rules! register_solve_scenario {
    ($fn_name:ident, $scenario_title:literal) => {
        #[scenario(path = "tests/features/solve_command.feature", name = $scenario_title)]
        fn $fn_name(#[from(world)] world: SolveWorld) {
            let _ = world;
        }
    };
}

register_solve_scenario!(solve_happy_path, "solving a matrix request from JSON");
register_solve_scenario!(solve_solver_override, "overriding the solver on the command line");
register_solve_scenario!(solve_invalid_json, "rejecting invalid JSON input");
register_solve_scenario!(solve_missing_request, "rejecting missing request paths");
