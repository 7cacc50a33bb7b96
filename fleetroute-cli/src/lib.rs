//! Command-line interface for solving routing requests with the fleetroute
//! backends.
#![forbid(unsafe_code)]

use std::io::Write;

use clap::{Parser, Subcommand};

mod backend;
mod error;
mod fs;
mod matrix;
mod output;
mod solve;

pub use error::CliError;

use matrix::MatrixArgs;
use solve::SolveArgs;

pub(crate) const ARG_SOLVE_REQUEST: &str = "request-path";
pub(crate) const ARG_SOLVE_SOLVER: &str = "solver";
pub(crate) const ARG_SOLVE_ADAPTER: &str = "adapter";
pub(crate) const ARG_OSRM_BASE_URL: &str = "osrm-base-url";
pub(crate) const ARG_ENGINE_BASE_URL: &str = "engine-base-url";
pub(crate) const ARG_TIME_LIMIT: &str = "time-limit";
pub(crate) const ARG_OUTPUT: &str = "output";
pub(crate) const ARG_MATRIX_WAYPOINTS: &str = "waypoints-path";
pub(crate) const ARG_MATRIX_MODE: &str = "mode";
pub(crate) const ENV_SOLVE_REQUEST: &str = "FLEETROUTE_CMDS_SOLVE_REQUEST_PATH";
pub(crate) const ENV_MATRIX_WAYPOINTS: &str = "FLEETROUTE_CMDS_MATRIX_WAYPOINTS_PATH";

/// Run the CLI with the current process arguments and environment.
///
/// # Errors
///
/// Returns [`CliError`] when arguments or configuration are invalid, an
/// input cannot be read, a backend cannot be resolved or the output cannot
/// be written.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    let mut stdout = std::io::stdout().lock();
    run_command(cli.command, &mut stdout)
}

fn run_command(command: Command, stdout: &mut dyn Write) -> Result<(), CliError> {
    match command {
        Command::Solve(args) => solve::run_solve(args, stdout),
        Command::Matrix(args) => matrix::run_matrix(args, stdout),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "fleetroute",
    about = "Solve vehicle routing requests with pluggable matrix adapters and solvers",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Solve a request read from JSON and print the routes.
    Solve(SolveArgs),
    /// Compute a distance matrix over waypoints read from JSON.
    Matrix(MatrixArgs),
}

#[cfg(test)]
mod tests;
