//! Entry point for the `fleetroute` binary.
#![forbid(unsafe_code)]

use std::process::ExitCode;

use fleetroute_cli::CliError;

fn main() -> ExitCode {
    match fleetroute_cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::ArgumentParsing(err)) => err.exit(),
        Err(err) => {
            #[expect(clippy::print_stderr, reason = "the binary reports fatal errors")]
            {
                eprintln!("fleetroute: {err}");
            }
            ExitCode::FAILURE
        }
    }
}
