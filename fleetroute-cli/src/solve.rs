//! Solve command implementation.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use fleetroute::{PlanRequest, RoutesResult, SolveRequest};
use log::debug;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::backend::{
    DefaultDispatcherBuilder, DispatcherBuilder, backend_config, default_osrm_base_url,
};
use crate::fs::{read_json, require_existing};
use crate::output::write_json;
use crate::{
    ARG_ENGINE_BASE_URL, ARG_OSRM_BASE_URL, ARG_OUTPUT, ARG_SOLVE_ADAPTER, ARG_SOLVE_REQUEST,
    ARG_SOLVE_SOLVER, ARG_TIME_LIMIT, CliError, ENV_SOLVE_REQUEST,
};

/// CLI arguments for the `solve` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Solve a routing request read from a JSON file. The file holds \
                 either a solve request over a matrix or coordinates, or a plan \
                 request over waypoints that is routed through a matrix adapter \
                 first. The enriched result is printed as JSON.",
    about = "Solve a routing request"
)]
#[ortho_config(prefix = "FLEETROUTE")]
pub(crate) struct SolveArgs {
    /// Path to a JSON file containing a solve or plan request.
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) request_path: Option<Utf8PathBuf>,
    /// Solver to run instead of the one named in the request.
    #[arg(long = ARG_SOLVE_SOLVER, value_name = "name")]
    #[serde(default)]
    pub(crate) solver: Option<String>,
    /// Matrix adapter to use instead of the one named in a plan request.
    #[arg(long = ARG_SOLVE_ADAPTER, value_name = "name")]
    #[serde(default)]
    pub(crate) adapter: Option<String>,
    /// Base URL for the OSRM server (e.g. "http://localhost:5000").
    #[arg(long = ARG_OSRM_BASE_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) osrm_base_url: Option<String>,
    /// Base URL for the external routing engine.
    #[arg(long = ARG_ENGINE_BASE_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) engine_base_url: Option<String>,
    /// Search budget in seconds, overriding the request.
    #[arg(long = ARG_TIME_LIMIT, value_name = "seconds")]
    #[serde(default)]
    pub(crate) time_limit_secs: Option<u64>,
    /// Write the result here instead of standard output.
    #[arg(long = ARG_OUTPUT, short = 'o', value_name = "path")]
    #[serde(default)]
    pub(crate) output: Option<Utf8PathBuf>,
}

impl SolveArgs {
    pub(crate) fn into_config(self) -> Result<SolveConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        SolveConfig::try_from(merged)
    }
}

/// Resolved `solve` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SolveConfig {
    pub(crate) request_path: Utf8PathBuf,
    pub(crate) solver: Option<String>,
    pub(crate) adapter: Option<String>,
    pub(crate) osrm_base_url: String,
    pub(crate) engine_base_url: Option<String>,
    pub(crate) time_limit_secs: Option<u64>,
    pub(crate) output: Option<Utf8PathBuf>,
}

impl TryFrom<SolveArgs> for SolveConfig {
    type Error = CliError;

    fn try_from(args: SolveArgs) -> Result<Self, Self::Error> {
        let request_path = args.request_path.ok_or(CliError::MissingArgument {
            field: ARG_SOLVE_REQUEST,
            env: ENV_SOLVE_REQUEST,
        })?;
        Ok(Self {
            request_path,
            solver: args.solver,
            adapter: args.adapter,
            osrm_base_url: args.osrm_base_url.unwrap_or_else(default_osrm_base_url),
            engine_base_url: args.engine_base_url,
            time_limit_secs: args.time_limit_secs,
            output: args.output,
        })
    }
}

/// The two request shapes accepted by `solve`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub(crate) enum RequestDocument {
    /// Waypoints routed through a matrix adapter first.
    Plan(PlanRequest),
    /// A matrix or coordinate request.
    Solve(SolveRequest),
}

impl RequestDocument {
    fn apply_overrides(&mut self, config: &SolveConfig) {
        let (solver, time_limit_secs) = match self {
            Self::Plan(plan) => {
                if let Some(adapter) = &config.adapter {
                    plan.adapter.clone_from(adapter);
                }
                (&mut plan.solver, &mut plan.time_limit_secs)
            }
            Self::Solve(request) => (&mut request.solver, &mut request.time_limit_secs),
        };
        if let Some(name) = &config.solver {
            solver.clone_from(name);
        }
        if config.time_limit_secs.is_some() {
            *time_limit_secs = config.time_limit_secs;
        }
    }
}

pub(crate) fn run_solve(args: SolveArgs, stdout: &mut dyn Write) -> Result<(), CliError> {
    run_solve_with(args, &DefaultDispatcherBuilder, stdout)
}

pub(crate) fn run_solve_with(
    args: SolveArgs,
    builder: &dyn DispatcherBuilder,
    stdout: &mut dyn Write,
) -> Result<(), CliError> {
    let config = args.into_config()?;
    let result = execute_solve(&config, builder)?;
    write_json(&result, config.output.as_deref(), stdout)
}

fn execute_solve(
    config: &SolveConfig,
    builder: &dyn DispatcherBuilder,
) -> Result<RoutesResult, CliError> {
    let document = load_request(config)?;
    let dispatcher = builder.build(&backend_config(
        &config.osrm_base_url,
        config.engine_base_url.as_deref(),
    ))?;
    let result = match &document {
        RequestDocument::Plan(plan) => {
            debug!("planning with adapter `{}` and solver `{}`", plan.adapter, plan.solver);
            dispatcher.plan(plan)?
        }
        RequestDocument::Solve(request) => {
            debug!("solving with solver `{}`", request.solver);
            dispatcher.solve(request)?
        }
    };
    Ok(result)
}

/// Load the request document and apply the command-line overrides.
pub(crate) fn load_request(config: &SolveConfig) -> Result<RequestDocument, CliError> {
    require_existing(&config.request_path, ARG_SOLVE_REQUEST)?;
    let mut document: RequestDocument = read_json(&config.request_path)?;
    document.apply_overrides(config);
    if let RequestDocument::Solve(request) = &document {
        request
            .validate()
            .map_err(|source| CliError::InvalidRequest {
                path: config.request_path.clone(),
                source,
            })?;
    }
    Ok(document)
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<SolveConfig, CliError> {
    let merged = SolveArgs::merge_from_layers(layers).map_err(CliError::from)?;
    SolveConfig::try_from(merged)
}
