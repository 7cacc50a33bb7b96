//! Matrix command implementation.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use fleetroute::{Coordinate, DEFAULT_MODE, HAVERSINE_ADAPTER, MatrixResult, Waypoint};
use log::debug;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::backend::{
    DefaultDispatcherBuilder, DispatcherBuilder, backend_config, default_osrm_base_url,
};
use crate::fs::{read_json, require_existing};
use crate::output::write_json;
use crate::{
    ARG_MATRIX_MODE, ARG_MATRIX_WAYPOINTS, ARG_OSRM_BASE_URL, ARG_OUTPUT, ARG_SOLVE_ADAPTER,
    CliError, ENV_MATRIX_WAYPOINTS,
};

/// CLI arguments for the `matrix` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Compute the distance matrix between every pair of waypoints \
                 read from a JSON array, using the haversine formula or an \
                 OSRM table service.",
    about = "Compute a distance matrix"
)]
#[ortho_config(prefix = "FLEETROUTE")]
pub(crate) struct MatrixArgs {
    /// Path to a JSON array of waypoints.
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) waypoints_path: Option<Utf8PathBuf>,
    /// Matrix adapter to use (default "haversine").
    #[arg(long = ARG_SOLVE_ADAPTER, value_name = "name")]
    #[serde(default)]
    pub(crate) adapter: Option<String>,
    /// Travel mode passed to the adapter (default "driving").
    #[arg(long = ARG_MATRIX_MODE, value_name = "mode")]
    #[serde(default)]
    pub(crate) mode: Option<String>,
    /// Base URL for the OSRM server.
    #[arg(long = ARG_OSRM_BASE_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) osrm_base_url: Option<String>,
    /// Write the matrix here instead of standard output.
    #[arg(long = ARG_OUTPUT, short = 'o', value_name = "path")]
    #[serde(default)]
    pub(crate) output: Option<Utf8PathBuf>,
}

impl MatrixArgs {
    pub(crate) fn into_config(self) -> Result<MatrixConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        MatrixConfig::try_from(merged)
    }
}

/// Resolved `matrix` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MatrixConfig {
    pub(crate) waypoints_path: Utf8PathBuf,
    pub(crate) adapter: String,
    pub(crate) mode: String,
    pub(crate) osrm_base_url: String,
    pub(crate) output: Option<Utf8PathBuf>,
}

impl TryFrom<MatrixArgs> for MatrixConfig {
    type Error = CliError;

    fn try_from(args: MatrixArgs) -> Result<Self, Self::Error> {
        let waypoints_path = args.waypoints_path.ok_or(CliError::MissingArgument {
            field: ARG_MATRIX_WAYPOINTS,
            env: ENV_MATRIX_WAYPOINTS,
        })?;
        Ok(Self {
            waypoints_path,
            adapter: args.adapter.unwrap_or_else(|| HAVERSINE_ADAPTER.to_owned()),
            mode: args.mode.unwrap_or_else(|| DEFAULT_MODE.to_owned()),
            osrm_base_url: args.osrm_base_url.unwrap_or_else(default_osrm_base_url),
            output: args.output,
        })
    }
}

pub(crate) fn run_matrix(args: MatrixArgs, stdout: &mut dyn Write) -> Result<(), CliError> {
    run_matrix_with(args, &DefaultDispatcherBuilder, stdout)
}

pub(crate) fn run_matrix_with(
    args: MatrixArgs,
    builder: &dyn DispatcherBuilder,
    stdout: &mut dyn Write,
) -> Result<(), CliError> {
    let config = args.into_config()?;
    let matrix = execute_matrix(&config, builder)?;
    write_json(&matrix, config.output.as_deref(), stdout)
}

fn execute_matrix(
    config: &MatrixConfig,
    builder: &dyn DispatcherBuilder,
) -> Result<MatrixResult, CliError> {
    require_existing(&config.waypoints_path, ARG_MATRIX_WAYPOINTS)?;
    let waypoints: Vec<Waypoint> = read_json(&config.waypoints_path)?;
    let coords: Vec<Coordinate> = waypoints.iter().map(|w| w.location).collect();
    let dispatcher = builder.build(&backend_config(&config.osrm_base_url, None))?;
    debug!(
        "computing a {n}x{n} matrix with adapter `{}`",
        config.adapter,
        n = coords.len()
    );
    Ok(dispatcher.matrix(&config.adapter, &coords, &coords, &config.mode)?)
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<MatrixConfig, CliError> {
    let merged = MatrixArgs::merge_from_layers(layers).map_err(CliError::from)?;
    MatrixConfig::try_from(merged)
}
