//! Backend construction seam shared by the subcommands.

use fleetroute::{
    BackendConfig, Dispatcher, EngineConfig, HttpMatrixAdapterConfig, dispatcher,
};

use crate::CliError;

/// Builds the dispatcher a command runs against.
pub(crate) trait DispatcherBuilder {
    fn build(&self, config: &BackendConfig) -> Result<Dispatcher, CliError>;
}

/// Registers every backend compiled into the facade.
pub(crate) struct DefaultDispatcherBuilder;

impl DispatcherBuilder for DefaultDispatcherBuilder {
    fn build(&self, config: &BackendConfig) -> Result<Dispatcher, CliError> {
        Ok(dispatcher(config)?)
    }
}

/// Backend settings for the given service URLs.
///
/// The engine is only probed when a request names it.
pub(crate) fn backend_config(osrm_base_url: &str, engine_base_url: Option<&str>) -> BackendConfig {
    BackendConfig {
        osrm: HttpMatrixAdapterConfig::new(osrm_base_url),
        engine: engine_base_url.map_or_else(EngineConfig::default, EngineConfig::new),
        ..BackendConfig::default()
    }
}

/// OSRM base URL used when none is configured.
pub(crate) fn default_osrm_base_url() -> String {
    HttpMatrixAdapterConfig::default().base_url
}
