//! Registries pre-populated with every enabled backend.
//!
//! Backends are registered lazily: nothing is constructed, and no engine is
//! probed, until the first lookup of its name.

use std::sync::Arc;

use fleetroute_core::{
    AdapterRegistry, Dispatcher, DispatcherConfig, HAVERSINE_ADAPTER, HaversineAdapter,
    RegistryError, SolverRegistry,
};
use log::debug;

#[cfg(feature = "online")]
use fleetroute_core::MatrixAdapter;
#[cfg(any(feature = "solver-vrp", feature = "solver-milp", feature = "solver-engine"))]
use fleetroute_core::Solver;

#[cfg(feature = "online")]
use fleetroute_data::{HttpMatrixAdapter, HttpMatrixAdapterConfig, OSRM_ADAPTER};
#[cfg(feature = "solver-engine")]
use fleetroute_solver_engine::{ENGINE_SOLVER, EngineConfig, EngineSolver};
#[cfg(feature = "solver-milp")]
use fleetroute_solver_milp::{MILP_SOLVER, MilpSolver, MilpSolverConfig};
#[cfg(feature = "solver-vrp")]
use fleetroute_solver_vrp::{VRP_SOLVER, VrpSolver, VrpSolverConfig};

/// Settings for every backend the facade can register.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackendConfig {
    /// Travel speed for haversine durations; distances only when absent.
    pub haversine_speed_kmh: Option<f64>,
    /// OSRM Table service settings.
    #[cfg(feature = "online")]
    pub osrm: HttpMatrixAdapterConfig,
    /// `vrp-core` search budget.
    #[cfg(feature = "solver-vrp")]
    pub vrp: VrpSolverConfig,
    /// Branch-and-bound budget.
    #[cfg(feature = "solver-milp")]
    pub milp: MilpSolverConfig,
    /// External engine location.
    #[cfg(feature = "solver-engine")]
    pub engine: EngineConfig,
    /// Dispatcher settings.
    pub dispatcher: DispatcherConfig,
}

/// Adapters: `haversine`, plus `osrm` with the `online` feature.
///
/// # Errors
///
/// Returns [`RegistryError::Duplicate`] only if two backends share a name.
pub fn adapter_registry(config: &BackendConfig) -> Result<AdapterRegistry, RegistryError> {
    let mut registry = AdapterRegistry::new("adapter");
    let haversine = config
        .haversine_speed_kmh
        .map_or_else(HaversineAdapter::default, HaversineAdapter::with_speed_kmh);
    registry.register_instance(HAVERSINE_ADAPTER, Arc::new(haversine))?;

    #[cfg(feature = "online")]
    {
        let osrm = config.osrm.clone();
        registry.register(OSRM_ADAPTER, move || {
            HttpMatrixAdapter::with_config(osrm.clone())
                .map(|adapter| Arc::new(adapter) as Arc<dyn MatrixAdapter>)
                .map_err(|err| err.to_string())
        })?;
    }

    debug!("adapters available: {:?}", registry.list());
    Ok(registry)
}

/// Solvers: `vrp`, `milp` and `engine`, each behind its feature.
///
/// # Errors
///
/// Returns [`RegistryError::Duplicate`] only if two backends share a name.
#[cfg_attr(
    not(any(feature = "solver-vrp", feature = "solver-milp", feature = "solver-engine")),
    expect(unused_mut, reason = "no solver features are enabled")
)]
pub fn solver_registry(config: &BackendConfig) -> Result<SolverRegistry, RegistryError> {
    let mut registry = SolverRegistry::new("solver");

    #[cfg(feature = "solver-vrp")]
    {
        let vrp = config.vrp.clone();
        registry.register(VRP_SOLVER, move || {
            Ok(Arc::new(VrpSolver::with_config(vrp.clone())) as Arc<dyn Solver>)
        })?;
    }

    #[cfg(feature = "solver-milp")]
    {
        let milp = config.milp.clone();
        registry.register(MILP_SOLVER, move || {
            Ok(Arc::new(MilpSolver::with_config(milp.clone())) as Arc<dyn Solver>)
        })?;
    }

    #[cfg(feature = "solver-engine")]
    {
        let engine = config.engine.clone();
        registry.register(ENGINE_SOLVER, move || {
            Ok(Arc::new(EngineSolver::new(&engine)) as Arc<dyn Solver>)
        })?;
    }

    #[cfg(not(any(feature = "solver-vrp", feature = "solver-milp", feature = "solver-engine")))]
    let _ = config;

    debug!("solvers available: {:?}", registry.list());
    Ok(registry)
}

/// A dispatcher over [`adapter_registry`] and [`solver_registry`].
///
/// # Errors
///
/// Returns [`RegistryError::Duplicate`] only if two backends share a name.
///
/// # Examples
///
/// ```
/// use fleetroute::{BackendConfig, HAVERSINE_ADAPTER, dispatcher};
///
/// let dispatcher = dispatcher(&BackendConfig::default())?;
/// assert!(dispatcher.adapters().contains(HAVERSINE_ADAPTER));
/// # Ok::<(), fleetroute::RegistryError>(())
/// ```
pub fn dispatcher(config: &BackendConfig) -> Result<Dispatcher, RegistryError> {
    let adapters = adapter_registry(config)?;
    let solvers = solver_registry(config)?;
    Ok(Dispatcher::new(Arc::new(adapters), Arc::new(solvers))
        .with_config(config.dispatcher.clone()))
}
