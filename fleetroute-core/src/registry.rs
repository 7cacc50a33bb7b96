//! Name-keyed registries of lazily constructed backends.
//!
//! A [`Registry`] is populated once at start-up through `&mut` access and
//! then shared immutably. Each entry holds a factory and a [`OnceLock`], so
//! the first successful [`Registry::get`] constructs the process-lifetime
//! instance and every later lookup returns a clone of the same [`Arc`]
//! without locking.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use log::debug;
use thiserror::Error;

use crate::{MatrixAdapter, Solver};

/// Errors raised by registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A name was registered twice; this is a start-up configuration bug.
    #[error("{kind} `{name}` is already registered")]
    Duplicate {
        /// Registry kind, e.g. `solver`.
        kind: &'static str,
        /// Repeated name.
        name: String,
    },
    /// No entry exists under the name.
    #[error("{kind} `{name}` is not registered")]
    NotFound {
        /// Registry kind.
        kind: &'static str,
        /// Requested name.
        name: String,
    },
    /// The factory failed; the entry stays uninitialised.
    #[error("failed to construct {kind} `{name}`: {message}")]
    Construction {
        /// Registry kind.
        kind: &'static str,
        /// Entry name.
        name: String,
        /// Factory failure description.
        message: String,
    },
}

type Factory<T> = Box<dyn Fn() -> Result<Arc<T>, String> + Send + Sync>;

struct Entry<T: ?Sized> {
    factory: Factory<T>,
    instance: OnceLock<Arc<T>>,
}

/// Maps names to lazily constructed, shared instances of `T`.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use fleetroute_core::{AdapterRegistry, HaversineAdapter, MatrixAdapter, RegistryError};
///
/// let mut adapters = AdapterRegistry::new("adapter");
/// adapters.register("haversine", || {
///     Ok(Arc::new(HaversineAdapter::default()) as Arc<dyn MatrixAdapter>)
/// })?;
/// assert_eq!(adapters.list(), vec!["haversine"]);
///
/// let first = adapters.get("haversine")?;
/// let second = adapters.get("haversine")?;
/// assert!(Arc::ptr_eq(&first, &second));
/// assert!(matches!(adapters.get("osrm"), Err(RegistryError::NotFound { .. })));
/// # Ok::<(), RegistryError>(())
/// ```
pub struct Registry<T: ?Sized> {
    kind: &'static str,
    entries: BTreeMap<String, Entry<T>>,
}

/// Registry of distance-matrix adapters.
pub type AdapterRegistry = Registry<dyn MatrixAdapter>;

/// Registry of routing solvers.
pub type SolverRegistry = Registry<dyn Solver>;

impl<T: ?Sized> fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("kind", &self.kind)
            .field("names", &self.list())
            .finish()
    }
}

impl<T: ?Sized> Registry<T> {
    /// An empty registry; `kind` names the entries in error messages.
    #[must_use]
    pub const fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entries: BTreeMap::new(),
        }
    }

    /// Store `factory` under `name`.
    ///
    /// The factory runs on the first [`Registry::get`] for `name`. A factory
    /// error is reported as [`RegistryError::Construction`] and retried on
    /// the next lookup.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Duplicate`] when `name` is already taken.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> Result<(), RegistryError>
    where
        F: Fn() -> Result<Arc<T>, String> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.entries.contains_key(&name) {
            return Err(RegistryError::Duplicate {
                kind: self.kind,
                name,
            });
        }
        debug!("registered {} `{name}`", self.kind);
        self.entries.insert(
            name,
            Entry {
                factory: Box::new(factory),
                instance: OnceLock::new(),
            },
        );
        Ok(())
    }

    /// Register an already constructed instance.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Duplicate`] when `name` is already taken.
    pub fn register_instance(
        &mut self,
        name: impl Into<String>,
        instance: Arc<T>,
    ) -> Result<(), RegistryError>
    where
        T: Send + Sync + 'static,
    {
        self.register(name, move || Ok(Arc::clone(&instance)))
    }

    /// The shared instance registered under `name`, constructing it on first
    /// use.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] for unknown names and
    /// [`RegistryError::Construction`] when the factory fails.
    pub fn get(&self, name: &str) -> Result<Arc<T>, RegistryError> {
        let entry = self.entries.get(name).ok_or_else(|| RegistryError::NotFound {
            kind: self.kind,
            name: name.to_owned(),
        })?;
        if let Some(instance) = entry.instance.get() {
            return Ok(Arc::clone(instance));
        }
        debug!("constructing {} `{name}`", self.kind);
        let built = (entry.factory)().map_err(|message| RegistryError::Construction {
            kind: self.kind,
            name: name.to_owned(),
            message,
        })?;
        Ok(Arc::clone(entry.instance.get_or_init(|| built)))
    }

    /// Whether `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names in sorted order.
    #[must_use]
    pub fn list(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use rstest::rstest;

    use crate::test_support::StubSolver;

    fn stub() -> Arc<dyn Solver> {
        Arc::new(StubSolver::new("stub"))
    }

    #[rstest]
    fn duplicate_names_are_rejected() {
        let mut solvers = SolverRegistry::new("solver");
        solvers.register("stub", || Ok(stub())).expect("first registration");
        let err = solvers
            .register("stub", || Ok(stub()))
            .expect_err("second registration must fail");
        assert_eq!(
            err,
            RegistryError::Duplicate {
                kind: "solver",
                name: "stub".into()
            }
        );
    }

    #[rstest]
    fn factory_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut solvers = SolverRegistry::new("solver");
        solvers
            .register("stub", move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(stub())
            })
            .expect("registration");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        let first = solvers.get("stub").expect("constructed");
        let second = solvers.get("stub").expect("cached");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[rstest]
    fn failed_construction_is_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut solvers = SolverRegistry::new("solver");
        solvers
            .register("flaky", move || {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err("engine offline".to_owned())
                } else {
                    Ok(stub())
                }
            })
            .expect("registration");
        assert!(matches!(
            solvers.get("flaky"),
            Err(RegistryError::Construction { .. })
        ));
        assert!(solvers.get("flaky").is_ok());
    }

    #[rstest]
    fn list_is_sorted() {
        let mut solvers = SolverRegistry::new("solver");
        for name in ["vrp", "engine", "milp"] {
            solvers.register(name, || Ok(stub())).expect("registration");
        }
        assert_eq!(solvers.list(), vec!["engine", "milp", "vrp"]);
        assert!(solvers.contains("milp"));
    }

    #[rstest]
    fn concurrent_lookups_share_one_instance() {
        let mut solvers = SolverRegistry::new("solver");
        solvers.register("stub", || Ok(stub())).expect("registration");
        let solvers = Arc::new(solvers);
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&solvers);
                std::thread::spawn(move || registry.get("stub").expect("lookup"))
            })
            .collect();
        let instances: Vec<_> = handles
            .into_iter()
            .map(|handle| handle.join().expect("thread"))
            .collect();
        let cached = solvers.get("stub").expect("lookup");
        assert!(instances.iter().all(|instance| Arc::ptr_eq(instance, &cached)));
    }
}
