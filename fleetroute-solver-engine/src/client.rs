//! HTTP client for a VROOM-compatible engine and its probed capability.

use std::time::Duration;

use fleetroute_core::{MatrixResult, SolveError, SolveRequest, UpstreamCause};
use fleetroute_data::{
    BlockingClient, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT, ProviderBuildError,
    normalise_base_url,
};
use log::{debug, info, warn};

use crate::solver::ENGINE_SOLVER;
use crate::vroom::{Mode, Problem, Solution};

/// Where the engine lives and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Base URL of the engine, e.g. `http://localhost:3000`. Without one the
    /// engine is never probed and the fallback always runs.
    pub base_url: Option<String>,
    /// Timeout for the health probe and each solve call.
    pub timeout: Duration,
    /// User agent sent with every request.
    pub user_agent: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

impl EngineConfig {
    /// Configuration for the engine at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: Some(base_url.into()),
            ..Self::default()
        }
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Connection to a reachable engine.
#[derive(Debug)]
pub struct EngineClient {
    client: BlockingClient,
    base_url: String,
}

impl EngineClient {
    /// Build a client for `base_url` without contacting it.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the HTTP client or Tokio
    /// runtime fails to build.
    pub fn new(base_url: &str, config: &EngineConfig) -> Result<Self, ProviderBuildError> {
        Ok(Self {
            client: BlockingClient::new(config.timeout, &config.user_agent)?,
            base_url: normalise_base_url(base_url)?,
        })
    }

    /// Normalised base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Ask the engine's `/health` endpoint whether it is serving.
    ///
    /// # Errors
    ///
    /// Returns the transport failure or unexpected status.
    pub fn health(&self) -> Result<(), UpstreamCause> {
        self.client.probe(&format!("{}/health", self.base_url))
    }

    fn post(&self, problem: &Problem) -> Result<Solution, UpstreamCause> {
        let solution: Solution = self.client.post_json(&format!("{}/", self.base_url), problem)?;
        if solution.code != 0 {
            return Err(UpstreamCause::Service {
                code: solution.code.to_string(),
                message: solution.error.unwrap_or_default(),
            });
        }
        Ok(solution)
    }

    /// Solve `request` on the engine, returning `(vehicle_id, nodes)` tours.
    ///
    /// # Errors
    ///
    /// Returns [`SolveError::Upstream`] when the call fails or the answer
    /// cannot be mapped back onto the request.
    pub(crate) fn solve(
        &self,
        request: &SolveRequest,
        matrix: &MatrixResult,
    ) -> Result<Vec<(String, Vec<usize>)>, SolveError> {
        let mode = Mode::for_request(request);
        debug!("engine solve in {mode:?} mode at {}", self.base_url);
        let problem = Problem::build(request, matrix, mode);
        self.post(&problem)
            .map_err(|cause| SolveError::upstream(ENGINE_SOLVER, cause.to_string()))?
            .into_assignment(request)
    }
}

/// Whether an engine answered the start-up probe.
///
/// Probed once when the solver is built and never re-checked, so every
/// solve is a plain branch on this value.
#[derive(Debug)]
pub enum EngineCapability {
    /// The engine answered its health check.
    Available(EngineClient),
    /// No engine is configured or it did not answer.
    Unavailable,
}

impl EngineCapability {
    /// Probe the engine described by `config`.
    ///
    /// Never fails: a missing URL, a client that cannot be built or a failed
    /// health check all yield [`EngineCapability::Unavailable`].
    #[must_use]
    pub fn probe(config: &EngineConfig) -> Self {
        let Some(base_url) = config.base_url.as_deref() else {
            debug!("no engine configured; using the nearest-neighbour fallback");
            return Self::Unavailable;
        };
        let client = match EngineClient::new(base_url, config) {
            Ok(client) => client,
            Err(err) => {
                warn!("engine client for {base_url} could not be built: {err}");
                return Self::Unavailable;
            }
        };
        match client.health() {
            Ok(()) => {
                info!("engine at {} is available", client.base_url());
                Self::Available(client)
            }
            Err(cause) => {
                warn!("engine at {base_url} is unavailable: {cause}");
                Self::Unavailable
            }
        }
    }

    /// Whether solves are sent to the engine.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetroute_data::routing::test_support::{CannedResponse, CannedServer, unused_base_url};
    use rstest::rstest;

    fn config(base_url: &str) -> EngineConfig {
        EngineConfig::new(base_url).with_timeout(Duration::from_millis(500))
    }

    #[rstest]
    fn missing_url_is_unavailable() {
        assert!(!EngineCapability::probe(&EngineConfig::default()).is_available());
    }

    #[rstest]
    fn invalid_url_is_unavailable() {
        assert!(!EngineCapability::probe(&config("not a url")).is_available());
    }

    #[rstest]
    fn unreachable_engine_is_unavailable() {
        assert!(!EngineCapability::probe(&config(&unused_base_url())).is_available());
    }

    #[rstest]
    fn unhealthy_engine_is_unavailable() {
        let server = CannedServer::start(vec![CannedResponse::text(503, "warming up")])
            .expect("server should start");
        assert!(!EngineCapability::probe(&config(server.base_url())).is_available());
    }

    #[rstest]
    fn healthy_engine_is_available() {
        let server = CannedServer::start(vec![CannedResponse::text(200, "ok")])
            .expect("server should start");
        let capability = EngineCapability::probe(&config(&format!("{}/", server.base_url())));
        let EngineCapability::Available(client) = capability else {
            panic!("engine should be available");
        };
        assert_eq!(client.base_url(), server.base_url());
        let requests = server.requests();
        assert_eq!(requests.first().map(|r| r.target()), Some("/health"));
    }

    #[rstest]
    fn non_zero_code_is_a_service_error() {
        let server = CannedServer::start(vec![CannedResponse::json(
            200,
            r#"{"code":3,"error":"Unfound route(s) from location [0,0]"}"#,
        )])
        .expect("server should start");
        let client = EngineClient::new(server.base_url(), &config(server.base_url()))
            .expect("client should build");
        let request = SolveRequest::with_matrix(
            ENGINE_SOLVER,
            fleetroute_core::test_support::scenario_matrix(),
            fleetroute_core::test_support::single_vehicle(9),
        );
        let matrix = request.distance_matrix().expect("matrix present");
        let err = client.solve(&request, &matrix).expect_err("engine refused");
        assert!(err.to_string().contains("Unfound route"), "{err}");
    }
}
