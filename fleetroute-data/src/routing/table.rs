//! Distance-matrix adapter over the OSRM Table API.

use std::time::Duration;

use fleetroute_core::matrix::validate_coordinates;
use fleetroute_core::{Coordinate, MatrixAdapter, MatrixError, MatrixResult, UpstreamCause};
use log::debug;

use super::http::{
    BlockingClient, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT, ProviderBuildError,
    normalise_base_url,
};
use super::osrm::{TableResponse, coordinate_list};

/// Registry name of [`HttpMatrixAdapter`].
pub const OSRM_ADAPTER: &str = "osrm";

/// OSRM profile used when the caller passes an empty mode.
pub(crate) const DEFAULT_PROFILE: &str = "driving";

/// Configuration shared by the OSRM adapter and snapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpMatrixAdapterConfig {
    /// Base URL of the OSRM service (e.g., `"http://localhost:5000"`).
    pub base_url: String,
    /// Timeout applied to every request.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
}

impl Default for HttpMatrixAdapterConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_owned(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

impl HttpMatrixAdapterConfig {
    /// Configuration for the service at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub(crate) fn client(&self) -> Result<(BlockingClient, String), ProviderBuildError> {
        let base_url = normalise_base_url(&self.base_url)?;
        let client = BlockingClient::new(self.timeout, &self.user_agent)?;
        Ok((client, base_url))
    }
}

/// Matrix adapter backed by an OSRM Table service.
///
/// Origins and destinations are sent in one request, selected through the
/// `sources` and `destinations` parameters. When both lists are identical
/// the coordinates are sent once and echoed on the result. Any unreachable
/// pair fails the whole call with an upstream parse error.
#[derive(Debug)]
pub struct HttpMatrixAdapter {
    client: BlockingClient,
    base_url: String,
}

impl HttpMatrixAdapter {
    /// Adapter for the service at `base_url` with default settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the HTTP client or Tokio
    /// runtime fails to build.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ProviderBuildError> {
        Self::with_config(HttpMatrixAdapterConfig::new(base_url))
    }

    /// Adapter with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the HTTP client or Tokio
    /// runtime fails to build.
    pub fn with_config(config: HttpMatrixAdapterConfig) -> Result<Self, ProviderBuildError> {
        let (client, base_url) = config.client()?;
        Ok(Self { client, base_url })
    }

    /// Build the Table API URL.
    ///
    /// The format is
    /// `{base_url}/table/v1/{mode}/{coords}?annotations=distance,duration&sources=..&destinations=..`.
    fn table_url(&self, origins: &[Coordinate], destinations: &[Coordinate], mode: &str) -> String {
        let profile = if mode.is_empty() { DEFAULT_PROFILE } else { mode };
        let shared = origins == destinations;
        let mut coords = origins.to_vec();
        if !shared {
            coords.extend_from_slice(destinations);
        }
        let offset = if shared { 0 } else { origins.len() };
        format!(
            "{}/table/v1/{profile}/{}?annotations=distance,duration&sources={}&destinations={}",
            self.base_url,
            coordinate_list(&coords),
            index_list(0, origins.len()),
            index_list(offset, destinations.len()),
        )
    }
}

fn index_list(start: usize, count: usize) -> String {
    (start..start + count)
        .map(|index| index.to_string())
        .collect::<Vec<_>>()
        .join(";")
}

/// Turn a sparse OSRM grid into a dense `rows x columns` matrix.
fn dense(
    grid: Vec<Vec<Option<f64>>>,
    rows: usize,
    columns: usize,
    what: &str,
) -> Result<Vec<Vec<f64>>, UpstreamCause> {
    if grid.len() != rows {
        return Err(UpstreamCause::Parse {
            message: format!("expected {rows} {what} rows, got {}", grid.len()),
        });
    }
    grid.into_iter()
        .enumerate()
        .map(|(origin, row)| {
            if row.len() != columns {
                return Err(UpstreamCause::Parse {
                    message: format!(
                        "expected {columns} {what} columns in row {origin}, got {}",
                        row.len()
                    ),
                });
            }
            row.into_iter()
                .enumerate()
                .map(|(destination, cell)| {
                    cell.filter(|value| value.is_finite() && *value >= 0.0)
                        .ok_or_else(|| UpstreamCause::Parse {
                            message: format!(
                                "no {what} from origin {origin} to destination {destination}"
                            ),
                        })
                })
                .collect()
        })
        .collect()
}

/// Convert an OSRM Table response into a validated matrix.
fn convert_response(
    response: TableResponse,
    rows: usize,
    columns: usize,
) -> Result<MatrixResult, UpstreamCause> {
    if !response.is_ok() {
        return Err(UpstreamCause::Service {
            code: response.code,
            message: response.message.unwrap_or_default(),
        });
    }
    let distances = response.distances.ok_or_else(|| UpstreamCause::Parse {
        message: "OSRM response missing distances array".to_owned(),
    })?;
    let distances = dense(distances, rows, columns, "distance")?;
    let durations = response
        .durations
        .map(|grid| dense(grid, rows, columns, "duration"))
        .transpose()?;
    MatrixResult::new(distances, durations).map_err(|err| UpstreamCause::Parse {
        message: err.to_string(),
    })
}

impl MatrixAdapter for HttpMatrixAdapter {
    fn name(&self) -> &str {
        OSRM_ADAPTER
    }

    fn matrix(
        &self,
        origins: &[Coordinate],
        destinations: &[Coordinate],
        mode: &str,
    ) -> Result<MatrixResult, MatrixError> {
        validate_coordinates(origins)?;
        validate_coordinates(destinations)?;
        let url = self.table_url(origins, destinations, mode);
        debug!(
            "requesting {}x{} OSRM table",
            origins.len(),
            destinations.len()
        );
        let response: TableResponse = self
            .client
            .get_json(&url)
            .map_err(|cause| MatrixError::upstream(OSRM_ADAPTER, cause))?;
        let matrix = convert_response(response, origins.len(), destinations.len())
            .map_err(|cause| MatrixError::upstream(OSRM_ADAPTER, cause))?;
        if origins == destinations {
            return Ok(matrix.with_coordinates(origins.to_vec())?);
        }
        Ok(matrix)
    }
}
