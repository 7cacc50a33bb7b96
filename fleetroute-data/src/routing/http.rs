//! Blocking bridge over the async `reqwest` client.
//!
//! The provider traits in `fleetroute-core` are synchronous so that solvers
//! and adapters stay embeddable in plain threads. [`BlockingClient`] owns a
//! `current_thread` Tokio runtime and blocks on it for each request.
//!
//! # Runtime behaviour
//!
//! Outside any Tokio runtime the stored runtime drives the request. Inside a
//! multi-threaded runtime (detected via [`Handle::try_current`]) the caller's
//! handle is used under [`tokio::task::block_in_place`] so that no nested
//! runtime is started. Inside a `current_thread` runtime the stored runtime
//! is used, which blocks the caller's executor for the duration of the call.

use std::time::Duration;

use fleetroute_core::UpstreamCause;
use log::debug;
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tokio::runtime::{Handle, Runtime, RuntimeFlavor};

/// Default user agent for provider requests.
pub const DEFAULT_USER_AGENT: &str = "fleetroute/0.1";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const EXCERPT_CHARS: usize = 200;

/// Failure to construct a network-backed provider.
#[derive(Debug, Error)]
pub enum ProviderBuildError {
    /// The configured base URL does not parse.
    #[error("invalid base URL `{url}`: {source}")]
    InvalidUrl {
        /// The rejected URL.
        url: String,
        /// Parser error.
        #[source]
        source: url::ParseError,
    },
    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
    /// The Tokio runtime could not be built.
    #[error("failed to build Tokio runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

/// Check that `base_url` parses and strip any trailing slash.
///
/// # Errors
///
/// Returns [`ProviderBuildError::InvalidUrl`] when the URL does not parse.
pub fn normalise_base_url(base_url: &str) -> Result<String, ProviderBuildError> {
    url::Url::parse(base_url).map_err(|source| ProviderBuildError::InvalidUrl {
        url: base_url.to_owned(),
        source,
    })?;
    Ok(base_url.trim_end_matches('/').to_owned())
}

/// JSON-over-HTTP client with a synchronous interface.
///
/// Every request is bounded by the configured timeout, which covers both
/// connecting and reading the response. Failures are reported as
/// [`UpstreamCause`] values that name the request URL.
pub struct BlockingClient {
    client: Client,
    timeout: Duration,
    runtime: Runtime,
}

impl std::fmt::Debug for BlockingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockingClient")
            .field("client", &self.client)
            .field("timeout", &self.timeout)
            .field("runtime", &"<tokio::runtime::Runtime>")
            .finish()
    }
}

impl BlockingClient {
    /// Build a client with the given per-request `timeout` and `user_agent`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client or Tokio runtime fails to build.
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, ProviderBuildError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(ProviderBuildError::HttpClient)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(ProviderBuildError::Runtime)?;
        Ok(Self {
            client,
            timeout,
            runtime,
        })
    }

    /// Per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// `GET` `url` and decode the JSON body.
    ///
    /// # Errors
    ///
    /// Returns the [`UpstreamCause`] describing the transport, status or
    /// decoding failure.
    pub fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, UpstreamCause> {
        debug!("GET {url}");
        self.block_on(self.fetch(self.client.get(url), url))
    }

    /// `POST` `body` as JSON to `url` and decode the JSON reply.
    ///
    /// # Errors
    ///
    /// Returns the [`UpstreamCause`] describing the transport, status or
    /// decoding failure.
    pub fn post_json<B, T>(&self, url: &str, body: &B) -> Result<T, UpstreamCause>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!("POST {url}");
        self.block_on(self.fetch(self.client.post(url).json(body), url))
    }

    /// `GET` `url` and succeed on any 2xx status, ignoring the body.
    ///
    /// # Errors
    ///
    /// Returns the [`UpstreamCause`] describing the transport failure or the
    /// unexpected status.
    pub fn probe(&self, url: &str) -> Result<(), UpstreamCause> {
        debug!("probing {url}");
        self.block_on(async {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|err| self.convert_reqwest_error(&err, url))?;
            let status = response.status();
            if status.is_success() {
                return Ok(());
            }
            let body = response.text().await.unwrap_or_default();
            Err(UpstreamCause::Http {
                url: url.to_owned(),
                status: status.as_u16(),
                message: excerpt(&body),
            })
        })
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        url: &str,
    ) -> Result<T, UpstreamCause> {
        let response = request
            .send()
            .await
            .map_err(|err| self.convert_reqwest_error(&err, url))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| self.convert_reqwest_error(&err, url))?;
        if !status.is_success() {
            return Err(service_fault(&body).unwrap_or_else(|| UpstreamCause::Http {
                url: url.to_owned(),
                status: status.as_u16(),
                message: excerpt(&body),
            }));
        }
        serde_json::from_str(&body).map_err(|err| UpstreamCause::Parse {
            message: err.to_string(),
        })
    }

    fn convert_reqwest_error(&self, error: &reqwest::Error, url: &str) -> UpstreamCause {
        if error.is_timeout() {
            return UpstreamCause::Timeout {
                url: url.to_owned(),
                timeout_secs: self.timeout.as_secs(),
            };
        }
        if let Some(status) = error.status() {
            return UpstreamCause::Http {
                url: url.to_owned(),
                status: status.as_u16(),
                message: error.to_string(),
            };
        }
        if error.is_decode() {
            return UpstreamCause::Parse {
                message: error.to_string(),
            };
        }
        UpstreamCause::Network {
            url: url.to_owned(),
            message: error.to_string(),
        }
    }

    fn block_on<F: Future>(&self, future: F) -> F::Output {
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| handle.block_on(future))
            }
            _ => self.runtime.block_on(future),
        }
    }
}

/// Interpret an error body carrying a provider code.
///
/// OSRM answers `{"code": "NoRoute", "message": ".."}`; VROOM-style engines
/// answer `{"code": 2, "error": ".."}`.
fn service_fault(body: &str) -> Option<UpstreamCause> {
    let value: Value = serde_json::from_str(body).ok()?;
    let code = match value.get("code")? {
        Value::String(code) => code.clone(),
        other => other.to_string(),
    };
    let message = value
        .get("message")
        .or_else(|| value.get("error"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();
    Some(UpstreamCause::Service { code, message })
}

fn excerpt(body: &str) -> String {
    body.chars().take(EXCERPT_CHARS).collect()
}
