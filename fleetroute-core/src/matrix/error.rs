use thiserror::Error;

use crate::ValidationError;

/// Errors from [`crate::MatrixAdapter::matrix`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MatrixError {
    /// The caller supplied malformed coordinates; no provider was contacted.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The provider was unreachable or rejected the request.
    #[error("matrix adapter `{adapter}` failed")]
    Upstream {
        /// Name of the adapter that failed.
        adapter: String,
        /// What went wrong at the provider.
        #[source]
        cause: UpstreamCause,
    },
}

impl MatrixError {
    /// Wrap `cause` as an upstream failure of `adapter`.
    #[must_use]
    pub fn upstream(adapter: impl Into<String>, cause: UpstreamCause) -> Self {
        Self::Upstream {
            adapter: adapter.into(),
            cause,
        }
    }
}

/// Why a call to a routing provider failed.
///
/// Shared by matrix adapters, path snappers and the external engine client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpstreamCause {
    /// The request exceeded its timeout.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout {
        /// Request URL.
        url: String,
        /// Timeout that elapsed, in seconds.
        timeout_secs: u64,
    },
    /// The provider answered with a non-success status code.
    #[error("HTTP {status} from {url}: {message}")]
    Http {
        /// Request URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Body excerpt or reason phrase.
        message: String,
    },
    /// The connection could not be established or was dropped.
    #[error("network error contacting {url}: {message}")]
    Network {
        /// Request URL.
        url: String,
        /// Transport error description.
        message: String,
    },
    /// The response body could not be interpreted.
    #[error("failed to parse provider response: {message}")]
    Parse {
        /// Parser error description.
        message: String,
    },
    /// The provider reported an application-level error code.
    #[error("provider returned {code}: {message}")]
    Service {
        /// Provider error code, e.g. `NoRoute`.
        code: String,
        /// Provider error message.
        message: String,
    },
}
