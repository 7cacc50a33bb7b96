//! OSRM-backed matrix adapter and segment snapper.
//!
//! [`HttpMatrixAdapter`] implements [`fleetroute_core::MatrixAdapter`] over
//! the OSRM Table API and [`OsrmSnapper`] implements
//! [`fleetroute_core::SegmentSnapper`] over the Route API. Both share a
//! [`BlockingClient`], which blocks on async HTTP calls so the synchronous
//! traits stay usable outside an async context.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use fleetroute_core::MatrixAdapter;
//! use fleetroute_data::routing::{HttpMatrixAdapter, HttpMatrixAdapterConfig};
//! use geo::Coord;
//!
//! let config = HttpMatrixAdapterConfig::new("http://localhost:5000")
//!     .with_timeout(Duration::from_secs(10))
//!     .with_user_agent("dispatch-board/1.0");
//! let adapter = HttpMatrixAdapter::with_config(config)?;
//!
//! let stops = [Coord { x: -0.1, y: 51.5 }, Coord { x: -0.2, y: 51.6 }];
//! let matrix = adapter.matrix(&stops, &stops, "driving")?;
//! assert_eq!(matrix.rows(), 2);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod http;
mod osrm;
mod snapper;
mod table;

#[cfg(any(test, feature = "test-support"))]
#[doc(hidden)]
pub mod test_support;

pub use http::{
    BlockingClient, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT, ProviderBuildError,
    normalise_base_url,
};
pub use snapper::OsrmSnapper;
pub use table::{HttpMatrixAdapter, HttpMatrixAdapterConfig, OSRM_ADAPTER};
