//! Network-backed routing providers for the fleetroute engine.
//!
//! Responsibilities:
//! - Fetch distance and duration matrices from an OSRM Table service.
//! - Snap route legs to the road network through the OSRM Route service.
//! - Bridge the synchronous provider traits of `fleetroute-core` onto the
//!   async `reqwest` client.
//!
//! Boundaries:
//! - Do not encode routing rules (they live in `fleetroute-core`).
//! - Every network call is bounded by a timeout.
//!
//! Invariants:
//! - Unreachable pairs are reported as errors, never fabricated.
//! - No global mutable state.

#![forbid(unsafe_code)]

pub mod routing;

pub use routing::{
    BlockingClient, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT, HttpMatrixAdapter,
    HttpMatrixAdapterConfig, OSRM_ADAPTER, OsrmSnapper, ProviderBuildError, normalise_base_url,
};
