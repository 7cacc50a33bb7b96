//! Distance matrices and the adapters that produce them.
//!
//! A [`MatrixAdapter`] turns origin and destination coordinates into a
//! [`MatrixResult`]. Adapters are looked up by name through an
//! [`crate::AdapterRegistry`]; the offline [`HaversineAdapter`] is always
//! available and never fails on valid input.

mod adapter;
mod error;
mod haversine;
mod result;

pub use adapter::{MatrixAdapter, validate_coordinates};
pub use error::{MatrixError, UpstreamCause};
pub use haversine::{HAVERSINE_ADAPTER, HaversineAdapter, haversine_matrix};
pub use result::MatrixResult;
