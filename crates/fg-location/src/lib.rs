//! fg-location
//!
//! Location provider boundary.
//!
//! This crate owns the provider traits, the closed error taxonomy, and the
//! timeout/cache wrapper that turns any raw [`PositionSource`] into a
//! well-behaved [`LocationProvider`]. It knows nothing about zones or
//! sessions.
//!
//! # Layering
//!
//! - [`PositionSource`]: one raw device read. May hang; may be slow.
//! - [`BoundedProvider`]: owns the timeout and the cached-fix policy, and
//!   is the only thing the verification session talks to.

mod error;
mod options;
mod provider;
mod source;

pub use error::LocationError;
pub use options::AcquireOptions;
pub use provider::{BoundedProvider, LocationProvider, PositionSource};
pub use source::{FixedSource, UnsupportedSource};
