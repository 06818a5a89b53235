//! fg-testkit
//!
//! Fakes and fixtures shared by the scenario tests.
//!
//! - [`ScriptedSource`]: replays a fixed script of fixes / errors / hangs.
//! - [`GatedSource`] + [`ReadController`]: every read parks until the test
//!   resolves it explicitly, for ordering and supersede scenarios.
//! - `fixtures`: the three family-home zones and a field worker assigned
//!   to them.
//!
//! MUST NOT be a production dependency of any crate.

pub mod fixtures;
mod gated;
mod scripted;

pub use gated::{GatedSource, PendingRead, ReadController};
pub use scripted::{ScriptStep, ScriptedSource};

use std::sync::Arc;

use fg_location::{BoundedProvider, LocationProvider, PositionSource};

/// Wrap a source in a [`BoundedProvider`] behind a trait object.
pub fn provider_for<S: PositionSource + 'static>(source: S) -> Arc<dyn LocationProvider> {
    Arc::new(BoundedProvider::new(source))
}
