use chrono::Utc;
use fg_schemas::{Coordinate, PositionSample};

use crate::{LocationError, PositionSource};

/// Always reports the same coordinate, stamped with the current time.
///
/// Used by the CLI `check` command and demos where the position is given
/// on the command line.
#[derive(Debug, Clone)]
pub struct FixedSource {
    coordinate: Coordinate,
    accuracy_meters: f64,
}

impl FixedSource {
    pub fn new(coordinate: Coordinate, accuracy_meters: f64) -> Self {
        Self {
            coordinate,
            accuracy_meters,
        }
    }
}

#[async_trait::async_trait]
impl PositionSource for FixedSource {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn read(&self, _high_accuracy: bool) -> Result<PositionSample, LocationError> {
        Ok(PositionSample::new(
            self.coordinate,
            self.accuracy_meters,
            Utc::now(),
        ))
    }
}

/// A platform with no location capability.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedSource;

#[async_trait::async_trait]
impl PositionSource for UnsupportedSource {
    fn name(&self) -> &'static str {
        "unsupported"
    }

    async fn read(&self, _high_accuracy: bool) -> Result<PositionSample, LocationError> {
        Err(LocationError::Unsupported)
    }
}
