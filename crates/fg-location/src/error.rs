use std::fmt;

use serde::{Deserialize, Serialize};

/// Every way a position acquisition can fail.
///
/// All variants are terminal for the attempt that produced them: nothing in
/// this workspace retries automatically. Permission and capability failures
/// need the user to change device settings first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationError {
    /// The user or platform refused location access.
    PermissionDenied,
    /// The device could not produce a fix (no signal, provider off).
    PositionUnavailable,
    /// No fix arrived within `AcquireOptions::timeout`.
    Timeout,
    /// This platform has no location capability at all.
    Unsupported,
}

impl LocationError {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationError::PermissionDenied => "permission_denied",
            LocationError::PositionUnavailable => "position_unavailable",
            LocationError::Timeout => "timeout",
            LocationError::Unsupported => "unsupported",
        }
    }

    /// Text shown to the person holding the device.
    pub fn user_message(&self) -> &'static str {
        match self {
            LocationError::PermissionDenied => {
                "Location access denied. Please enable location services."
            }
            LocationError::PositionUnavailable => "Location information unavailable.",
            LocationError::Timeout => "Location request timed out.",
            LocationError::Unsupported => "Geolocation is not supported on this device.",
        }
    }

    /// `true` when only a change to device settings can fix this.
    pub fn needs_device_settings(&self) -> bool {
        matches!(
            self,
            LocationError::PermissionDenied | LocationError::Unsupported
        )
    }
}

impl fmt::Display for LocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "location error: {}", self.as_str())
    }
}

impl std::error::Error for LocationError {}
