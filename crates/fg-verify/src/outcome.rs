use fg_location::LocationError;
use fg_schemas::{PositionSample, Zone};
use serde::{Deserialize, Serialize};

/// Terminal status of one verification attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    /// Valid position inside an authorized zone.
    Verified,
    /// Valid position, outside every authorized zone. Not an error.
    Denied,
    /// No position could be obtained.
    Failed,
}

/// Result of one attempt. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationOutcome {
    pub status: VerificationStatus,
    pub matched_zone: Option<Zone>,
    pub sample: Option<PositionSample>,
    pub error_kind: Option<LocationError>,
}

impl VerificationOutcome {
    pub fn verified(zone: Zone, sample: PositionSample) -> Self {
        Self {
            status: VerificationStatus::Verified,
            matched_zone: Some(zone),
            sample: Some(sample),
            error_kind: None,
        }
    }

    pub fn denied(sample: PositionSample) -> Self {
        Self {
            status: VerificationStatus::Denied,
            matched_zone: None,
            sample: Some(sample),
            error_kind: None,
        }
    }

    pub fn failed(err: LocationError) -> Self {
        Self {
            status: VerificationStatus::Failed,
            matched_zone: None,
            sample: None,
            error_kind: Some(err),
        }
    }

    /// Combine a provider result with the first-match policy.
    pub fn from_acquisition(
        acquired: Result<PositionSample, LocationError>,
        zones: &[Zone],
    ) -> Self {
        match acquired {
            Ok(sample) => match fg_geo::match_zone(&sample, zones) {
                Some(zone) => Self::verified(zone.clone(), sample),
                None => Self::denied(sample),
            },
            Err(err) => Self::failed(err),
        }
    }
}
