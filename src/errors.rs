use crate::core::ground::beam_shadow::ShadowInterval;
use crate::input::TrackingMode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BifacialGroundError {
    #[error("Request was considered invalid due to error: {0}")]
    InvalidRequest(#[from] anyhow::Error),
    #[error("Configuration rejected before simulation: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("Error identified during ground irradiance calculation: {0}")]
    FailureInCalculation(#[from] GroundGeometryError),
    #[error("Could not write outputs: {0}")]
    OutputFailure(anyhow::Error),
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum ConfigurationError {
    #[error("Bifacial ground modelling is not supported for tracking mode {0:?}")]
    UnsupportedTrackingMode(TrackingMode),
    #[error("Timestep {index} of a tracking system has no panel tilt, azimuth and clearance")]
    MissingTrackerOrientation { index: usize },
    #[error("Array geometry is invalid: {0}")]
    InvalidGeometry(String),
}

/// Raised when the wrapped shadow intervals of a row overlap, which can only
/// happen if the interval normalization itself is wrong.
#[derive(Clone, Debug, Error, PartialEq)]
#[error(
    "Shadow sub-intervals [{}, {}) and [{}, {}) overlap by {overlap} panel slope lengths",
    .leading.start, .leading.end, .wrapped.start, .wrapped.end
)]
pub struct GroundGeometryError {
    pub leading: ShadowInterval,
    pub wrapped: ShadowInterval,
    pub overlap: f64,
}
