use crate::core::ground::beam_shadow::{beam_shadow, ShadeFlags};
use crate::core::ground::geometry::RowGeometry;
use crate::core::ground::irradiance::{ground_irradiance, GroundIrradiance, HorizontalIrradiance};
use crate::core::ground::sky_view::{sky_view_factors, SkyViewFactors};
use crate::core::solar_geometry::SunPosition;
use crate::errors::{BifacialGroundError, ConfigurationError};
use crate::input::TrackingMode;
use chrono::NaiveDateTime;
use rayon::prelude::*;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Below this many segments the binary midpoint shading test resolves shadow
/// edges only coarsely.
const COARSE_SEGMENT_COUNT: usize = 10;

/// Module orientation a tracker holds for one timestep.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackerOrientation {
    /// radians, may be negative when the tracker has rotated past horizontal
    pub tilt: f64,
    /// radians
    pub azimuth: f64,
    /// metres
    pub clearance: f64,
}

/// Everything the ground model needs to know about one timestep.
#[derive(Clone, Debug, PartialEq)]
pub struct TimestepConditions {
    pub timestamp: NaiveDateTime,
    pub sun: SunPosition,
    pub irradiance: HorizontalIrradiance,
    /// Only present, and then required, for tracking systems
    pub orientation: Option<TrackerOrientation>,
}

/// Ground segment results for one timestep.
#[derive(Clone, Debug, PartialEq)]
pub struct GroundSegmentSet {
    pub shade_flags: ShadeFlags,
    pub sky_view_factors: Arc<SkyViewFactors>,
    pub irradiance: GroundIrradiance,
}

#[derive(Clone, Debug)]
enum SkyViewSource {
    /// Rows never move, so the sky view is calculated once up front.
    Fixed(Arc<SkyViewFactors>),
    /// Rows move with the tracker and the sky view follows them every timestep.
    PerTimestep,
}

/// Runs the ground irradiance calculation for each timestep, recalculating the
/// sky view factors only where the row geometry changes.
#[derive(Clone, Debug)]
pub struct GroundModel {
    segment_count: usize,
    geometry: RowGeometry,
    sky_view: SkyViewSource,
}

impl GroundModel {
    /// Arguments:
    /// * `tracking_mode` - how the modules move over the run
    /// * `geometry` - row geometry at configuration time; for tracking systems this
    ///                supplies pitch, bandwidth and transmission factor only
    /// * `segment_count` - number of equal segments the row to row span is split into
    pub fn new(
        tracking_mode: TrackingMode,
        geometry: RowGeometry,
        segment_count: usize,
    ) -> Result<Self, ConfigurationError> {
        if !tracking_mode.supports_ground_model() {
            return Err(ConfigurationError::UnsupportedTrackingMode(tracking_mode));
        }
        if segment_count == 0 {
            return Err(ConfigurationError::InvalidGeometry(
                "ground segment count must be at least 1".to_string(),
            ));
        }
        if segment_count < COARSE_SEGMENT_COUNT {
            warn!(
                segment_count,
                "few ground segments, shading is resolved per segment midpoint only"
            );
        }

        let sky_view = if tracking_mode.is_tracking() {
            SkyViewSource::PerTimestep
        } else {
            SkyViewSource::Fixed(Arc::new(sky_view_factors(&geometry, segment_count)))
        };

        info!(
            ?tracking_mode,
            segment_count,
            pitch = geometry.pitch(),
            clearance = geometry.clearance(),
            "ground model configured"
        );

        Ok(Self {
            segment_count,
            geometry,
            sky_view,
        })
    }

    /// Sky view factors shared by every timestep, if the rows are fixed.
    pub fn fixed_sky_view_factors(&self) -> Option<&Arc<SkyViewFactors>> {
        match &self.sky_view {
            SkyViewSource::Fixed(factors) => Some(factors),
            SkyViewSource::PerTimestep => None,
        }
    }

    /// Ground irradiance for one timestep.
    ///
    /// Arguments:
    /// * `index` - position of the timestep in the series, for error reporting
    /// * `conditions` - sun position, irradiance and tracker orientation for the timestep
    pub fn timestep(
        &self,
        index: usize,
        conditions: &TimestepConditions,
    ) -> Result<GroundSegmentSet, BifacialGroundError> {
        let (geometry, sky_view_factors) = match &self.sky_view {
            SkyViewSource::Fixed(factors) => (self.geometry, factors.clone()),
            SkyViewSource::PerTimestep => {
                let TrackerOrientation {
                    tilt,
                    azimuth,
                    clearance,
                } = conditions
                    .orientation
                    .ok_or(ConfigurationError::MissingTrackerOrientation { index })?;
                let geometry = self
                    .geometry
                    .oriented(tilt, azimuth, clearance)
                    .map_err(|error| match error {
                        ConfigurationError::InvalidGeometry(reason) => {
                            ConfigurationError::InvalidGeometry(format!("timestep {index}: {reason}"))
                        }
                        error => error,
                    })?;
                debug!(
                    index,
                    tilt = geometry.tilt(),
                    azimuth = geometry.azimuth(),
                    "recalculating sky view factors for tracker orientation"
                );
                (
                    geometry,
                    Arc::new(sky_view_factors(&geometry, self.segment_count)),
                )
            }
        };

        let shade_flags = beam_shadow(&geometry, conditions.sun, self.segment_count)?;
        let irradiance = ground_irradiance(
            conditions.irradiance,
            &sky_view_factors,
            &shade_flags,
            geometry.transmission_factor(),
        );

        Ok(GroundSegmentSet {
            shade_flags,
            sky_view_factors,
            irradiance,
        })
    }

    /// Ground irradiance for a whole series of timesteps, in series order.
    /// Timesteps are independent of one another so are run in parallel. If any
    /// fail, the error of the earliest failing timestep is returned.
    pub fn run_timesteps(
        &self,
        conditions: &[TimestepConditions],
    ) -> Result<Vec<GroundSegmentSet>, BifacialGroundError> {
        info!(timesteps = conditions.len(), "running ground model");

        let results = conditions
            .par_iter()
            .enumerate()
            .map(|(index, conditions)| self.timestep(index, conditions))
            .collect::<Vec<_>>()
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?;

        info!("ground model complete");

        Ok(results)
    }
}
