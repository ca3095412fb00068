use crate::core::ground::geometry::RowGeometry;
use crate::errors::ConfigurationError;
use anyhow::anyhow;
use serde::Deserialize;
use serde_valid::Validate;
use std::io::{BufReader, Read};

pub fn ingest_for_processing(json: impl Read) -> Result<Input, anyhow::Error> {
    let reader = BufReader::new(json);

    let input: Input = serde_json::from_reader(reader)?;
    input
        .validate()
        .map_err(|errors| anyhow!("Input failed validation: {errors}"))?;

    Ok(input)
}

#[derive(Clone, Debug, Deserialize, PartialEq, Validate)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct Input {
    /// Number of equal segments each row to row span of ground is split into
    #[validate(minimum = 1)]
    pub ground_segments: usize,
    #[validate]
    pub array: ArrayInput,
    /// Whether to write sky view factor and shading outputs alongside the results
    #[serde(default)]
    pub diagnostics: bool,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Validate)]
#[serde(deny_unknown_fields)]
pub struct ArrayInput {
    pub tracking_mode: TrackingMode,
    pub bifacial: bool,
    /// Module tilt from horizontal, in degrees. Ignored for tracking systems,
    /// which give their tilt for every timestep.
    #[validate(minimum = 0.)]
    #[validate(maximum = 90.)]
    pub tilt: f64,
    /// Azimuth of the module normal, in degrees
    pub azimuth: f64,
    /// Row to row spacing, in m
    #[validate(exclusive_minimum = 0.)]
    pub pitch: f64,
    /// Height of the lower module edge above the ground, in m
    #[validate(minimum = 0.)]
    pub clearance: f64,
    /// Sloped length of a row of modules, in m
    #[validate(exclusive_minimum = 0.)]
    pub bandwidth: f64,
    /// Fraction of beam irradiance passing through a row of modules
    #[validate(minimum = 0.)]
    #[validate(maximum = 1.)]
    pub transmission_factor: f64,
}

impl ArrayInput {
    /// Row geometry in radians and panel slope lengths.
    pub fn row_geometry(&self) -> Result<RowGeometry, ConfigurationError> {
        RowGeometry::new(
            self.tilt.to_radians(),
            self.azimuth.to_radians(),
            self.pitch,
            self.clearance,
            self.bandwidth,
            self.transmission_factor,
        )
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum TrackingMode {
    FixedTilt,
    /// Horizontal single axis tracker
    SingleAxis,
    TiltedSingleAxis,
    AzimuthAxis,
    TwoAxis,
}

impl TrackingMode {
    /// Whether the ground beneath the array can be modelled as parallel rows
    /// repeating every pitch.
    pub fn supports_ground_model(&self) -> bool {
        matches!(self, TrackingMode::FixedTilt | TrackingMode::SingleAxis)
    }

    pub fn is_tracking(&self) -> bool {
        !matches!(self, TrackingMode::FixedTilt)
    }
}
