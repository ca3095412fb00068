use crate::core::ground::ground_model::{GroundModel, GroundSegmentSet, TimestepConditions};
use crate::core::ground::sky_view::SkyViewFactors;
use crate::errors::BifacialGroundError;
use crate::input::Input;
use chrono::NaiveDateTime;
use std::sync::Arc;
use tracing::info;

/// Results of a whole run, one entry per timestep.
#[derive(Clone, Debug, PartialEq)]
pub struct RunResults {
    pub timestamps: Vec<NaiveDateTime>,
    /// Absent when the array is not bifacial
    pub ground: Option<Vec<GroundSegmentSet>>,
    /// Present when the rows are fixed, so one set of factors serves the whole run
    pub fixed_sky_view_factors: Option<Arc<SkyViewFactors>>,
    pub segment_count: usize,
}

#[derive(Debug)]
pub struct Simulation {
    ground_model: Option<GroundModel>,
    conditions: Vec<TimestepConditions>,
    segment_count: usize,
}

impl Simulation {
    /// Checks the configuration and prepares everything that does not change
    /// between timesteps. Fails before any timestep runs if the array cannot be
    /// modelled.
    pub fn from_inputs(
        input: &Input,
        conditions: Vec<TimestepConditions>,
    ) -> Result<Self, BifacialGroundError> {
        let ground_model = if input.array.bifacial {
            let geometry = input.array.row_geometry()?;
            Some(GroundModel::new(
                input.array.tracking_mode,
                geometry,
                input.ground_segments,
            )?)
        } else {
            info!("array is not bifacial, ground irradiance will not be modelled");
            None
        };

        Ok(Self {
            ground_model,
            conditions,
            segment_count: input.ground_segments,
        })
    }

    pub fn run(&self) -> Result<RunResults, BifacialGroundError> {
        let ground = self
            .ground_model
            .as_ref()
            .map(|model| model.run_timesteps(&self.conditions))
            .transpose()?;

        Ok(RunResults {
            timestamps: self
                .conditions
                .iter()
                .map(|conditions| conditions.timestamp)
                .collect(),
            ground,
            fixed_sky_view_factors: self
                .ground_model
                .as_ref()
                .and_then(|model| model.fixed_sky_view_factors().cloned()),
            segment_count: self.segment_count,
        })
    }
}
