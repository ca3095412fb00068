use crate::errors::ConfigurationError;
use std::f64::consts::{FRAC_PI_2, PI, TAU};
use strum::{EnumIter, IntoEnumIterator};

/// Row geometry of a bifacial array, with lengths held in panel slope lengths
/// (the array bandwidth is 1).
///
/// Rows repeat every `pitch` along the ground. Row `k` has its lower (front) edge
/// at `(k * pitch, clearance)` and its upper (back) edge at
/// `(k * pitch + cos(tilt), clearance + sin(tilt))`, so the modules face -x.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RowGeometry {
    tilt: f64,
    azimuth: f64,
    pitch: f64,
    clearance: f64,
    bandwidth: f64,
    transmission_factor: f64,
}

impl RowGeometry {
    /// Construct a RowGeometry from array dimensions
    ///
    /// Arguments:
    /// * `tilt` - module tilt from horizontal, in radians, 0 to pi/2
    /// * `azimuth` - azimuth of the horizontal projection of the module normal, in radians
    /// * `pitch` - row to row spacing, in m
    /// * `clearance` - height of the lower module edge above the ground, in m
    /// * `bandwidth` - sloped length of a row of modules, in m
    /// * `transmission_factor` - fraction of beam light passing through a row, 0 to 1
    pub fn new(
        tilt: f64,
        azimuth: f64,
        pitch: f64,
        clearance: f64,
        bandwidth: f64,
        transmission_factor: f64,
    ) -> Result<Self, ConfigurationError> {
        if !(bandwidth > 0.) {
            return Err(ConfigurationError::InvalidGeometry(format!(
                "array bandwidth must be positive, got {bandwidth}"
            )));
        }
        if !(pitch > 0.) {
            return Err(ConfigurationError::InvalidGeometry(format!(
                "row pitch must be positive, got {pitch}"
            )));
        }
        if !(clearance >= 0.) {
            return Err(ConfigurationError::InvalidGeometry(format!(
                "ground clearance must not be negative, got {clearance}"
            )));
        }
        if !(0. ..=1.).contains(&transmission_factor) {
            return Err(ConfigurationError::InvalidGeometry(format!(
                "transmission factor must be between 0 and 1, got {transmission_factor}"
            )));
        }
        if !(0. ..=FRAC_PI_2).contains(&tilt) {
            return Err(ConfigurationError::InvalidGeometry(format!(
                "module tilt must be between 0 and pi/2 radians, got {tilt}"
            )));
        }

        Ok(Self {
            tilt,
            azimuth,
            pitch: pitch / bandwidth,
            clearance: clearance / bandwidth,
            bandwidth,
            transmission_factor,
        })
    }

    /// Geometry of the same array with the orientation a tracker holds for one
    /// timestep. A negative tilt describes the same plane as the positive tilt
    /// facing the opposite way, which is how it is stored.
    ///
    /// Arguments:
    /// * `tilt` - module tilt from horizontal, in radians, -pi/2 to pi/2
    /// * `azimuth` - module azimuth, in radians
    /// * `clearance` - height of the lower module edge above the ground, in m
    pub fn oriented(
        &self,
        tilt: f64,
        azimuth: f64,
        clearance: f64,
    ) -> Result<Self, ConfigurationError> {
        if !(-FRAC_PI_2..=FRAC_PI_2).contains(&tilt) {
            return Err(ConfigurationError::InvalidGeometry(format!(
                "tracker tilt must be between -pi/2 and pi/2 radians, got {tilt}"
            )));
        }
        if !(clearance >= 0.) {
            return Err(ConfigurationError::InvalidGeometry(format!(
                "tracker ground clearance must not be negative, got {clearance}"
            )));
        }

        let (tilt, azimuth) = if tilt < 0. {
            (-tilt, (azimuth + PI).rem_euclid(TAU))
        } else {
            (tilt, azimuth)
        };

        Ok(Self {
            tilt,
            azimuth,
            clearance: clearance / self.bandwidth,
            ..*self
        })
    }

    pub fn tilt(&self) -> f64 {
        self.tilt
    }

    pub fn azimuth(&self) -> f64 {
        self.azimuth
    }

    /// Row to row spacing in panel slope lengths
    pub fn pitch(&self) -> f64 {
        self.pitch
    }

    /// Lower module edge height in panel slope lengths
    pub fn clearance(&self) -> f64 {
        self.clearance
    }

    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    pub fn transmission_factor(&self) -> f64 {
        self.transmission_factor
    }

    /// Vertical extent of a row, in panel slope lengths
    pub fn panel_height(&self) -> f64 {
        self.tilt.sin()
    }

    /// Horizontal extent of a row, in panel slope lengths
    pub fn panel_depth(&self) -> f64 {
        self.tilt.cos()
    }

    /// Position of the lower (front) edge of row `row`
    pub(crate) fn lower_edge(&self, row: i64) -> (f64, f64) {
        (row as f64 * self.pitch, self.clearance)
    }

    /// Position of the upper (back) edge of row `row`
    pub(crate) fn upper_edge(&self, row: i64) -> (f64, f64) {
        (
            row as f64 * self.pitch + self.panel_depth(),
            self.clearance + self.panel_height(),
        )
    }

    /// Midpoint of segment `segment` when one pitch is split into `segment_count`
    /// equal segments, measured from the start of the span.
    pub fn segment_midpoint(&self, segment: usize, segment_count: usize) -> f64 {
        (segment as f64 + 0.5) * self.pitch / segment_count as f64
    }
}

/// Where a strip of ground sits within the array.
#[derive(Clone, Copy, Debug, EnumIter, Eq, Hash, PartialEq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum RowContext {
    /// Between two rows inside the array, with rows repeating in both directions
    Interior,
    /// In front of the first row, with no rows further ahead
    First,
    /// Behind the last row, with no rows further behind
    Last,
}

impl RowContext {
    /// Index of the row on the front (-x) side of the context's ground span.
    ///
    /// The first row of the array is row 0, so the span in front of it is
    /// bounded by the missing row -1. Interior and last spans run from row 0.
    pub(crate) fn span_front_row(self) -> i64 {
        match self {
            RowContext::First => -1,
            RowContext::Interior | RowContext::Last => 0,
        }
    }

    /// Whether row `row` exists for this context
    pub(crate) fn has_row(self, row: i64) -> bool {
        match self {
            RowContext::Interior => true,
            RowContext::First => row >= 0,
            RowContext::Last => row <= 0,
        }
    }

    /// Ground position of a point `x` into the context's span
    pub(crate) fn span_position(self, x: f64, pitch: f64) -> f64 {
        x + self.span_front_row() as f64 * pitch
    }
}

/// One value per row context.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ByRowContext<T> {
    pub interior: T,
    pub first: T,
    pub last: T,
}

impl<T> ByRowContext<T> {
    pub fn from_fn(mut f: impl FnMut(RowContext) -> T) -> Self {
        Self {
            interior: f(RowContext::Interior),
            first: f(RowContext::First),
            last: f(RowContext::Last),
        }
    }

    pub fn get(&self, context: RowContext) -> &T {
        match context {
            RowContext::Interior => &self.interior,
            RowContext::First => &self.first,
            RowContext::Last => &self.last,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (RowContext, &T)> {
        RowContext::iter().map(move |context| (context, self.get(context)))
    }

    pub fn try_from_fn<E>(mut f: impl FnMut(RowContext) -> Result<T, E>) -> Result<Self, E> {
        Ok(Self {
            interior: f(RowContext::Interior)?,
            first: f(RowContext::First)?,
            last: f(RowContext::Last)?,
        })
    }
}
