use crate::core::ground::geometry::{ByRowContext, RowContext, RowGeometry};
use crate::core::solar_geometry::{profile_angle, SunPosition};
use crate::errors::GroundGeometryError;
use std::f64::consts::FRAC_PI_2;

/// Largest overlap, in panel slope lengths, tolerated between the two halves of
/// a shadow that wraps round the row to row span.
pub const SHADOW_OVERLAP_TOLERANCE: f64 = 1e-6;

/// Per-segment beam shading, per row context. `true` means shaded.
pub type ShadeFlags = ByRowContext<Vec<bool>>;

/// Half-open stretch of ground `[start, end)`, in panel slope lengths.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShadowInterval {
    pub start: f64,
    pub end: f64,
}

impl ShadowInterval {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, x: f64) -> bool {
        self.start <= x && x < self.end
    }

    pub fn width(&self) -> f64 {
        self.end - self.start
    }
}

/// A shadow piece together with the index of the row casting it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CastShadow {
    pub interval: ShadowInterval,
    pub row: i64,
}

/// Horizontal reach of the shadows cast by the parts of a row, in panel slope
/// lengths. Positive values fall towards the back of the array.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShadowProjection {
    /// reach of the module's own height
    pub lh: f64,
    /// reach of the ground clearance
    pub lc: f64,
    /// reach of height and clearance together
    pub lhc: f64,
}

impl ShadowProjection {
    /// Arguments:
    /// * `geometry` - row geometry
    /// * `front_profile_angle` - sun profile angle measured from the horizon in front
    ///                           of the modules, in radians, 0 to pi
    pub fn new(geometry: &RowGeometry, front_profile_angle: f64) -> Self {
        let tan_profile_angle = front_profile_angle.tan();
        let height = geometry.panel_height();
        let clearance = geometry.clearance();

        Self {
            lh: height / tan_profile_angle,
            lc: clearance / tan_profile_angle,
            lhc: (height + clearance) / tan_profile_angle,
        }
    }

    /// Shadow cast on the ground by row 0.
    pub fn row_shadow(&self, geometry: &RowGeometry) -> ShadowInterval {
        let upper_edge_shadow = self.lhc + geometry.panel_depth();
        if self.lc <= upper_edge_shadow {
            // sun on the module front, or behind but too high to invert the shadow
            ShadowInterval::new(self.lc, upper_edge_shadow)
        } else {
            ShadowInterval::new(upper_edge_shadow, self.lc)
        }
    }

    /// Whether one row's shadow is at least a pitch wide, so that within the
    /// array the shadows of neighbouring rows meet and cover all of the ground.
    pub fn covers_whole_span(&self, geometry: &RowGeometry) -> bool {
        let depth = geometry.panel_depth();
        let pitch = geometry.pitch();
        self.lh > pitch - depth || self.lh < -(pitch + depth)
    }
}

/// Moves a shadow narrower than the pitch into the span
/// `[span_start, span_start + pitch)` by whole pitches, splitting off the part
/// that runs past the end of the span and wrapping it to the span's start.
///
/// The pieces are returned with the rows casting them, where row `k` casts
/// `shadow` shifted by `k * pitch`. The wrapped piece always belongs to the row
/// in front of the one casting the leading piece.
pub fn split_wrapped_interval(
    shadow: ShadowInterval,
    span_start: f64,
    pitch: f64,
) -> Result<Vec<CastShadow>, GroundGeometryError> {
    let shift = ((shadow.start - span_start) / pitch).floor();
    let row = -(shift as i64);
    let leading = ShadowInterval::new(shadow.start - shift * pitch, shadow.end - shift * pitch);
    let span_end = span_start + pitch;

    if leading.end <= span_end {
        return Ok(vec![CastShadow {
            interval: leading,
            row,
        }]);
    }

    let leading = ShadowInterval::new(leading.start, span_end);
    let wrapped = ShadowInterval::new(span_start, shadow.end - (shift + 1.) * pitch);
    let overlap = wrapped.end - leading.start;
    if overlap > SHADOW_OVERLAP_TOLERANCE {
        return Err(GroundGeometryError {
            leading,
            wrapped,
            overlap,
        });
    }

    Ok(vec![
        CastShadow {
            interval: leading,
            row,
        },
        CastShadow {
            interval: wrapped,
            row: row - 1,
        },
    ])
}

/// Beam shadow falling on a context's span, in the context's own coordinates,
/// counting only rows that exist for the context.
pub fn context_shadows(
    projection: &ShadowProjection,
    geometry: &RowGeometry,
    context: RowContext,
) -> Result<Vec<ShadowInterval>, GroundGeometryError> {
    let shadow = projection.row_shadow(geometry);

    if projection.covers_whole_span(geometry) {
        // overlapping shadows merge into one from the outermost existing row
        return Ok(vec![match context {
            RowContext::Interior => ShadowInterval::new(f64::NEG_INFINITY, f64::INFINITY),
            RowContext::First => ShadowInterval::new(shadow.start, f64::INFINITY),
            RowContext::Last => ShadowInterval::new(f64::NEG_INFINITY, shadow.end),
        }]);
    }

    let pitch = geometry.pitch();
    let span_start = context.span_front_row() as f64 * pitch;

    Ok(split_wrapped_interval(shadow, span_start, pitch)?
        .into_iter()
        .filter(|cast| context.has_row(cast.row))
        .map(|cast| cast.interval)
        .collect())
}

/// Classifies each ground segment midpoint as shaded or unshaded by the direct
/// beam, for interior, first and last rows.
///
/// Arguments:
/// * `geometry` - row geometry for the timestep
/// * `sun` - sun position for the timestep
/// * `segment_count` - number of equal segments the row to row span is split into
pub fn beam_shadow(
    geometry: &RowGeometry,
    sun: SunPosition,
    segment_count: usize,
) -> Result<ShadeFlags, GroundGeometryError> {
    if sun.zenith > FRAC_PI_2 {
        return Ok(ByRowContext::from_fn(|_| vec![true; segment_count]));
    }

    let front_profile_angle = profile_angle(sun.zenith, sun.azimuth, geometry.azimuth());
    let projection = ShadowProjection::new(geometry, front_profile_angle);
    let pitch = geometry.pitch();

    ByRowContext::try_from_fn(|context| {
        let shadows = context_shadows(&projection, geometry, context)?;
        Ok((0..segment_count)
            .map(|segment| {
                let x = context
                    .span_position(geometry.segment_midpoint(segment, segment_count), pitch);
                shadows.iter().any(|shadow| shadow.contains(x))
            })
            .collect())
    })
}
