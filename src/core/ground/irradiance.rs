use crate::core::ground::beam_shadow::ShadeFlags;
use crate::core::ground::geometry::ByRowContext;
use crate::core::ground::sky_view::SkyViewFactors;
use itertools::Itertools;

/// Irradiance reaching each ground segment, in W/m2, per row context.
pub type GroundIrradiance = ByRowContext<Vec<f64>>;

/// Measured irradiance on the horizontal plane for one timestep, in W/m2.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HorizontalIrradiance {
    pub direct: f64,
    pub diffuse: f64,
}

impl HorizontalIrradiance {
    /// Irradiance on one ground segment: the diffuse share its sky view factor
    /// admits plus the direct beam, reduced to the transmitted fraction where a
    /// row shades the segment.
    pub fn on_segment(&self, sky_view_factor: f64, shaded: bool, transmission_factor: f64) -> f64 {
        let direct = if shaded {
            self.direct * transmission_factor
        } else {
            self.direct
        };
        self.diffuse * sky_view_factor + direct
    }
}

/// Combines sky view factors and beam shading with the measured horizontal
/// irradiance into per-segment ground irradiance for every row context.
pub fn ground_irradiance(
    irradiance: HorizontalIrradiance,
    sky_view_factors: &SkyViewFactors,
    shade_flags: &ShadeFlags,
    transmission_factor: f64,
) -> GroundIrradiance {
    ByRowContext::from_fn(|context| {
        sky_view_factors
            .get(context)
            .iter()
            .zip_eq(shade_flags.get(context))
            .map(|(sky_view_factor, shaded)| {
                irradiance.on_segment(*sky_view_factor, *shaded, transmission_factor)
            })
            .collect()
    })
}
