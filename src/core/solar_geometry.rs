//! Radiation geometry shared by the ground model: the 2-D sky view factor of an
//! angular span and the sun's profile angle against a row of modules.
//!
//! All angles are in radians.

/// Position of the sun for one timestep.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SunPosition {
    pub zenith: f64,
    pub azimuth: f64,
}

/// Calculates the fraction of isotropic diffuse sky seen from a point on the
/// ground through the angular span between `beta1` and `beta2`.
///
/// Arguments:
/// * `beta1` - lower bounding angle, measured from the horizon behind the point (0)
///             over the zenith to the horizon ahead of it (pi)
/// * `beta2` - upper bounding angle on the same scale, not less than `beta1`
pub fn view_factor(beta1: f64, beta2: f64) -> f64 {
    0.5 * (beta1.cos() - beta2.cos())
}

/// Calculates the sun's profile angle, i.e. its elevation projected onto the
/// vertical plane perpendicular to the rows, measured from the horizon in front
/// of the modules.
///
/// Values below pi/2 mean the sun strikes the front of the modules, values
/// above pi/2 mean it strikes their back.
///
/// Arguments:
/// * `sun_zenith` - solar zenith angle
/// * `sun_azimuth` - solar azimuth angle
/// * `panel_azimuth` - azimuth of the horizontal projection of the module normal
pub fn profile_angle(sun_zenith: f64, sun_azimuth: f64, panel_azimuth: f64) -> f64 {
    sun_zenith
        .cos()
        .atan2(sun_zenith.sin() * (sun_azimuth - panel_azimuth).cos())
}
