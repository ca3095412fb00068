pub mod beam_shadow;
pub mod geometry;
pub mod ground_model;
pub mod irradiance;
pub mod sky_view;
