pub mod ground;
pub mod solar_geometry;
