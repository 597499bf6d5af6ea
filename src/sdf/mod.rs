//! Signed distance primitives and CSG helpers.
//!
//! Everything in here is a pure function of a world point and shape
//! parameters. Sign convention throughout the crate: negative = inside
//! solid ground, positive = air. The same math exists a second time in
//! src/gpu/shaders/scene_distance.wgsl for the GPU evaluator; the two must
//! not drift.

pub mod geometry;
pub mod noise;
pub mod primitives;

pub use geometry::GeometryDescriptor;
pub use noise::{fbm_2d, value_noise_2d};
pub use primitives::{
    sd_band, sd_cut, sd_ellipsoid, sd_intersect, sd_sphere, sd_subtract, sd_union,
};
