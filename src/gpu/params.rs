//! Packed parameter blocks shared with the WGSL kernels.
//!
//! Field order and padding match the shader structs byte for byte; change
//! one side only together with the other.

use bytemuck::{Pod, Zeroable};
use glam::UVec3;

use crate::config::TerrainConfig;
use crate::constants::field::FAR_DISTANCE;
use crate::sdf::GeometryDescriptor;

/// Geometry variant tags, shared with the shader.
pub const KIND_BAND: u32 = 0;
pub const KIND_NOISY_BAND: u32 = 1;
pub const KIND_CUT: u32 = 2;
pub const KIND_ELLIPSOID: u32 = 3;

/// One packed layer shape.
///
/// `a`/`b` are interpreted by `kind`:
/// - Band:       a = (top, bottom, -, -)
/// - NoisyBand:  a = (top, bottom, amplitude, frequency)
/// - Cut:        a = (center.xyz, radius), b = (depth, -, -, -)
/// - Ellipsoid:  a = (center.xyz, -),      b = (radii.xyz, -)
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct GeometryParams {
    pub kind: u32,
    pub seed: u32,
    pub _pad: [u32; 2],
    pub a: [f32; 4],
    pub b: [f32; 4],
}

impl From<&GeometryDescriptor> for GeometryParams {
    fn from(geometry: &GeometryDescriptor) -> Self {
        let mut packed = GeometryParams::zeroed();
        match *geometry {
            GeometryDescriptor::Band { top, bottom } => {
                packed.kind = KIND_BAND;
                packed.a = [top, bottom, 0.0, 0.0];
            }
            GeometryDescriptor::NoisyBand {
                top,
                bottom,
                amplitude,
                frequency,
                seed,
            } => {
                packed.kind = KIND_NOISY_BAND;
                packed.seed = seed;
                packed.a = [top, bottom, amplitude, frequency];
            }
            GeometryDescriptor::Cut {
                center,
                radius,
                depth,
            } => {
                packed.kind = KIND_CUT;
                packed.a = [center.x, center.y, center.z, radius];
                packed.b = [depth, 0.0, 0.0, 0.0];
            }
            GeometryDescriptor::Ellipsoid { center, radii } => {
                packed.kind = KIND_ELLIPSOID;
                packed.a = [center.x, center.y, center.z, 0.0];
                packed.b = [radii.x, radii.y, radii.z, 0.0];
            }
        }
        packed
    }
}

/// Uniform block describing the volume and batch.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct SceneParams {
    pub origin: [f32; 3],
    pub voxel_size: f32,
    pub resolution: [u32; 3],
    pub layer_count: u32,
    pub far_distance: f32,
    pub point_count: u32,
    pub _pad: [u32; 2],
}

impl SceneParams {
    pub fn new(config: &TerrainConfig, layer_count: u32, point_count: u32) -> Self {
        let resolution: UVec3 = config.resolution();
        Self {
            origin: config.world_origin,
            voxel_size: config.voxel_size,
            resolution: resolution.to_array(),
            layer_count,
            far_distance: FAR_DISTANCE,
            point_count,
            _pad: [0; 2],
        }
    }
}
