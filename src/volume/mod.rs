//! The distance volume: a dense grid of scene signed distances plus a
//! conservative mip pyramid.
//!
//! This is the single mutable ground truth of excavation state. Level 0
//! holds (approximately) exact signed distance to the current scene
//! surface after baking and carving; every coarser level holds a lower
//! bound that never overstates how close the surface is, which is what
//! makes large marching steps at coarse mips safe.

pub mod bake;
pub mod carve;
pub mod mips;

pub use bake::bake;
pub use carve::{carve, BrushStroke};
pub use mips::regenerate_mips;

use glam::{UVec3, Vec3};

use crate::config::{ConfigError, TerrainConfig};
use crate::constants::field::FAR_DISTANCE;

/// One level of the pyramid. Level 0 is the full-resolution grid.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MipLevel {
    pub dims: UVec3,
    pub data: Vec<f32>,
}

impl MipLevel {
    fn new(dims: UVec3) -> Self {
        let len = (dims.x * dims.y * dims.z) as usize;
        Self {
            dims,
            data: vec![FAR_DISTANCE; len],
        }
    }

    #[inline]
    pub fn index(&self, x: u32, y: u32, z: u32) -> usize {
        ((z * self.dims.y + y) * self.dims.x + x) as usize
    }
}

/// Dense scene SDF grid with mip pyramid. Negative = solid ground,
/// positive = air.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceVolume {
    origin: Vec3,
    voxel_size: f32,
    pub(crate) levels: Vec<MipLevel>,
}

impl DistanceVolume {
    /// Allocate the grid and pyramid, every voxel at the far-air sentinel.
    ///
    /// Mip dimensions shrink per axis with `ceil(parent / 2)` so odd and
    /// non-cubic resolutions keep every child covered by some parent.
    pub fn new(config: &TerrainConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let resolution = config.resolution();
        let mip_levels = config.mip_levels();

        let mut levels = Vec::with_capacity(mip_levels as usize + 1);
        levels.push(MipLevel::new(resolution));
        for _ in 0..mip_levels {
            let parent = levels[levels.len() - 1].dims;
            let dims = UVec3::new(
                (parent.x + 1) / 2,
                (parent.y + 1) / 2,
                (parent.z + 1) / 2,
            )
            .max(UVec3::ONE);
            levels.push(MipLevel::new(dims));
        }

        Ok(Self {
            origin: config.origin(),
            voxel_size: config.voxel_size,
            levels,
        })
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn voxel_size(&self) -> f32 {
        self.voxel_size
    }

    /// Edge length of one voxel at the given mip.
    pub fn voxel_size_at(&self, mip: usize) -> f32 {
        self.voxel_size * (1u32 << mip) as f32
    }

    /// Level-0 grid dimensions.
    pub fn resolution(&self) -> UVec3 {
        self.levels[0].dims
    }

    /// Total level count including level 0.
    pub fn mip_count(&self) -> usize {
        self.levels.len()
    }

    pub fn mip_dims(&self, mip: usize) -> UVec3 {
        self.levels[mip].dims
    }

    /// Stored value at a mip voxel. Panics on out-of-range coordinates;
    /// spatial queries go through [`Self::sample`] instead.
    pub fn mip_value(&self, mip: usize, x: u32, y: u32, z: u32) -> f32 {
        let level = &self.levels[mip];
        level.data[level.index(x, y, z)]
    }

    /// World-space maximum corner of the authored grid.
    pub fn max_corner(&self) -> Vec3 {
        self.origin + self.levels[0].dims.as_vec3() * self.voxel_size
    }

    /// Whether a world point lies inside the authored bounds.
    pub fn contains(&self, p: Vec3) -> bool {
        let max = self.max_corner();
        p.x >= self.origin.x
            && p.y >= self.origin.y
            && p.z >= self.origin.z
            && p.x < max.x
            && p.y < max.y
            && p.z < max.z
    }

    /// World-space center of a level-0 voxel.
    #[inline]
    pub fn voxel_center(&self, x: u32, y: u32, z: u32) -> Vec3 {
        self.origin + (UVec3::new(x, y, z).as_vec3() + Vec3::splat(0.5)) * self.voxel_size
    }

    pub fn distance_at(&self, x: u32, y: u32, z: u32) -> f32 {
        self.mip_value(0, x, y, z)
    }

    pub fn set_distance(&mut self, x: u32, y: u32, z: u32, value: f32) {
        let idx = self.levels[0].index(x, y, z);
        self.levels[0].data[idx] = value;
    }

    /// Raw level-0 contents, the unit of save/load.
    pub fn level0(&self) -> &[f32] {
        &self.levels[0].data
    }

    pub(crate) fn level0_mut(&mut self) -> &mut [f32] {
        &mut self.levels[0].data
    }

    /// Sample the scene distance at a world point and mip level: trilinear
    /// at mip 0, nearest at coarser levels. Outside the authored bounds the
    /// far-air sentinel comes back; sampling is total over all of space.
    pub fn sample(&self, p: Vec3, mip: usize) -> f32 {
        if mip == 0 {
            self.sample_trilinear(p)
        } else {
            self.sample_nearest(p, mip)
        }
    }

    /// Point sample at any mip.
    pub fn sample_nearest(&self, p: Vec3, mip: usize) -> f32 {
        if !self.contains(p) {
            return FAR_DISTANCE;
        }
        let level = &self.levels[mip];
        let cell = (p - self.origin) / self.voxel_size_at(mip);
        let x = (cell.x as u32).min(level.dims.x - 1);
        let y = (cell.y as u32).min(level.dims.y - 1);
        let z = (cell.z as u32).min(level.dims.z - 1);
        level.data[level.index(x, y, z)]
    }

    /// Interpolated sample at mip 0; produces the smooth surface the
    /// marcher resolves hits against.
    pub fn sample_trilinear(&self, p: Vec3) -> f32 {
        if !self.contains(p) {
            return FAR_DISTANCE;
        }
        let level = &self.levels[0];
        let dims = level.dims;
        // Lattice coordinates relative to voxel centers.
        let g = (p - self.origin) / self.voxel_size - Vec3::splat(0.5);
        let base = g.floor();
        let f = g - base;

        let clamp_axis = |v: f32, max: u32| -> u32 {
            if v < 0.0 {
                0
            } else {
                (v as u32).min(max - 1)
            }
        };
        let x0 = clamp_axis(base.x, dims.x);
        let y0 = clamp_axis(base.y, dims.y);
        let z0 = clamp_axis(base.z, dims.z);
        let x1 = (x0 + 1).min(dims.x - 1);
        let y1 = (y0 + 1).min(dims.y - 1);
        let z1 = (z0 + 1).min(dims.z - 1);

        let d = &level.data;
        let lerp = |a: f32, b: f32, t: f32| a + (b - a) * t;

        let c00 = lerp(d[level.index(x0, y0, z0)], d[level.index(x1, y0, z0)], f.x);
        let c10 = lerp(d[level.index(x0, y1, z0)], d[level.index(x1, y1, z0)], f.x);
        let c01 = lerp(d[level.index(x0, y0, z1)], d[level.index(x1, y0, z1)], f.x);
        let c11 = lerp(d[level.index(x0, y1, z1)], d[level.index(x1, y1, z1)], f.x);

        let c0 = lerp(c00, c10, f.y);
        let c1 = lerp(c01, c11, f.y);
        lerp(c0, c1, f.z)
    }

    /// Replace level-0 contents wholesale (load path). The caller must
    /// regenerate mips afterwards; `restore` in the session does.
    pub(crate) fn overwrite_level0(&mut self, data: Vec<f32>) {
        debug_assert_eq!(data.len(), self.levels[0].data.len());
        self.levels[0].data = data;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TerrainConfig;

    fn small_config() -> TerrainConfig {
        TerrainConfig {
            world_origin: [0.0, 0.0, 0.0],
            world_extent: [1.0, 1.0, 1.0],
            voxel_size: 0.1,
            ..Default::default()
        }
    }

    #[test]
    fn initializes_to_far_air() {
        let volume = DistanceVolume::new(&small_config()).unwrap();
        assert_eq!(volume.resolution(), UVec3::splat(10));
        assert!(volume.level0().iter().all(|&d| d == FAR_DISTANCE));
        // floor(log2(10)) = 3 levels above level 0.
        assert_eq!(volume.mip_count(), 4);
    }

    #[test]
    fn mip_dims_round_up_per_axis() {
        let config = TerrainConfig {
            world_origin: [0.0, 0.0, 0.0],
            world_extent: [1.5, 1.0, 0.9],
            voxel_size: 0.1,
            ..Default::default()
        };
        let volume = DistanceVolume::new(&config).unwrap();
        assert_eq!(volume.mip_dims(0), UVec3::new(15, 10, 9));
        assert_eq!(volume.mip_dims(1), UVec3::new(8, 5, 5));
        assert_eq!(volume.mip_dims(2), UVec3::new(4, 3, 3));
    }

    #[test]
    fn sampling_outside_bounds_is_far_air() {
        let volume = DistanceVolume::new(&small_config()).unwrap();
        assert_eq!(volume.sample(Vec3::new(-1.0, 0.5, 0.5), 0), FAR_DISTANCE);
        assert_eq!(volume.sample(Vec3::new(0.5, 99.0, 0.5), 2), FAR_DISTANCE);
    }

    #[test]
    fn trilinear_interpolates_between_voxel_centers() {
        let mut volume = DistanceVolume::new(&small_config()).unwrap();
        for v in volume.level0_mut() {
            *v = 1.0;
        }
        volume.set_distance(5, 5, 5, -1.0);
        let center = volume.voxel_center(5, 5, 5);
        assert_eq!(volume.sample_trilinear(center), -1.0);
        // Halfway toward the +x neighbor the value is halfway too.
        let midpoint = center + Vec3::new(0.05, 0.0, 0.0);
        assert!((volume.sample_trilinear(midpoint) - 0.0).abs() < 1e-5);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = TerrainConfig {
            voxel_size: -0.1,
            ..small_config()
        };
        assert!(DistanceVolume::new(&config).is_err());
    }
}
