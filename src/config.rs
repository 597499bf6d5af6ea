//! Terrain configuration.
//!
//! All spatial settings for a dig site come in here once, at session
//! construction, and stay read-only afterwards. Invalid settings are fatal
//! to the operation that needs them, never silently defaulted.

use glam::{UVec3, Vec3};
use serde::{Deserialize, Serialize};

use crate::constants::{field, march};

/// Configuration errors. All of these abort the requesting operation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("voxel size must be positive, got {0}")]
    InvalidVoxelSize(f32),

    #[error("world extent must be positive on every axis, got {0:?}")]
    InvalidExtent([f32; 3]),

    #[error("march step budget must be nonzero")]
    ZeroStepBudget,

    #[error("march distance budget must be positive, got {0}")]
    InvalidDistanceBudget(f32),

    #[error("failed to parse terrain config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Ray marching budgets and thresholds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct MarchConfig {
    /// Step budget per ray.
    pub max_steps: u32,
    /// Maximum marching distance before a miss.
    pub max_distance: f32,
    /// Sampled distance below which the marcher reports a hit.
    pub surface_threshold: f32,
    /// Forward bias at coarse mips, as a fraction of the mip voxel size.
    pub coarse_nudge_fraction: f32,
}

impl Default for MarchConfig {
    fn default() -> Self {
        Self {
            max_steps: march::MAX_STEPS,
            max_distance: march::MAX_DISTANCE,
            surface_threshold: march::SURFACE_THRESHOLD,
            coarse_nudge_fraction: march::COARSE_NUDGE_FRACTION,
        }
    }
}

/// Spatial settings for one dig site.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// World-space minimum corner of the volume.
    pub world_origin: [f32; 3],
    /// World-space size of the volume along each axis.
    pub world_extent: [f32; 3],
    /// Edge length of one voxel at mip 0.
    pub voxel_size: f32,
    /// Y level the topmost stratigraphic band starts at.
    pub surface_y: f32,
    /// Ray marching budgets.
    pub march: MarchConfig,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            world_origin: [-5.0, -5.0, -5.0],
            world_extent: [10.0, 10.0, 10.0],
            voxel_size: 0.1,
            surface_y: 0.0,
            march: MarchConfig::default(),
        }
    }
}

impl TerrainConfig {
    /// Parse a config from TOML text and validate it.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the volume or marcher cannot operate under.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.voxel_size > 0.0) {
            return Err(ConfigError::InvalidVoxelSize(self.voxel_size));
        }
        if self.world_extent.iter().any(|&e| !(e > 0.0)) {
            return Err(ConfigError::InvalidExtent(self.world_extent));
        }
        if self.march.max_steps == 0 {
            return Err(ConfigError::ZeroStepBudget);
        }
        if !(self.march.max_distance > 0.0) {
            return Err(ConfigError::InvalidDistanceBudget(self.march.max_distance));
        }
        Ok(())
    }

    pub fn origin(&self) -> Vec3 {
        Vec3::from(self.world_origin)
    }

    pub fn extent(&self) -> Vec3 {
        Vec3::from(self.world_extent)
    }

    /// Grid resolution per axis: `ceil(extent / voxel_size)`, at least 1.
    pub fn resolution(&self) -> UVec3 {
        let res = (self.extent() / self.voxel_size).ceil();
        UVec3::new(
            (res.x as u32).max(1),
            (res.y as u32).max(1),
            (res.z as u32).max(1),
        )
    }

    /// Mip levels above level 0: `floor(log2(min(resolution)))`, clamped.
    pub fn mip_levels(&self) -> u32 {
        let res = self.resolution();
        let min_dim = res.x.min(res.y).min(res.z);
        (32 - min_dim.leading_zeros() - 1).min(field::MAX_MIP_LEVELS)
    }
}
