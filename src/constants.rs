// Strata Engine constants - single source of truth.
//
// Numeric constants shared between the CPU evaluators and the WGSL kernels
// live here. The WGSL side (src/gpu/shaders/scene_distance.wgsl) repeats the
// same values; keep both in sync when changing anything below.

/// Distance field storage and mip pyramid.
pub mod field {
    /// Sentinel distance for "no solid information" - treated as air far
    /// from any surface. Written everywhere at initialization and returned
    /// for any sample outside the authored bounds.
    pub const FAR_DISTANCE: f32 = 9999.0;

    /// Upper bound on mip levels above level 0.
    pub const MAX_MIP_LEVELS: u32 = 8;

    /// sqrt(3) / 2. The conservative mip correction is this factor times
    /// the voxel size of the level being written; it guarantees a coarse
    /// sample never claims the surface is closer than it truly is.
    pub const MIP_CORRECTION_FACTOR: f32 = 0.866_025_4;
}

/// Ray marching defaults. Overridable per session through [`crate::MarchConfig`].
pub mod march {
    /// Step budget per ray; the only termination guarantee the marcher needs.
    pub const MAX_STEPS: u32 = 192;

    /// Maximum distance a ray may travel before reporting a miss.
    pub const MAX_DISTANCE: f32 = 200.0;

    /// Sampled distances below this count as a surface hit.
    pub const SURFACE_THRESHOLD: f32 = 0.005;

    /// Refine to a finer mip when the sampled distance drops below this
    /// multiple of the current mip's voxel size.
    pub const REFINE_FACTOR: f32 = 1.5;

    /// Forward bias applied at coarse mips, as a fraction of the current
    /// voxel size. Zero at mip 0.
    pub const COARSE_NUDGE_FRACTION: f32 = 0.25;

    /// Central-difference epsilon for normal estimation, as a fraction of
    /// the base voxel size.
    pub const NORMAL_EPSILON_FACTOR: f32 = 0.5;
}

/// Volume save format.
pub mod save {
    /// Magic bytes identifying a serialized distance volume.
    pub const VOLUME_MAGIC: &[u8; 4] = b"SVOL";

    /// Current wire format version.
    pub const VOLUME_FORMAT_VERSION: u32 = 2;
}

/// Coherent noise parameters for noisy depth bands. The same fractal is
/// evaluated on CPU (src/sdf/noise.rs) and GPU (scene_distance.wgsl).
pub mod noise {
    pub const OCTAVES: u32 = 3;
    pub const LACUNARITY: f32 = 2.0;
    pub const GAIN: f32 = 0.5;
}
