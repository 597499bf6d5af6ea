//! Hierarchical ray marcher over the mip pyramid.
//!
//! Each ray carries `(t, mip)` state: coarse mips leap through empty
//! space, and the marcher refines toward mip 0 whenever the sampled
//! distance gets within 1.5 voxels of the current level, which is what
//! keeps a thin wall from being stepped over. The step budget is the only
//! termination mechanism and bounds work per ray unconditionally.

use glam::Vec3;

use crate::config::MarchConfig;
use crate::constants::march::{NORMAL_EPSILON_FACTOR, REFINE_FACTOR};
use crate::volume::DistanceVolume;

/// A world-space ray. Direction need not be normalized; `march` normalizes.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Terminal state of one march.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MarchResult {
    /// Surface reached within budget.
    Hit { position: Vec3, traveled: f32 },
    /// Budget exhausted or ray left the scene.
    Miss { position: Vec3, traveled: f32 },
}

impl MarchResult {
    pub fn is_hit(&self) -> bool {
        matches!(self, Self::Hit { .. })
    }

    pub fn position(&self) -> Vec3 {
        match *self {
            Self::Hit { position, .. } | Self::Miss { position, .. } => position,
        }
    }

    pub fn traveled(&self) -> f32 {
        match *self {
            Self::Hit { traveled, .. } | Self::Miss { traveled, .. } => traveled,
        }
    }
}

/// March a ray against the volume's mip pyramid.
///
/// Runs synchronously to completion; `config.max_steps` bounds the loop,
/// `config.max_distance` bounds travel. A ray starting outside the volume
/// first advances to its entry point; a ray that misses the bounds
/// entirely is an immediate miss.
pub fn march(volume: &DistanceVolume, ray: &Ray, config: &MarchConfig) -> MarchResult {
    let direction = ray.direction.normalize_or_zero();
    if direction == Vec3::ZERO {
        return MarchResult::Miss {
            position: ray.origin,
            traveled: 0.0,
        };
    }
    let ray = Ray::new(ray.origin, direction);

    let mut t = if volume.contains(ray.origin) {
        0.0
    } else {
        match entry_distance(volume, &ray) {
            // Step half a voxel past the face so the first sample lands
            // inside the half-open bounds instead of on them.
            Some(entry) => entry + 0.5 * volume.voxel_size(),
            None => {
                return MarchResult::Miss {
                    position: ray.origin,
                    traveled: 0.0,
                }
            }
        }
    };

    let mut mip = volume.mip_count() - 1;
    for _ in 0..config.max_steps {
        let p = ray.at(t);
        let d = volume.sample(p, mip);
        let voxel = volume.voxel_size_at(mip);

        // Safety refine: a coarse mip cannot resolve features near the
        // surface; drop a level and resample without advancing.
        if mip > 0 && d < REFINE_FACTOR * voxel {
            mip -= 1;
            continue;
        }

        if d < config.surface_threshold {
            return MarchResult::Hit {
                position: p,
                traveled: t,
            };
        }

        if t > config.max_distance {
            return MarchResult::Miss {
                position: p,
                traveled: t,
            };
        }

        // Quantization at coarse mips can report a distance that lands the
        // ray on the same sample; the nudge breaks the tie. Zero at mip 0
        // so hits stay accurate.
        let nudge = if mip > 0 {
            config.coarse_nudge_fraction * voxel
        } else {
            0.0
        };
        t += d + nudge;
    }

    MarchResult::Miss {
        position: ray.at(t),
        traveled: t,
    }
}

/// Surface normal from central differences of the trilinear field.
/// Also used to bias secondary-ray origins off the surface.
pub fn surface_normal(volume: &DistanceVolume, p: Vec3) -> Vec3 {
    let e = volume.voxel_size() * NORMAL_EPSILON_FACTOR;
    let dx = volume.sample_trilinear(p + Vec3::new(e, 0.0, 0.0))
        - volume.sample_trilinear(p - Vec3::new(e, 0.0, 0.0));
    let dy = volume.sample_trilinear(p + Vec3::new(0.0, e, 0.0))
        - volume.sample_trilinear(p - Vec3::new(0.0, e, 0.0));
    let dz = volume.sample_trilinear(p + Vec3::new(0.0, 0.0, e))
        - volume.sample_trilinear(p - Vec3::new(0.0, 0.0, e));
    Vec3::new(dx, dy, dz).normalize_or_zero()
}

/// Distance along the ray to the volume's bounding box, for origins
/// outside it. `None` when the ray never enters.
fn entry_distance(volume: &DistanceVolume, ray: &Ray) -> Option<f32> {
    let min = volume.origin();
    let max = volume.max_corner();
    let mut t_near = 0.0f32;
    let mut t_far = f32::MAX;

    for axis in 0..3 {
        let o = ray.origin[axis];
        let d = ray.direction[axis];
        if d.abs() < 1e-8 {
            if o < min[axis] || o > max[axis] {
                return None;
            }
            continue;
        }
        let inv = 1.0 / d;
        let (t0, t1) = {
            let a = (min[axis] - o) * inv;
            let b = (max[axis] - o) * inv;
            if a < b {
                (a, b)
            } else {
                (b, a)
            }
        };
        t_near = t_near.max(t0);
        t_far = t_far.min(t1);
        if t_near > t_far {
            return None;
        }
    }
    Some(t_near)
}
