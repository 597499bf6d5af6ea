//! Surface query service: point and short-segment lookups against either
//! the analytical layer stack or the full carved scene.
//!
//! Two modes with different guarantees. The analytical mode evaluates the
//! layer stack directly - deterministic, CPU-only, O(layer count), but
//! blind to carve state. The full-scene mode reads the distance volume and
//! therefore sees every stroke; when the volume lives on the GPU the same
//! lookup goes through the batched dispatch in [`crate::gpu`] instead.

use glam::Vec3;

use crate::config::MarchConfig;
use crate::constants::field::FAR_DISTANCE;
use crate::march::surface_normal;
use crate::strata::{LayerStack, Material};
use crate::volume::DistanceVolume;

/// Errors surfaced through a query's completion path. The rendering
/// consumer treats any of these as a miss, never a crash.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("a query batch is already in flight; wait for its completion")]
    BatchInFlight,

    #[error("GPU readback failed: {0}")]
    Readback(String),

    #[error("compute dispatch failed: {0}")]
    Dispatch(String),
}

/// Result of a point or segment query.
#[derive(Debug, Clone)]
pub struct SurfaceHit {
    pub hit: bool,
    pub position: Vec3,
    pub normal: Vec3,
    /// Resolved stratigraphy material, when the query hit solid ground.
    pub material: Option<Material>,
    pub traveled: f32,
}

impl SurfaceHit {
    pub fn miss(position: Vec3, traveled: f32) -> Self {
        Self {
            hit: false,
            position,
            normal: Vec3::ZERO,
            material: None,
            traveled,
        }
    }
}

/// Analytical layer-only distance. Ignores carve state by contract; used
/// where a caller needs an immediate CPU answer (tool proximity before a
/// GPU readback is available, player grounding pre-pass).
pub fn analytical_distance(stack: &LayerStack, p: Vec3) -> f32 {
    stack.distance(p)
}

/// Full-scene distance at a point: the carved volume's interpolated field,
/// far-air outside the bounds.
pub fn scene_distance(volume: &DistanceVolume, p: Vec3) -> f32 {
    volume.sample_trilinear(p)
}

/// Point query against the full scene: distance, containment, normal and
/// material in one result.
pub fn point_query(
    volume: &DistanceVolume,
    stack: &LayerStack,
    p: Vec3,
    surface_threshold: f32,
) -> SurfaceHit {
    let d = scene_distance(volume, p);
    if d >= surface_threshold || d >= FAR_DISTANCE {
        return SurfaceHit::miss(p, d.max(0.0));
    }
    let normal = surface_normal(volume, p);
    // A point passing the threshold can still be marginally on the air
    // side; resolve the material just under the surface.
    let under = p - normal * (0.5 * volume.voxel_size());
    SurfaceHit {
        hit: true,
        position: p,
        normal,
        material: Some(stack.resolve_material(under).clone()),
        traveled: d.abs(),
    }
}

/// Flat (non-hierarchical) sphere trace for short-range tool and ground
/// checks. Advances by the sampled distance each step; fine over a few
/// voxels, not a substitute for [`crate::march::march`] over long rays.
pub fn sphere_trace(
    volume: &DistanceVolume,
    stack: &LayerStack,
    origin: Vec3,
    direction: Vec3,
    max_distance: f32,
    config: &MarchConfig,
) -> SurfaceHit {
    let direction = direction.normalize_or_zero();
    if direction == Vec3::ZERO {
        return SurfaceHit::miss(origin, 0.0);
    }

    let mut t = 0.0;
    for _ in 0..config.max_steps {
        let p = origin + direction * t;
        let d = volume.sample_trilinear(p);
        if d < config.surface_threshold {
            let normal = surface_normal(volume, p);
            let under = p - normal * (0.5 * volume.voxel_size());
            return SurfaceHit {
                hit: true,
                position: p,
                normal,
                material: Some(stack.resolve_material(under).clone()),
                traveled: t,
            };
        }
        if t > max_distance {
            break;
        }
        t += d;
    }
    SurfaceHit::miss(origin + direction * t, t)
}

/// Analytical sphere trace over the layer stack only. Same stepping as
/// [`sphere_trace`] but never touches the volume, so it is safe to call
/// from contexts that cannot see the carved grid.
pub fn analytical_trace(
    stack: &LayerStack,
    origin: Vec3,
    direction: Vec3,
    max_distance: f32,
    config: &MarchConfig,
) -> SurfaceHit {
    let direction = direction.normalize_or_zero();
    if direction == Vec3::ZERO {
        return SurfaceHit::miss(origin, 0.0);
    }

    let mut t = 0.0;
    for _ in 0..config.max_steps {
        let p = origin + direction * t;
        let d = stack.distance(p);
        if d < config.surface_threshold {
            // Analytical normal by central differences of the stack field.
            let e = 0.01;
            let n = Vec3::new(
                stack.distance(p + Vec3::X * e) - stack.distance(p - Vec3::X * e),
                stack.distance(p + Vec3::Y * e) - stack.distance(p - Vec3::Y * e),
                stack.distance(p + Vec3::Z * e) - stack.distance(p - Vec3::Z * e),
            )
            .normalize_or_zero();
            let under = p - n * (2.0 * config.surface_threshold);
            return SurfaceHit {
                hit: true,
                position: p,
                normal: n,
                material: Some(stack.resolve_material(under).clone()),
                traveled: t,
            };
        }
        if t > max_distance {
            break;
        }
        t += d;
    }
    SurfaceHit::miss(origin + direction * t, t)
}
