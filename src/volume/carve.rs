//! Carving: apply one brush stroke as a CSG subtraction against level 0.

use glam::Vec3;
use log::debug;

use super::DistanceVolume;
use crate::sdf::sd_sphere;

/// One application of the digging tool. Transient; consumed exactly once.
#[derive(Debug, Clone, Copy)]
pub struct BrushStroke {
    /// World-space brush center.
    pub center: Vec3,
    /// Brush sphere radius.
    pub radius: f32,
    /// Excavation rate; scaled by `dt` to soften the brush over time.
    pub intensity: f32,
    /// Seconds since the stroke was last applied.
    pub dt: f32,
}

impl BrushStroke {
    pub fn new(center: Vec3, radius: f32, intensity: f32, dt: f32) -> Self {
        Self {
            center,
            radius,
            intensity,
            dt,
        }
    }

    /// Effective reach of this stroke, including the softening term.
    fn reach(&self) -> f32 {
        self.radius + self.intensity * self.dt
    }
}

/// Apply the stroke to every level-0 voxel inside its bounding window,
/// clamped to the volume. A stroke entirely outside the bounds is a no-op.
/// Returns the number of voxels whose value changed.
///
/// Per voxel: `v = max(v, -(b - intensity*dt))` with `b` the brush sphere
/// distance at the voxel center, so the scene distance only ever moves
/// toward air. Mip levels are stale afterwards until
/// [`super::regenerate_mips`] runs; the session does both under one write
/// guard.
pub fn carve(volume: &mut DistanceVolume, stroke: &BrushStroke) -> usize {
    let dims = volume.resolution();
    let voxel_size = volume.voxel_size();
    let origin = volume.origin();

    let pad = stroke.reach() + voxel_size;
    let min_w = stroke.center - Vec3::splat(pad);
    let max_w = stroke.center + Vec3::splat(pad);

    let to_cell = |w: Vec3| ((w - origin) / voxel_size).floor();
    let lo = to_cell(min_w);
    let hi = to_cell(max_w);

    // Window entirely outside the authored bounds.
    if hi.x < 0.0
        || hi.y < 0.0
        || hi.z < 0.0
        || lo.x >= dims.x as f32
        || lo.y >= dims.y as f32
        || lo.z >= dims.z as f32
    {
        debug!("brush stroke at {:?} outside volume, skipped", stroke.center);
        return 0;
    }

    let clamp = |v: f32, max: u32| (v.max(0.0) as u32).min(max - 1);
    let (x0, x1) = (clamp(lo.x, dims.x), clamp(hi.x, dims.x));
    let (y0, y1) = (clamp(lo.y, dims.y), clamp(hi.y, dims.y));
    let (z0, z1) = (clamp(lo.z, dims.z), clamp(hi.z, dims.z));

    let soften = stroke.intensity * stroke.dt;
    let mut touched = 0;
    for z in z0..=z1 {
        for y in y0..=y1 {
            for x in x0..=x1 {
                let center = volume.voxel_center(x, y, z);
                let b = sd_sphere(center, stroke.center, stroke.radius);
                let carved = -(b - soften);
                let old = volume.distance_at(x, y, z);
                if carved > old {
                    volume.set_distance(x, y, z, carved);
                    touched += 1;
                }
            }
        }
    }
    debug!(
        "carved {} voxels at {:?} (radius {:.3})",
        touched, stroke.center, stroke.radius
    );
    touched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TerrainConfig;
    use crate::volume::{bake, regenerate_mips};
    use crate::strata::{Layer, LayerGeometry, LayerStack, Material};

    fn solid_volume() -> DistanceVolume {
        let config = TerrainConfig {
            world_origin: [0.0, -1.0, 0.0],
            world_extent: [1.0, 1.0, 1.0],
            voxel_size: 0.1,
            ..Default::default()
        };
        let mut volume = DistanceVolume::new(&config).unwrap();
        let stack = LayerStack::new(
            vec![Layer {
                material: Material::new("soil", [0.4, 0.3, 0.2, 1.0], 1.0),
                geometry: LayerGeometry::DepthBand { thickness: 1.0 },
            }],
            Material::new("bedrock", [0.3, 0.3, 0.3, 1.0], 5.0),
            0.0,
        );
        bake(&mut volume, &stack);
        volume
    }

    #[test]
    fn carve_moves_distances_toward_air_only() {
        let mut volume = solid_volume();
        let before = volume.level0().to_vec();
        let stroke = BrushStroke::new(Vec3::new(0.5, -0.1, 0.5), 0.2, 0.0, 0.0);
        let touched = carve(&mut volume, &stroke);
        assert!(touched > 0);
        for (a, b) in before.iter().zip(volume.level0()) {
            assert!(b >= a, "carving may never re-add solid material");
        }
    }

    #[test]
    fn carve_opens_air_at_the_brush_center() {
        let mut volume = solid_volume();
        let center = Vec3::new(0.5, -0.2, 0.5);
        assert!(volume.sample_trilinear(center) < 0.0);
        carve(&mut volume, &BrushStroke::new(center, 0.25, 0.0, 0.0));
        regenerate_mips(&mut volume);
        assert!(volume.sample_trilinear(center) > 0.0);
    }

    #[test]
    fn stroke_outside_bounds_is_a_no_op() {
        let mut volume = solid_volume();
        let before = volume.level0().to_vec();
        let touched = carve(
            &mut volume,
            &BrushStroke::new(Vec3::new(50.0, 50.0, 50.0), 0.3, 1.0, 0.016),
        );
        assert_eq!(touched, 0);
        assert_eq!(before, volume.level0());
    }

    #[test]
    fn intensity_softens_with_time() {
        let mut fast = solid_volume();
        let mut slow = solid_volume();
        let center = Vec3::new(0.5, -0.5, 0.5);
        carve(&mut fast, &BrushStroke::new(center, 0.2, 1.0, 0.1));
        carve(&mut slow, &BrushStroke::new(center, 0.2, 1.0, 0.01));
        // A longer dt digs strictly deeper at the brush center.
        let cx = 5;
        assert!(fast.distance_at(cx, 5, cx) > slow.distance_at(cx, 5, cx));
    }
}
