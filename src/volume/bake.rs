//! Baking: CSG-union the analytical layer stack into the volume.

use std::time::Instant;

use glam::Vec3;
use log::info;
use rayon::prelude::*;

use super::{mips::regenerate_mips, DistanceVolume};
use crate::constants::field::FAR_DISTANCE;
use crate::strata::LayerStack;

/// Evaluate every layer against every voxel center and write the union
/// into level 0, then rebuild the pyramid. After this the volume stores the
/// fully composed scene SDF; carving edits the same field.
///
/// Union is commutative, so the grid is reset to the far-air sentinel and
/// each voxel takes `min` over all layers in one pass. Z slabs are
/// independent and run in parallel.
pub fn bake(volume: &mut DistanceVolume, stack: &LayerStack) {
    let start = Instant::now();
    let dims = volume.resolution();
    let origin = volume.origin();
    let voxel_size = volume.voxel_size();
    let slab = (dims.x * dims.y) as usize;

    volume
        .level0_mut()
        .par_chunks_mut(slab)
        .enumerate()
        .for_each(|(z, slab_data)| {
            for y in 0..dims.y {
                for x in 0..dims.x {
                    let center = origin
                        + (Vec3::new(x as f32, y as f32, z as f32) + Vec3::splat(0.5))
                            * voxel_size;
                    let mut d = FAR_DISTANCE;
                    for layer in stack.placed() {
                        d = d.min(layer.geometry.distance(center));
                    }
                    slab_data[(y * dims.x + x) as usize] = d;
                }
            }
        });

    regenerate_mips(volume);
    info!(
        "baked {} layers into {}x{}x{} volume in {:.1?}",
        stack.placed().len(),
        dims.x,
        dims.y,
        dims.z,
        start.elapsed()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TerrainConfig;
    use crate::strata::{Layer, LayerGeometry, Material};

    fn config() -> TerrainConfig {
        TerrainConfig {
            world_origin: [0.0, -1.0, 0.0],
            world_extent: [1.0, 2.0, 1.0],
            voxel_size: 0.1,
            ..Default::default()
        }
    }

    fn substrate() -> Material {
        Material::new("bedrock", [0.3, 0.3, 0.3, 1.0], 5.0)
    }

    fn band(thickness: f32) -> Layer {
        Layer {
            material: Material::new("soil", [0.4, 0.3, 0.2, 1.0], 1.0),
            geometry: LayerGeometry::DepthBand { thickness },
        }
    }

    #[test]
    fn baked_band_is_solid_inside_air_above() {
        let mut volume = DistanceVolume::new(&config()).unwrap();
        let stack = LayerStack::new(vec![band(0.5)], substrate(), 0.0);
        bake(&mut volume, &stack);

        let inside = glam::Vec3::new(0.5, -0.25, 0.5);
        let above = glam::Vec3::new(0.5, 0.5, 0.5);
        assert!(volume.sample_trilinear(inside) < 0.0);
        assert!(volume.sample_trilinear(above) > 0.0);
    }

    #[test]
    fn union_is_monotone_in_the_layer_list() {
        let mut one = DistanceVolume::new(&config()).unwrap();
        let mut two = DistanceVolume::new(&config()).unwrap();
        bake(&mut one, &LayerStack::new(vec![band(0.3)], substrate(), 0.0));
        bake(
            &mut two,
            &LayerStack::new(vec![band(0.3), band(0.5)], substrate(), 0.0),
        );
        for (a, b) in one.level0().iter().zip(two.level0()) {
            assert!(b <= a, "adding a layer may only move distances toward solid");
        }
    }

    #[test]
    fn bake_refreshes_the_pyramid() {
        let mut volume = DistanceVolume::new(&config()).unwrap();
        let stack = LayerStack::new(vec![band(0.5)], substrate(), 0.0);
        bake(&mut volume, &stack);
        // Some coarse voxel must have left the sentinel.
        let top = volume.mip_count() - 1;
        let dims = volume.mip_dims(top);
        let mut any_updated = false;
        for z in 0..dims.z {
            for y in 0..dims.y {
                for x in 0..dims.x {
                    if volume.mip_value(top, x, y, z) < crate::constants::field::FAR_DISTANCE {
                        any_updated = true;
                    }
                }
            }
        }
        assert!(any_updated);
    }
}
