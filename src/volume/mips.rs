//! Conservative mip pyramid regeneration.
//!
//! Each coarse voxel takes the minimum of its (up to 8) children and then
//! backs off by `voxel_size_at(level) * sqrt(3)/2`. The correction covers
//! the worst-case offset between a parent sample position and the child
//! whose value it inherited, so a coarse sample can never claim the
//! surface is closer than it truly is. Without it the hierarchical marcher
//! could leap straight through a thin wall.

use rayon::prelude::*;

use super::DistanceVolume;
use crate::constants::field::MIP_CORRECTION_FACTOR;

/// Rebuild every mip level from level 0 upward. Must run after any edit to
/// level 0 before the pyramid is read again; the session enforces this by
/// doing carve + regenerate under one write guard.
pub fn regenerate_mips(volume: &mut DistanceVolume) {
    let voxel_size = volume.voxel_size();
    for k in 1..volume.levels.len() {
        let (built, rest) = volume.levels.split_at_mut(k);
        let src = &built[k - 1];
        let dst = &mut rest[0];

        let correction = voxel_size * (1u32 << k) as f32 * MIP_CORRECTION_FACTOR;
        let (dx, dy) = (dst.dims.x, dst.dims.y);
        let sdims = src.dims;
        let slab = (dx * dy) as usize;

        dst.data
            .par_chunks_mut(slab)
            .enumerate()
            .for_each(|(z, slab_data)| {
                let z = z as u32;
                for y in 0..dy {
                    for x in 0..dx {
                        let mut min = f32::MAX;
                        // Child window, clamped per axis for odd parents.
                        let x1 = (2 * x + 1).min(sdims.x - 1);
                        let y1 = (2 * y + 1).min(sdims.y - 1);
                        let z1 = (2 * z + 1).min(sdims.z - 1);
                        for cz in (2 * z)..=z1 {
                            for cy in (2 * y)..=y1 {
                                for cx in (2 * x)..=x1 {
                                    min = min.min(src.data[src.index(cx, cy, cz)]);
                                }
                            }
                        }
                        slab_data[(y * dx + x) as usize] = min - correction;
                    }
                }
            });
    }
}
