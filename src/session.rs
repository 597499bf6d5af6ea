//! The excavation session: single-writer choke point over the distance
//! volume.
//!
//! All writes (bake, carve) and the mip regeneration that follows each
//! write happen behind one `RwLock` write guard, so readers can never
//! observe a carved-but-stale pyramid. Reads (marching, queries) take the
//! read guard and may fan out across any number of threads. Carves apply
//! in program order; there is no coalescing across the read boundary.

use std::sync::Arc;

use glam::Vec3;
use parking_lot::RwLock;

use crate::config::{ConfigError, TerrainConfig};
use crate::march::{march, surface_normal, MarchResult, Ray};
use crate::persistence::{load_volume, save_volume, Codec, PersistenceResult};
use crate::query::{self, SurfaceHit};
use crate::strata::{Layer, LayerStack, Material};
use crate::volume::{bake, carve, regenerate_mips, BrushStroke, DistanceVolume};

/// Shared handle to the distance volume. Cloned into whichever components
/// need read access; writes stay inside [`DigSession`].
pub type SharedVolume = Arc<RwLock<DistanceVolume>>;

/// One excavation site: the volume, its stratigraphy, and the authored
/// configuration.
pub struct DigSession {
    config: TerrainConfig,
    stack: LayerStack,
    volume: SharedVolume,
}

impl DigSession {
    /// Validate the config, allocate the volume, and run the band-stacking
    /// pass. The volume is all air until [`Self::bake`] runs.
    pub fn new(
        config: TerrainConfig,
        layers: Vec<Layer>,
        default_substrate: Material,
    ) -> Result<Self, ConfigError> {
        let volume = DistanceVolume::new(&config)?;
        let stack = LayerStack::new(layers, default_substrate, config.surface_y);
        Ok(Self {
            config,
            stack,
            volume: Arc::new(RwLock::new(volume)),
        })
    }

    /// Bake the layer stack into the volume (initial state, or an explicit
    /// re-bake that discards all carving).
    pub fn bake(&self) {
        let mut volume = self.volume.write();
        bake(&mut volume, &self.stack);
    }

    /// Apply one brush stroke. Carve plus mip regeneration run as one
    /// atomic step under the write guard.
    pub fn carve(&self, stroke: &BrushStroke) -> usize {
        let mut volume = self.volume.write();
        let touched = carve(&mut volume, stroke);
        if touched > 0 {
            regenerate_mips(&mut volume);
        }
        touched
    }

    /// Hierarchical march against a stable snapshot of the pyramid.
    pub fn march(&self, ray: &Ray) -> MarchResult {
        let volume = self.volume.read();
        march(&volume, ray, &self.config.march)
    }

    /// March plus normal and material resolution, the per-pixel result the
    /// renderer consumes.
    pub fn march_hit(&self, ray: &Ray) -> SurfaceHit {
        let volume = self.volume.read();
        match march(&volume, ray, &self.config.march) {
            MarchResult::Hit { position, traveled } => {
                let normal = surface_normal(&volume, position);
                // Hit points sit marginally on the air side of the
                // threshold; resolve the material just under the surface.
                let under = position - normal * (0.5 * volume.voxel_size());
                SurfaceHit {
                    hit: true,
                    position,
                    normal,
                    material: Some(self.stack.resolve_material(under).clone()),
                    traveled,
                }
            }
            MarchResult::Miss { position, traveled } => SurfaceHit::miss(position, traveled),
        }
    }

    /// Full-scene point query (sees carve state).
    pub fn query_point(&self, p: Vec3) -> SurfaceHit {
        let volume = self.volume.read();
        query::point_query(&volume, &self.stack, p, self.config.march.surface_threshold)
    }

    /// Short-range flat sphere trace (sees carve state).
    pub fn sphere_trace(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> SurfaceHit {
        let volume = self.volume.read();
        query::sphere_trace(
            &volume,
            &self.stack,
            origin,
            direction,
            max_distance,
            &self.config.march,
        )
    }

    /// Layer-only trace, blind to carving; no volume access at all.
    pub fn analytical_trace(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> SurfaceHit {
        query::analytical_trace(&self.stack, origin, direction, max_distance, &self.config.march)
    }

    /// Serialize level 0 of the volume.
    pub fn save(&self, codec: Codec) -> PersistenceResult<Vec<u8>> {
        let volume = self.volume.read();
        save_volume(&volume, codec)
    }

    /// Replace the volume from a serialized payload. Mips are regenerated
    /// as part of the load; resolution mismatches are hard errors and the
    /// live volume stays untouched on failure.
    pub fn restore(&self, bytes: &[u8]) -> PersistenceResult<()> {
        let loaded = load_volume(bytes, &self.config)?;
        *self.volume.write() = loaded;
        Ok(())
    }

    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    pub fn stack(&self) -> &LayerStack {
        &self.stack
    }

    /// Clone of the shared volume handle for read-side consumers.
    pub fn volume(&self) -> SharedVolume {
        self.volume.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strata::LayerGeometry;

    fn session() -> DigSession {
        let config = TerrainConfig {
            world_origin: [-1.0, -1.0, -1.0],
            world_extent: [2.0, 2.0, 2.0],
            voxel_size: 0.05,
            ..Default::default()
        };
        DigSession::new(
            config,
            vec![Layer {
                material: Material::new("topsoil", [0.4, 0.3, 0.2, 1.0], 1.0),
                geometry: LayerGeometry::DepthBand { thickness: 1.0 },
            }],
            Material::new("bedrock", [0.3, 0.3, 0.3, 1.0], 5.0),
        )
        .unwrap()
    }

    #[test]
    fn carve_and_march_see_a_consistent_surface() {
        let s = session();
        s.bake();
        let dig_point = Vec3::new(0.0, 0.0, 0.0);
        s.carve(&BrushStroke::new(dig_point, 0.2, 0.0, 0.0));

        let down = Ray::new(Vec3::new(0.0, 0.8, 0.0), Vec3::NEG_Y);
        let hit = s.march_hit(&down);
        assert!(hit.hit);
        // The crater floor sits roughly a brush radius below the surface.
        assert!(hit.position.y < -0.1, "y = {}", hit.position.y);
        assert_eq!(hit.material.as_ref().unwrap().name, "topsoil");
    }

    #[test]
    fn rebake_discards_carving() {
        let s = session();
        s.bake();
        let p = Vec3::new(0.0, -0.2, 0.0);
        s.carve(&BrushStroke::new(p, 0.3, 0.0, 0.0));
        assert!(!s.query_point(p).hit);
        s.bake();
        assert!(s.query_point(p).hit);
    }

    #[test]
    fn readers_share_the_volume_handle() {
        let s = session();
        s.bake();
        let handle = s.volume();
        let volume = handle.read();
        assert!(volume.sample_trilinear(Vec3::new(0.0, -0.5, 0.0)) < 0.0);
    }
}
