//! Stratigraphy: the ordered stack of material layers that defines the
//! baked terrain before any digging.
//!
//! The authored layer list is youngest-to-oldest. Bands are stacked
//! contiguously downward from the configured surface Y by a one-time
//! placement pass; fills (cuts, ellipsoidal deposits) carry their own world
//! placement. Material lookup follows Harris matrix ordering: fills
//! youngest-first, then the youngest containing band, then the default
//! substrate.

use glam::Vec3;
use log::info;
use serde::{Deserialize, Serialize};

use crate::constants::field::FAR_DISTANCE;
use crate::sdf::GeometryDescriptor;

/// Visual and gameplay attributes of one stratum. `hardness` is carried for
/// the tool layer; the terrain core never reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    /// Linear RGBA.
    pub color: [f32; 4],
    pub hardness: f32,
}

impl Material {
    pub fn new(name: impl Into<String>, color: [f32; 4], hardness: f32) -> Self {
        Self {
            name: name.into(),
            color,
            hardness,
        }
    }
}

/// Authored geometry of one layer, before band stacking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LayerGeometry {
    /// Horizontal band of the given thickness; placed by the stacking pass.
    DepthBand { thickness: f32 },
    /// Band with noise-displaced faces.
    NoisyDepthBand {
        thickness: f32,
        amplitude: f32,
        frequency: f32,
        seed: u32,
    },
    /// Cylinder dug down from `center`, an intrusive feature.
    Cut {
        center: [f32; 3],
        radius: f32,
        depth: f32,
    },
    /// Ellipsoidal deposit at an explicit placement.
    Ellipsoid { center: [f32; 3], radii: [f32; 3] },
}

/// One authored stratigraphy entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer {
    pub material: Material,
    pub geometry: LayerGeometry,
}

/// A layer after the stacking pass: world-space geometry, original order
/// preserved.
#[derive(Debug, Clone)]
pub struct PlacedLayer {
    pub material: Material,
    pub geometry: GeometryDescriptor,
}

impl PlacedLayer {
    pub fn is_fill(&self) -> bool {
        self.geometry.is_fill()
    }
}

/// The immutable, stacked layer list plus the default substrate.
#[derive(Debug, Clone)]
pub struct LayerStack {
    /// Youngest to oldest, same order as authored.
    placed: Vec<PlacedLayer>,
    default_substrate: Material,
}

impl LayerStack {
    /// Run the stacking pass: bands walk a cursor downward from
    /// `surface_y` (each band's top is the previous band's bottom), fills
    /// keep their explicit placement.
    pub fn new(layers: Vec<Layer>, default_substrate: Material, surface_y: f32) -> Self {
        let mut cursor = surface_y;
        let mut placed = Vec::with_capacity(layers.len());
        for layer in layers {
            let geometry = match layer.geometry {
                LayerGeometry::DepthBand { thickness } => {
                    let top = cursor;
                    cursor -= thickness;
                    GeometryDescriptor::Band {
                        top,
                        bottom: cursor,
                    }
                }
                LayerGeometry::NoisyDepthBand {
                    thickness,
                    amplitude,
                    frequency,
                    seed,
                } => {
                    let top = cursor;
                    cursor -= thickness;
                    GeometryDescriptor::NoisyBand {
                        top,
                        bottom: cursor,
                        amplitude,
                        frequency,
                        seed,
                    }
                }
                LayerGeometry::Cut {
                    center,
                    radius,
                    depth,
                } => GeometryDescriptor::Cut {
                    center: Vec3::from(center),
                    radius,
                    depth,
                },
                LayerGeometry::Ellipsoid { center, radii } => GeometryDescriptor::Ellipsoid {
                    center: Vec3::from(center),
                    radii: Vec3::from(radii),
                },
            };
            placed.push(PlacedLayer {
                material: layer.material,
                geometry,
            });
        }
        info!(
            "stacked {} layers, band column reaches down to y={:.3}",
            placed.len(),
            cursor
        );
        Self {
            placed,
            default_substrate,
        }
    }

    /// Combined analytical distance: CSG union over every placed layer.
    /// This ignores carve state by construction.
    pub fn distance(&self, p: Vec3) -> f32 {
        self.placed
            .iter()
            .fold(FAR_DISTANCE, |d, layer| d.min(layer.geometry.distance(p)))
    }

    /// Material occupying `p` before any carving.
    ///
    /// Fills are checked youngest to oldest (discrete intrusions win against
    /// everything they cut into). Among bands the youngest one containing
    /// `p` wins; noisy bands with different seeds overlap at their shared
    /// boundary, and the more recent deposit owns that overlap. Outside
    /// every layer the default substrate answers.
    pub fn resolve_material(&self, p: Vec3) -> &Material {
        for layer in self.placed.iter().filter(|l| l.is_fill()) {
            if layer.geometry.distance(p) < 0.0 {
                return &layer.material;
            }
        }
        // `placed` is youngest to oldest, so the first containing band is
        // the youngest.
        for layer in self.placed.iter().filter(|l| !l.is_fill()) {
            if layer.geometry.distance(p) < 0.0 {
                return &layer.material;
            }
        }
        &self.default_substrate
    }

    pub fn placed(&self) -> &[PlacedLayer] {
        &self.placed
    }

    pub fn default_substrate(&self) -> &Material {
        &self.default_substrate
    }

    pub fn is_empty(&self) -> bool {
        self.placed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn material(name: &str) -> Material {
        Material::new(name, [0.5, 0.5, 0.5, 1.0], 1.0)
    }

    fn band(name: &str, thickness: f32) -> Layer {
        Layer {
            material: material(name),
            geometry: LayerGeometry::DepthBand { thickness },
        }
    }

    #[test]
    fn band_stacking_is_deterministic() {
        let stack = LayerStack::new(
            vec![band("topsoil", 0.3), band("subsoil", 0.5)],
            material("bedrock"),
            0.0,
        );
        let placed = stack.placed();
        assert_eq!(placed.len(), 2);
        match placed[0].geometry {
            GeometryDescriptor::Band { top, bottom } => {
                assert_relative_eq!(top, 0.0);
                assert_relative_eq!(bottom, -0.3);
            }
            _ => panic!("expected band"),
        }
        match placed[1].geometry {
            GeometryDescriptor::Band { top, bottom } => {
                assert_relative_eq!(top, -0.3);
                assert_relative_eq!(bottom, -0.8);
            }
            _ => panic!("expected band"),
        }
    }

    #[test]
    fn fill_wins_over_band_at_the_same_point() {
        let fill = Layer {
            material: material("pit_fill"),
            geometry: LayerGeometry::Cut {
                center: [0.0, 0.0, 0.0],
                radius: 1.0,
                depth: 1.0,
            },
        };
        let stack = LayerStack::new(vec![fill, band("topsoil", 1.0)], material("bedrock"), 0.0);
        // This point lies inside both the cut and the band.
        let p = Vec3::new(0.0, -0.5, 0.0);
        assert_eq!(stack.resolve_material(p).name, "pit_fill");
    }

    #[test]
    fn each_band_resolves_within_its_own_span() {
        let stack = LayerStack::new(
            vec![band("topsoil", 0.3), band("subsoil", 0.5)],
            material("bedrock"),
            0.0,
        );
        assert_eq!(
            stack.resolve_material(Vec3::new(0.0, -0.1, 0.0)).name,
            "topsoil"
        );
        assert_eq!(
            stack.resolve_material(Vec3::new(0.0, -0.5, 0.0)).name,
            "subsoil"
        );
    }

    #[test]
    fn younger_band_wins_where_noisy_bands_overlap() {
        // Two stacked noisy bands with different seeds overlap around
        // their shared boundary wherever the lower band's face offset
        // exceeds the upper one's. The younger deposit owns the overlap.
        let noisy = |name: &str, seed: u32| Layer {
            material: material(name),
            geometry: LayerGeometry::NoisyDepthBand {
                thickness: 0.5,
                amplitude: 0.2,
                frequency: 0.7,
                seed,
            },
        };
        let stack = LayerStack::new(
            vec![noisy("young", 1), noisy("old", 2)],
            material("bedrock"),
            0.0,
        );
        let placed = stack.placed();

        let mut overlaps = 0;
        for i in 0..200 {
            let x = i as f32 * 0.05;
            for j in 0..=40 {
                let p = Vec3::new(x, -0.3 - j as f32 * 0.01, 0.0);
                if placed[0].geometry.distance(p) < 0.0
                    && placed[1].geometry.distance(p) < 0.0
                {
                    assert_eq!(
                        stack.resolve_material(p).name,
                        "young",
                        "older band claimed overlap at {:?}",
                        p
                    );
                    overlaps += 1;
                }
            }
        }
        assert!(overlaps > 0, "no overlap region sampled");
    }

    #[test]
    fn default_substrate_outside_every_layer() {
        let stack = LayerStack::new(vec![band("topsoil", 0.3)], material("bedrock"), 0.0);
        assert_eq!(
            stack.resolve_material(Vec3::new(0.0, -5.0, 0.0)).name,
            "bedrock"
        );
    }

    #[test]
    fn union_distance_is_min_over_layers() {
        let stack = LayerStack::new(
            vec![band("topsoil", 0.3), band("subsoil", 0.5)],
            material("bedrock"),
            0.0,
        );
        // Inside the second band but not the first.
        let p = Vec3::new(0.0, -0.5, 0.0);
        assert!(stack.distance(p) < 0.0);
        // Above the surface: positive, equal to height above the top band.
        assert_relative_eq!(stack.distance(Vec3::new(0.0, 0.4, 0.0)), 0.4);
    }
}
