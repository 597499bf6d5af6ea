//! World-space geometry variants shared by the CPU and GPU evaluators.

use glam::Vec3;

use super::noise::fbm_2d;
use super::primitives::{sd_band, sd_cut, sd_ellipsoid};

/// A placed stratigraphy shape: the closed set of geometry variants the
/// engine evaluates. Bands arrive here already stacked into absolute
/// top/bottom Y levels by [`crate::strata::LayerStack`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeometryDescriptor {
    /// Horizontal band between two Y levels.
    Band { top: f32, bottom: f32 },
    /// Band whose faces are displaced per column by coherent noise.
    NoisyBand {
        top: f32,
        bottom: f32,
        amplitude: f32,
        frequency: f32,
        seed: u32,
    },
    /// Vertical cylinder dug `depth` down from `center`.
    Cut { center: Vec3, radius: f32, depth: f32 },
    /// Ellipsoidal deposit (approximate distance, see `sd_ellipsoid`).
    Ellipsoid { center: Vec3, radii: Vec3 },
}

impl GeometryDescriptor {
    /// Signed distance to this shape. Negative inside solid.
    pub fn distance(&self, p: Vec3) -> f32 {
        match *self {
            Self::Band { top, bottom } => sd_band(p, top, bottom),
            Self::NoisyBand {
                top,
                bottom,
                amplitude,
                frequency,
                seed,
            } => {
                let offset = amplitude * fbm_2d(p.x * frequency, p.z * frequency, seed);
                sd_band(p, top + offset, bottom + offset)
            }
            Self::Cut {
                center,
                radius,
                depth,
            } => sd_cut(p, center, radius, depth),
            Self::Ellipsoid { center, radii } => sd_ellipsoid(p, center, radii),
        }
    }

    /// Bands are stacked deposits; cuts and ellipsoids are discrete fills.
    pub fn is_fill(&self) -> bool {
        matches!(self, Self::Cut { .. } | Self::Ellipsoid { .. })
    }
}
