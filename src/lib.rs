//! Volumetric SDF terrain core for an archaeological dig simulation.
//!
//! The ground is a signed distance field stored in a dense 3D grid with a
//! conservative mip pyramid. Stratigraphic layers are baked into the grid
//! once, player digging carves it in real time, and a hierarchical ray
//! marcher plus point/segment queries read it back for rendering, tool
//! contact, and grounding.

pub mod config;
pub mod constants;
pub mod gpu;
pub mod march;
pub mod persistence;
pub mod query;
pub mod sdf;
pub mod session;
pub mod strata;
pub mod volume;

pub use config::{ConfigError, MarchConfig, TerrainConfig};
pub use march::{march, surface_normal, MarchResult, Ray};
pub use persistence::{load_volume, save_volume, Codec, PersistenceError, PersistenceResult};
pub use query::{QueryError, SurfaceHit};
pub use sdf::GeometryDescriptor;
pub use session::{DigSession, SharedVolume};
pub use strata::{Layer, LayerGeometry, LayerStack, Material};
pub use volume::{BrushStroke, DistanceVolume};
