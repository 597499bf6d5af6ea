//! GPU evaluation path.
//!
//! When the distance volume lives in GPU memory, full-scene queries cross
//! an execution domain: the caller submits a batch of points, a compute
//! dispatch evaluates scene distance per point, and the results come back
//! through a non-blocking completion channel. The WGSL kernel in
//! `shaders/scene_distance.wgsl` mirrors the CPU primitives and noise in
//! `crate::sdf` exactly; the two evaluators must not drift.

pub mod params;
pub mod query_dispatch;

pub use params::{GeometryParams, SceneParams};
pub use query_dispatch::GpuQueryDispatch;
