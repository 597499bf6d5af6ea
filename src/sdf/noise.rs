//! Deterministic 2-D value noise for noisy depth bands.
//!
//! The band faces are displaced per XZ column, so the noise only ever needs
//! two dimensions. The lattice hash is pure integer arithmetic, which is
//! what lets scene_distance.wgsl evaluate the identical fractal on the GPU;
//! both sides were a long-standing source of drift when they approximated
//! each other, so any change here must be mirrored in the shader.

use crate::constants::noise::{GAIN, LACUNARITY, OCTAVES};

/// Integer lattice hash, mapped to [0, 1].
#[inline]
fn hash_2d(ix: i32, iz: i32, seed: u32) -> f32 {
    let mut h = (ix as u32)
        .wrapping_mul(0x8da6_b343)
        .wrapping_add((iz as u32).wrapping_mul(0xd816_3841))
        .wrapping_add(seed.wrapping_mul(0xcb1a_b31f));
    h ^= h >> 13;
    h = h.wrapping_mul(0x7feb_352d);
    h ^= h >> 16;
    (h & 0x00ff_ffff) as f32 / 16_777_215.0
}

/// Single-octave value noise in [-1, 1], smoothstep-interpolated between
/// lattice corners.
pub fn value_noise_2d(x: f32, z: f32, seed: u32) -> f32 {
    let ix = x.floor();
    let iz = z.floor();
    let fx = x - ix;
    let fz = z - iz;
    let ix = ix as i32;
    let iz = iz as i32;

    let ux = fx * fx * (3.0 - 2.0 * fx);
    let uz = fz * fz * (3.0 - 2.0 * fz);

    let c00 = hash_2d(ix, iz, seed);
    let c10 = hash_2d(ix.wrapping_add(1), iz, seed);
    let c01 = hash_2d(ix, iz.wrapping_add(1), seed);
    let c11 = hash_2d(ix.wrapping_add(1), iz.wrapping_add(1), seed);

    let x0 = c00 + (c10 - c00) * ux;
    let x1 = c01 + (c11 - c01) * ux;
    let v = x0 + (x1 - x0) * uz;
    v * 2.0 - 1.0
}

/// Three-octave fractal in [-1, 1].
pub fn fbm_2d(x: f32, z: f32, seed: u32) -> f32 {
    let mut sum = 0.0;
    let mut amplitude = 1.0;
    let mut frequency = 1.0;
    let mut norm = 0.0;
    for octave in 0..OCTAVES {
        sum += amplitude * value_noise_2d(x * frequency, z * frequency, seed.wrapping_add(octave));
        norm += amplitude;
        amplitude *= GAIN;
        frequency *= LACUNARITY;
    }
    sum / norm
}
