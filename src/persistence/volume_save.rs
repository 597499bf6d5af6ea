//! Volume wire format.
//!
//! Layout: magic `SVOL`, format version (u32 LE), codec byte, resolution
//! X/Y/Z (u32 LE each), then the codec-compressed level-0 grid as
//! little-endian f32s. Resolution or payload-size disagreement is a hard
//! load failure - mismatched bytes are never truncated or reinterpreted.
//! Headerless legacy files (a bare raw grid of exactly the configured
//! size) are still accepted, with a warning.

use log::{info, warn};

use super::compression::{compress, decompress, Codec};
use super::{PersistenceError, PersistenceResult};
use crate::config::TerrainConfig;
use crate::constants::save::{VOLUME_FORMAT_VERSION, VOLUME_MAGIC};
use crate::volume::{regenerate_mips, DistanceVolume};

/// Magic + version + codec + resolution.
const HEADER_LEN: usize = 4 + 4 + 1 + 12;

/// Serialize level 0 of the volume.
pub fn save_volume(volume: &DistanceVolume, codec: Codec) -> PersistenceResult<Vec<u8>> {
    let res = volume.resolution();
    let grid = volume.level0();

    let mut raw = Vec::with_capacity(grid.len() * 4);
    for &value in grid {
        raw.extend_from_slice(&value.to_le_bytes());
    }
    let payload = compress(codec, &raw)?;

    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(VOLUME_MAGIC);
    out.extend_from_slice(&VOLUME_FORMAT_VERSION.to_le_bytes());
    out.push(codec.to_byte());
    out.extend_from_slice(&res.x.to_le_bytes());
    out.extend_from_slice(&res.y.to_le_bytes());
    out.extend_from_slice(&res.z.to_le_bytes());
    out.extend_from_slice(&payload);

    info!(
        "saved {}x{}x{} volume: {} voxels -> {} bytes ({:?})",
        res.x,
        res.y,
        res.z,
        grid.len(),
        out.len(),
        codec
    );
    Ok(out)
}

/// Deserialize a volume for the given configuration. The header's
/// resolution must match the configured one exactly; mips are rebuilt from
/// the loaded grid before returning.
pub fn load_volume(bytes: &[u8], config: &TerrainConfig) -> PersistenceResult<DistanceVolume> {
    let mut volume = DistanceVolume::new(config)
        .map_err(|e| PersistenceError::Corrupted(format!("invalid target config: {}", e)))?;
    let res = volume.resolution();
    let expected_voxels = (res.x * res.y * res.z) as usize;

    if bytes.len() < HEADER_LEN || &bytes[0..4] != VOLUME_MAGIC {
        return load_legacy(bytes, volume);
    }

    let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    if version != VOLUME_FORMAT_VERSION {
        return Err(PersistenceError::VersionMismatch {
            expected: VOLUME_FORMAT_VERSION,
            found: version,
        });
    }

    let codec = Codec::from_byte(bytes[8])?;
    let read_u32 = |offset: usize| {
        u32::from_le_bytes([
            bytes[offset],
            bytes[offset + 1],
            bytes[offset + 2],
            bytes[offset + 3],
        ])
    };
    let found = [read_u32(9), read_u32(13), read_u32(17)];
    if found != [res.x, res.y, res.z] {
        return Err(PersistenceError::ResolutionMismatch {
            expected: [res.x, res.y, res.z],
            found,
        });
    }

    let raw = decompress(codec, &bytes[HEADER_LEN..])?;
    if raw.len() != expected_voxels * 4 {
        return Err(PersistenceError::PayloadSize {
            expected: expected_voxels * 4,
            found: raw.len(),
        });
    }

    volume.overwrite_level0(decode_grid(&raw));
    regenerate_mips(&mut volume);
    info!(
        "loaded {}x{}x{} volume ({} bytes, {:?})",
        res.x,
        res.y,
        res.z,
        bytes.len(),
        codec
    );
    Ok(volume)
}

/// Compatibility fallback for files that predate the header: a bare,
/// uncompressed grid whose byte length matches the configured resolution
/// exactly. Anything else is corrupted.
fn load_legacy(bytes: &[u8], mut volume: DistanceVolume) -> PersistenceResult<DistanceVolume> {
    let res = volume.resolution();
    let expected = (res.x * res.y * res.z) as usize * 4;
    if bytes.len() != expected {
        return Err(PersistenceError::Corrupted(format!(
            "no volume header and size {} does not match a legacy {}x{}x{} grid",
            bytes.len(),
            res.x,
            res.y,
            res.z
        )));
    }
    warn!("loading headerless legacy volume ({} bytes)", expected);
    volume.overwrite_level0(decode_grid(bytes));
    regenerate_mips(&mut volume);
    Ok(volume)
}

fn decode_grid(raw: &[u8]) -> Vec<f32> {
    raw.chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}
