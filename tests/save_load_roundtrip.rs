//! Save/restore reliability through the session API: bit-exact round
//! trips, hard mismatch failures, the legacy fallback path, and real
//! file I/O.

use std::fs;

use glam::Vec3;
use tempfile::TempDir;

use strata_engine::{
    load_volume, save_volume, BrushStroke, Codec, DigSession, Layer, LayerGeometry, Material,
    PersistenceError, Ray, TerrainConfig,
};

fn dig_site_config() -> TerrainConfig {
    TerrainConfig {
        world_origin: [-0.5, -0.6, -0.5],
        world_extent: [1.0, 1.0, 1.0],
        voxel_size: 0.1,
        surface_y: 0.0,
        ..Default::default()
    }
}

fn carved_session() -> DigSession {
    let session = DigSession::new(
        dig_site_config(),
        vec![Layer {
            material: Material::new("topsoil", [0.4, 0.3, 0.2, 1.0], 1.0),
            geometry: LayerGeometry::DepthBand { thickness: 1.0 },
        }],
        Material::new("bedrock", [0.3, 0.3, 0.3, 1.0], 5.0),
    )
    .expect("valid config");
    session.bake();
    session.carve(&BrushStroke::new(Vec3::new(0.1, 0.0, -0.1), 0.3, 0.5, 0.2));
    session
}

fn level0_bits(session: &DigSession) -> Vec<u32> {
    let volume = session.volume();
    let volume = volume.read();
    volume.level0().iter().map(|v| v.to_bits()).collect()
}

#[test]
fn session_round_trip_is_bit_exact_for_every_codec() {
    let carved = carved_session();
    let carved_bits = level0_bits(&carved);

    for codec in [Codec::None, Codec::Zlib, Codec::Lz4] {
        let bytes = carved.save(codec).expect("save");

        // Restore into a fresh, never-carved session.
        let fresh = carved_session_blank();
        fresh.restore(&bytes).expect("restore");
        assert_eq!(
            level0_bits(&fresh),
            carved_bits,
            "level 0 drifted through {:?}",
            codec
        );

        // The restored pyramid answers rays exactly like the original.
        let ray = Ray::new(Vec3::new(0.1, 0.35, -0.1), Vec3::NEG_Y);
        let before = carved.march(&ray);
        let after = fresh.march(&ray);
        assert!(before.is_hit() && after.is_hit());
        assert_eq!(
            before.position().to_array().map(f32::to_bits),
            after.position().to_array().map(f32::to_bits)
        );
    }
}

/// Same site, nothing baked or carved yet.
fn carved_session_blank() -> DigSession {
    DigSession::new(
        dig_site_config(),
        vec![Layer {
            material: Material::new("topsoil", [0.4, 0.3, 0.2, 1.0], 1.0),
            geometry: LayerGeometry::DepthBand { thickness: 1.0 },
        }],
        Material::new("bedrock", [0.3, 0.3, 0.3, 1.0], 5.0),
    )
    .expect("valid config")
}

#[test]
fn restore_into_mismatched_resolution_fails_and_leaves_volume_untouched() {
    let carved = carved_session();
    let bytes = carved.save(Codec::Lz4).expect("save");

    // Half the voxel size doubles the resolution. Loading must refuse.
    let other = DigSession::new(
        TerrainConfig {
            voxel_size: 0.05,
            ..dig_site_config()
        },
        vec![],
        Material::new("bedrock", [0.3, 0.3, 0.3, 1.0], 5.0),
    )
    .expect("valid config");
    other.bake();
    let before = level0_bits(&other);

    let err = other.restore(&bytes).expect_err("resolution mismatch");
    assert!(matches!(
        err,
        PersistenceError::ResolutionMismatch {
            expected: [20, 20, 20],
            found: [10, 10, 10],
        }
    ));
    assert_eq!(level0_bits(&other), before, "failed restore must not write");
}

#[test]
fn tampered_version_field_is_rejected() {
    let carved = carved_session();
    let mut bytes = carved.save(Codec::None).expect("save");
    bytes[4..8].copy_from_slice(&99u32.to_le_bytes());

    let err = carved.restore(&bytes).expect_err("version mismatch");
    assert!(matches!(
        err,
        PersistenceError::VersionMismatch { found: 99, .. }
    ));
}

#[test]
fn headerless_legacy_grid_still_loads() {
    let carved = carved_session();
    let carved_bits = level0_bits(&carved);

    // A legacy file is the bare level-0 grid, little-endian, no header.
    let legacy: Vec<u8> = {
        let volume = carved.volume();
        let volume = volume.read();
        volume
            .level0()
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect()
    };

    let config = dig_site_config();
    let loaded = load_volume(&legacy, &config).expect("legacy load");
    let loaded_bits: Vec<u32> = loaded.level0().iter().map(|v| v.to_bits()).collect();
    assert_eq!(loaded_bits, carved_bits);
    assert!(loaded.mip_count() > 1, "pyramid must be rebuilt on load");

    // One byte short and it is no longer a plausible legacy grid.
    let truncated = &legacy[..legacy.len() - 1];
    assert!(matches!(
        load_volume(truncated, &config),
        Err(PersistenceError::Corrupted(_))
    ));
}

#[test]
fn round_trip_through_an_actual_file() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("site.svol");

    let carved = carved_session();
    fs::write(&path, carved.save(Codec::Zlib).expect("save")).expect("write");

    let bytes = fs::read(&path).expect("read");
    let loaded = load_volume(&bytes, &dig_site_config()).expect("load");
    let volume = carved.volume();
    let volume = volume.read();
    assert_eq!(loaded.level0(), volume.level0());
}

#[test]
fn truncated_payload_is_a_hard_error() {
    let carved = carved_session();
    let bytes = carved.save(Codec::None).expect("save");

    // Chop the uncompressed payload short: size check must fire.
    let short = &bytes[..bytes.len() - 64];
    assert!(matches!(
        load_volume(short, &dig_site_config()),
        Err(PersistenceError::PayloadSize { .. })
    ));

    let volume = carved.volume();
    let volume = volume.read();
    let saved_again = save_volume(&volume, Codec::None).expect("save");
    assert_eq!(saved_again, bytes, "saving twice must be deterministic");
}
