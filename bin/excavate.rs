//! Standalone excavation demo: bake a small dig site, carve a trench,
//! march a ray grid over it, and round-trip the volume through the save
//! format. Prints a crude top-down depth readout.

use anyhow::Result;
use glam::Vec3;
use log::info;

use strata_engine::gpu::GpuQueryDispatch;
use strata_engine::{
    BrushStroke, Codec, DigSession, Layer, LayerGeometry, Material, Ray, TerrainConfig,
};

fn layers() -> Vec<Layer> {
    vec![
        Layer {
            material: Material::new("topsoil", [0.36, 0.27, 0.17, 1.0], 0.8),
            geometry: LayerGeometry::NoisyDepthBand {
                thickness: 0.4,
                amplitude: 0.08,
                frequency: 0.9,
                seed: 17,
            },
        },
        Layer {
            material: Material::new("clay", [0.55, 0.38, 0.23, 1.0], 1.6),
            geometry: LayerGeometry::DepthBand { thickness: 0.7 },
        },
        Layer {
            material: Material::new("pit_fill", [0.30, 0.30, 0.24, 1.0], 1.0),
            geometry: LayerGeometry::Cut {
                center: [1.0, 0.0, 1.0],
                radius: 0.5,
                depth: 0.8,
            },
        },
    ]
}

fn main() -> Result<()> {
    env_logger::init();

    let config = TerrainConfig {
        world_origin: [-2.0, -2.0, -2.0],
        world_extent: [4.0, 4.0, 4.0],
        voxel_size: 0.05,
        surface_y: 0.0,
        ..Default::default()
    };
    let session = DigSession::new(
        config,
        layers(),
        Material::new("bedrock", [0.42, 0.42, 0.45, 1.0], 4.0),
    )?;
    session.bake();

    // Dig a short trench with a softened brush.
    for step in 0..12 {
        let x = -0.8 + step as f32 * 0.1;
        session.carve(&BrushStroke::new(
            Vec3::new(x, 0.0, 0.0),
            0.25,
            2.0,
            0.016,
        ));
    }

    // Top-down depth readout over a 24x24 ray grid.
    println!("surface depth map (. = untouched, digits = depth in dm):");
    for row in 0..24 {
        let mut line = String::new();
        for col in 0..24 {
            let x = -1.8 + col as f32 * 0.15;
            let z = -1.8 + row as f32 * 0.15;
            let ray = Ray::new(Vec3::new(x, 1.5, z), Vec3::NEG_Y);
            let hit = session.march_hit(&ray);
            if !hit.hit {
                line.push(' ');
            } else if hit.position.y > -0.02 {
                line.push('.');
            } else {
                let depth_dm = (-hit.position.y * 10.0).min(9.0) as u32;
                line.push(char::from_digit(depth_dm, 10).unwrap_or('9'));
            }
        }
        println!("  {}", line);
    }

    // Tool feedback at the trench center.
    let probe = session.sphere_trace(Vec3::new(0.0, 1.0, 0.0), Vec3::NEG_Y, 3.0);
    if let Some(material) = &probe.material {
        info!(
            "trench floor at y={:.3}, material '{}', normal {:?}",
            probe.position.y, material.name, probe.normal
        );
    }

    // Round-trip the carved volume through the save format.
    let saved = session.save(Codec::Lz4)?;
    info!("saved volume: {} bytes (lz4)", saved.len());
    session.restore(&saved)?;
    let after = session.sphere_trace(Vec3::new(0.0, 1.0, 0.0), Vec3::NEG_Y, 3.0);
    info!("after reload trench floor at y={:.3}", after.position.y);

    gpu_probe(&session);

    Ok(())
}

/// Evaluate a probe row through the batched GPU path when an adapter is
/// available; headless CI without one just logs and moves on.
fn gpu_probe(session: &DigSession) {
    let (device, queue) = match GpuQueryDispatch::request_device() {
        Ok(pair) => pair,
        Err(e) => {
            info!("gpu probe skipped: {}", e);
            return;
        }
    };
    let mut dispatch = GpuQueryDispatch::new(device, queue, session.config(), session.stack());
    {
        let volume = session.volume();
        let volume = volume.read();
        dispatch.upload_volume(&volume);
    }

    let points: Vec<Vec3> = (0..8)
        .map(|i| Vec3::new(-0.8 + i as f32 * 0.2, -0.1, 0.0))
        .collect();
    if let Err(e) = dispatch.submit(&points) {
        info!("gpu probe submit failed: {}", e);
        return;
    }
    for _ in 0..2000 {
        match dispatch.try_recv() {
            Some(Ok(distances)) => {
                info!("gpu probe distances along the trench: {:?}", distances);
                return;
            }
            Some(Err(e)) => {
                info!("gpu probe readback failed: {}", e);
                return;
            }
            None => std::thread::sleep(std::time::Duration::from_millis(1)),
        }
    }
    info!("gpu probe timed out");
}
