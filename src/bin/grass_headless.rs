//! Headless grass run: procedural terrain, orbiting camera, draw statistics.
//!
//! Usage: cargo run --release --bin grass_headless -- [OPTIONS]
//!
//! Options:
//!   --config <PATH>       Load GrassConfig from JSON (defaults otherwise)
//!   --save-config <PATH>  Write the effective config as JSON and continue
//!   --mask <PATH>         Placement mask image (dark = grass); procedural if absent
//!   --heightmap <PATH>    Grayscale heightmap image; fBm noise if absent
//!   --size <CELLS>        Override terrain_dimension
//!   --chunks <N>          Override chunks_per_side
//!   --seed <SEED>         Override placement / terrain seed
//!   --frames <N>          Frames to simulate (default: 120)

use std::time::{Duration, Instant};

use sward::core::camera::Camera;
use sward::core::time::FrameClock;
use sward::core::{logging, Result};
use sward::grass::{GrassConfig, GrassSubsystem, TerrainInputs};
use sward::render::GpuContext;
use sward::terrain::{Heightmap, HeightmapParams, PlacementMask, ReferencePoint};

fn main() {
    logging::init();

    if let Err(e) = run() {
        log::error!("grass_headless failed: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    let mut config = match parse_str_arg(&args, "--config") {
        Some(path) => GrassConfig::from_json_file(&path)?,
        None => GrassConfig::default(),
    };
    if let Some(size) = parse_u32_arg(&args, "--size") {
        config.terrain_dimension = size;
    }
    if let Some(chunks) = parse_u32_arg(&args, "--chunks") {
        config.chunks_per_side = chunks;
    }
    if let Some(seed) = parse_u32_arg(&args, "--seed") {
        config.seed = seed;
    }
    config.validate()?;
    if let Some(path) = parse_str_arg(&args, "--save-config") {
        config.save_json_file(&path)?;
        log::info!("Config written to {}", path);
    }
    let frames = parse_u32_arg(&args, "--frames").unwrap_or(120);

    let dimension = config.terrain_dimension;
    let heightmap = match parse_str_arg(&args, "--heightmap") {
        Some(path) => Heightmap::load(&path, dimension)?,
        None => Heightmap::generate(
            dimension,
            &HeightmapParams {
                seed: config.seed,
                ..Default::default()
            },
        ),
    };
    let mask = match parse_str_arg(&args, "--mask") {
        Some(path) => PlacementMask::load(&path, dimension, config.mask_threshold)?,
        // Grass below two thirds of the height range
        None => PlacementMask::from_fn(dimension, |x, z| heightmap.get(x, z) < 0.66),
    };
    log::info!(
        "Terrain {}x{} cells, {} placeable",
        dimension,
        dimension,
        mask.count()
    );

    let mut marker = ReferencePoint::default();
    if let Some(ground) = marker.update(&heightmap, &config) {
        log::info!("Reference point at {:?} (ground {:.2})", marker.position, ground);
    }

    let gpu = pollster::block_on(GpuContext::headless())?;
    let start = Instant::now();
    let mut grass = GrassSubsystem::initialize(&gpu, config.clone(), TerrainInputs { mask, heightmap })?;
    log::info!("Initialized in {:.1} ms", start.elapsed().as_secs_f64() * 1000.0);

    let Some(field) = grass.field().copied() else {
        log::warn!("Nothing to draw");
        grass.shutdown();
        return Ok(());
    };
    let center = field.bounds.center();
    let radius = field.bounds.size().x * 0.6;

    let mut clock = FrameClock::new();
    let mut totals = (0u64, 0u64, 0u64);

    for frame in 0..frames {
        clock.advance(Duration::from_millis(16));
        let angle = clock.elapsed_secs() * 0.25;
        let camera = Camera::orbit(center, radius, 20.0, angle);

        let draws = grass.tick(&camera.state(), clock.elapsed_secs())?;
        totals.0 += draws.full_detail as u64;
        totals.1 += draws.lod as u64;
        totals.2 += draws.skipped as u64;

        if frame % 30 == 0 {
            log::info!(
                "Frame {}: {} draws ({} full, {} lod)",
                frame,
                draws.len(),
                draws.full_detail,
                draws.lod
            );
        }
    }
    gpu.device
        .poll(wgpu::PollType::Wait { submission_index: None, timeout: None })
        .map_err(|e| sward::core::Error::Gpu(e.to_string()))?;

    log::info!(
        "{} frames ({:.1}s simulated): {} full-detail draws, {} lod draws, {} skipped",
        clock.frame_count(),
        clock.elapsed_secs(),
        totals.0,
        totals.1,
        totals.2
    );
    if let Some(stats) = grass.shutdown() {
        log::info!("Released {} resources from {} chunks", stats.resources, stats.chunks);
    }
    Ok(())
}

fn parse_u32_arg(args: &[String], flag: &str) -> Option<u32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_str_arg(args: &[String], flag: &str) -> Option<String> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}
