//! Headless streaming demo: builds a scene, walks a view through it and
//! reports what the terrain streamer did.

mod obj;
mod scene;

use std::error::Error;
use std::fs::File;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use isoterra_geom::{IVec3, Vec3};
use isoterra_runtime::{LogDebugSink, Terrain};
use isoterra_world::{TerrainConfig, load_config_from_path};
use simplelog::{ColorChoice, CombinedLogger, LevelFilter, TermLogger, TerminalMode, WriteLogger};

use crate::scene::SceneKind;

#[derive(Parser, Debug)]
#[command(name = "isoterra", version, about = "Stream an SDF scene into chunked meshes")]
struct Args {
    /// Terrain config (TOML). Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = SceneKind::Terrain)]
    scene: SceneKind,
    /// `[[shape]]` list (TOML) used instead of a built-in scene.
    #[arg(long)]
    shapes: Option<PathBuf>,
    #[arg(long, default_value_t = 600)]
    ticks: usize,
    /// Streaming radius in world units.
    #[arg(long, default_value_t = 96.0)]
    radius: f32,
    /// View travel per tick along +x.
    #[arg(long, default_value_t = 0.5)]
    speed: f32,
    /// Milliseconds slept between ticks.
    #[arg(long, default_value_t = 2)]
    tick_ms: u64,
    /// Fixed worker count, overriding the configured fraction.
    #[arg(long)]
    workers: Option<usize>,
    /// Also log to this file (switches to simplelog).
    #[arg(long)]
    log_file: Option<PathBuf>,
    /// Route streaming debug primitives to the log at trace level.
    #[arg(long, default_value_t = false)]
    debug_draw: bool,
    /// Write the active meshes to a Wavefront OBJ when done.
    #[arg(long)]
    dump_obj: Option<PathBuf>,
}

fn init_logging(log_file: Option<&PathBuf>) -> Result<(), Box<dyn Error>> {
    match log_file {
        Some(path) => {
            CombinedLogger::init(vec![
                TermLogger::new(
                    LevelFilter::Info,
                    simplelog::Config::default(),
                    TerminalMode::Mixed,
                    ColorChoice::Auto,
                ),
                WriteLogger::new(
                    LevelFilter::Debug,
                    simplelog::Config::default(),
                    File::create(path)?,
                ),
            ])?;
        }
        None => {
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
                .init();
        }
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_logging(args.log_file.as_ref())?;

    let cfg = match &args.config {
        Some(path) => load_config_from_path(path)?,
        None => TerrainConfig::default(),
    };
    let shapes = match &args.shapes {
        Some(path) => scene::load_shapes(path)?,
        None => scene::build(args.scene),
    };
    match &args.shapes {
        Some(path) => log::info!("scene from {}", path.display()),
        None => log::info!("scene {:?}", args.scene),
    }
    log::info!("radius {}, {} ticks", args.radius, args.ticks);

    let mut terrain = match args.workers {
        Some(n) => Terrain::with_workers(cfg, shapes, n.max(1))?,
        None => Terrain::new(cfg, shapes)?,
    };
    if args.debug_draw {
        terrain.set_debug_sink(Some(Box::new(LogDebugSink::default())));
    }

    let start = Instant::now();
    let mut center = Vec3::new(0.0, 8.0, 0.0);
    let mut totals = (0usize, 0usize, 0usize);
    for tick in 0..args.ticks {
        let stats = terrain.update(center, args.radius)?;
        totals.0 += stats.completed;
        totals.1 += stats.discarded;
        totals.2 += stats.evicted;
        if tick % 60 == 0 {
            log::info!(
                "tick {tick}: resident={} active={} in_flight={} queued={} cache_hits={}",
                stats.resident,
                stats.active,
                stats.in_flight,
                stats.queued,
                stats.cache_hits
            );
        }
        center.x += args.speed;
        thread::sleep(Duration::from_millis(args.tick_ms));
    }
    let last = terrain.settle(center, args.radius, 10_000)?;

    let triangles: usize = terrain
        .active_chunks()
        .filter_map(|c| c.mesh())
        .map(|m| m.build.triangle_count())
        .sum();
    log::info!(
        "done in {:.2}s: {} jobs completed, {} discarded, {} evictions; {} resident, {} active, {} triangles",
        start.elapsed().as_secs_f32(),
        totals.0 + last.completed,
        totals.1 + last.discarded,
        totals.2 + last.evicted,
        last.resident,
        last.active,
        triangles
    );
    if !terrain.diagnostics().is_empty() {
        log::warn!(
            "{} continuity violations in the last finished jobs",
            terrain.diagnostics().len()
        );
    }

    let probe = center.floor();
    log::info!(
        "voxel at view {:?}: {:?}, light {:.3}",
        probe,
        terrain.voxel(probe),
        terrain.light_at(probe)
    );
    if let Some(hit) = terrain.raycast(center + Vec3::new(0.0, 64.0, 0.0), Vec3::new(0.0, -256.0, 0.0)) {
        log::info!("ground below view at y={:.2}", hit.position.y);
    }
    let below = IVec3::new(probe.x, probe.y - 32, probe.z);
    log::debug!("voxel {:?} below view: {:?}", below, terrain.voxel(below));

    if let Some(path) = &args.dump_obj {
        let written = obj::write_obj(path, terrain.active_chunks())?;
        log::info!("wrote {} triangles to {}", written, path.display());
    }
    Ok(())
}
