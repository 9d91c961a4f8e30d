use std::sync::Arc;
use std::thread;
use std::time::Duration;

use isoterra_chunk::{Chunk, PushOut, RayHit, RaycastParams, VertexCount};
use isoterra_geom::{Aabb, IVec3, Sphere, Vec3};
use isoterra_sdf::{SdfField, ShapeList};
use isoterra_world::{BlockType, ChunkCoord, TerrainConfig};

use crate::debug::{DebugSink, NullDebugSink, StreamingStats};
use crate::runtime::{Runtime, RuntimeError};
use crate::scheduler::StreamingScheduler;

/// Streamed SDF terrain: the editable shape list, the scheduler that keeps
/// chunks meshed around a moving view, and world-space queries over the
/// resident chunks.
pub struct Terrain {
    cfg: TerrainConfig,
    shapes: ShapeList,
    scheduler: StreamingScheduler,
    debug: Option<Box<dyn DebugSink>>,
}

impl Terrain {
    pub fn new(cfg: TerrainConfig, shapes: ShapeList) -> Result<Self, RuntimeError> {
        let scheduler = StreamingScheduler::new(&cfg)?;
        Ok(Self::from_parts(cfg, shapes, scheduler))
    }

    /// Uses a fixed worker count instead of the configured fraction.
    pub fn with_workers(
        cfg: TerrainConfig,
        shapes: ShapeList,
        workers: usize,
    ) -> Result<Self, RuntimeError> {
        let queue = cfg.streaming.queue_capacity.unwrap_or(workers * 2).max(1);
        let runtime = Runtime::with_workers(workers, queue, &cfg.mesher)?;
        let scheduler = StreamingScheduler::with_runtime(&cfg, runtime);
        Ok(Self::from_parts(cfg, shapes, scheduler))
    }

    fn from_parts(cfg: TerrainConfig, shapes: ShapeList, scheduler: StreamingScheduler) -> Self {
        log::info!(
            target: "stream",
            "terrain: chunk {} active<={} resident<={}",
            cfg.streaming.chunk_size,
            cfg.streaming.max_active_chunks,
            cfg.streaming.max_loaded_chunks
        );
        Self {
            cfg,
            shapes,
            scheduler,
            debug: None,
        }
    }

    /// Stage shape edits here; they apply on a later tick once no job is
    /// running.
    pub fn shapes_mut(&mut self) -> &mut ShapeList {
        &mut self.shapes
    }

    pub fn shapes(&self) -> &ShapeList {
        &self.shapes
    }

    pub fn set_debug_sink(&mut self, sink: Option<Box<dyn DebugSink>>) {
        self.debug = sink;
    }

    /// One streaming tick around `center`. Never blocks on workers.
    pub fn update(&mut self, center: Vec3, radius: f32) -> Result<StreamingStats, RuntimeError> {
        let mut null = NullDebugSink;
        let debug: &mut dyn DebugSink = match self.debug.as_deref_mut() {
            Some(sink) => sink,
            None => &mut null,
        };
        let sched = &mut self.scheduler;
        sched.begin_tick();
        sched.finish_jobs(debug)?;

        if self.shapes.has_pending() && sched.is_idle() {
            let regions = self.shapes.commit_pending();
            log::debug!(target: "stream", "committed shape edits: {} regions", regions.len());
            for r in &regions {
                sched.dirty(r);
            }
        }

        sched.refresh_light();
        if !self.shapes.has_pending() {
            let field: Arc<dyn SdfField> = self.shapes.snapshot();
            sched.start_jobs(center, radius, &field, debug)?;
        }
        sched.select_active(center);
        Ok(sched.end_tick())
    }

    /// Ticks until nothing is outstanding and no new job was started, or
    /// `max_ticks` is reached. For tools and tests; a frame loop should call
    /// [`Terrain::update`] instead.
    pub fn settle(
        &mut self,
        center: Vec3,
        radius: f32,
        max_ticks: usize,
    ) -> Result<StreamingStats, RuntimeError> {
        let mut stats = StreamingStats::default();
        for _ in 0..max_ticks {
            stats = self.update(center, radius)?;
            if stats.in_flight == 0 && stats.started == 0 && !self.shapes.has_pending() {
                break;
            }
            thread::sleep(Duration::from_millis(1));
        }
        Ok(stats)
    }

    /// Forces chunks near `aabb` to be rebuilt.
    pub fn dirty(&mut self, aabb: &Aabb) {
        self.scheduler.dirty(aabb);
    }

    pub fn chunk(&self, coord: ChunkCoord) -> Option<&Chunk> {
        self.scheduler.store().get(coord)
    }

    /// Classification of world voxel `v`.
    pub fn voxel(&self, v: IVec3) -> BlockType {
        let coord = ChunkCoord::from_voxel(v, self.cfg.streaming.chunk_size);
        if let Some(b) = self.chunk(coord).and_then(|c| c.block_world(v)) {
            return b;
        }
        match self.scheduler.counts().get(coord) {
            VertexCount::Empty => BlockType::Exterior,
            VertexCount::Interior => BlockType::Interior,
            VertexCount::Dirty | VertexCount::Vertices(_) => BlockType::Unloaded,
        }
    }

    /// Light at world voxel `v`; open sky outside resident chunks.
    pub fn light_at(&self, v: IVec3) -> f32 {
        let coord = ChunkCoord::from_voxel(v, self.cfg.streaming.chunk_size);
        self.chunk(coord)
            .and_then(|c| c.light_world(v))
            .unwrap_or(self.cfg.lighting.sky_brightness)
    }

    /// Closest front-facing hit along `ray`, no farther than its length.
    pub fn raycast(&self, origin: Vec3, ray: Vec3) -> Option<RayHit> {
        let params = RaycastParams::segment(origin, ray);
        self.scheduler
            .store()
            .iter()
            .filter_map(|c| c.collision().raycast(&params))
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    /// Pushes `sphere` out of every resident chunk it overlaps. `None` when
    /// nothing was touched.
    pub fn push_out(&self, sphere: Sphere, velocity: Vec3) -> Option<PushOut> {
        let mut info = PushOut::new(sphere, velocity);
        for chunk in self.scheduler.store().iter() {
            let mesh = chunk.collision();
            if mesh.is_empty() || !mesh.aabb().intersects_sphere(&info.sphere) {
                continue;
            }
            info = mesh.push_out(&info);
        }
        (!info.hits.is_empty()).then_some(info)
    }

    /// Chunks selected for rendering on the last tick, closest first.
    pub fn active_chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.scheduler.active_chunks()
    }

    /// Continuity violations reported by the most recently finished jobs.
    pub fn diagnostics(&self) -> &[Vec3] {
        self.scheduler.diagnostics()
    }

    pub fn scheduler(&self) -> &StreamingScheduler {
        &self.scheduler
    }

    pub fn config(&self) -> &TerrainConfig {
        &self.cfg
    }
}
